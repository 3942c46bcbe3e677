use super::types::TaskEvent;
use crate::config::EventsConfig;
use crate::constants::system;
use std::fmt;
use tokio::sync::broadcast;

/// Destination for lifecycle events; must not block
pub trait FeedbackSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: TaskEvent);
}

/// Broadcast publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<TaskEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: TaskEvent) -> usize {
        // send() only fails when nobody is subscribed
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl FeedbackSink for EventPublisher {
    fn emit(&self, event: TaskEvent) {
        self.publish(event);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(system::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Task;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        let task = Task::new("noop", Default::default(), 1, None);
        assert_eq!(publisher.publish(TaskEvent::for_task("task.submitted", &task)), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        let task = Task::new("report", Default::default(), 3, None);
        publisher.emit(TaskEvent::for_task("task.submitted", &task));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.task_id, task.id);
        assert_eq!(event.task_name, "report");
        assert_eq!(event.priority, 3);
    }
}
