//! # Resilience Module
//!
//! Fault isolation for unreliable downstream resources. Each named resource
//! (an external API, a tool endpoint, a worker pool) gets its own circuit
//! breaker, created lazily by the [`CircuitBreakerManager`] and retained for the
//! lifetime of the owning [`crate::error_handling::ErrorHandler`].
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: Stop calling a failing resource during a cooldown
//! - **Metrics Collection**: Call counts, failure rates and state per breaker
//! - **Configuration**: Default thresholds plus per-component overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arcana_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     reset_timeout: Duration::from_secs(60),
//!     half_open_timeout: Duration::from_secs(5),
//! };
//!
//! let breaker = CircuitBreaker::new("search_api".to_string(), config);
//!
//! let body = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>("response body") })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;


pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
