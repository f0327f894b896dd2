// crates/resilience/src/lib.rs
//! Resilience patterns for network-bound operations
//!
//! - Retry with exponential backoff
//! - Timeouts for futures
//! - Deadlines for event-driven waits (e.g. "ready to play within 10s")
//!
//! # Example
//!
//! ```rust
//! use securgeek_resilience::{Deadline, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100));
//! assert_eq!(policy.max_attempts(), 3);
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let deadline = Deadline::after(Duration::from_secs(10));
//! assert!(!deadline.is_expired());
//! # }
//! ```

mod error;
mod retry;
mod timeout;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{with_retry, RetryPolicy};
pub use timeout::{with_timeout, Deadline, Timeout};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: RetryPolicy = RetryPolicy::default();
        let _: Timeout = Timeout::new(std::time::Duration::from_secs(5));
    }
}
