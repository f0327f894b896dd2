// crates/resilience/tests/resilience_tests.rs
//! Integration tests for resilience patterns

use securgeek_resilience::{with_retry, ResilienceError, RetryPolicy, Timeout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_retry_inside_timeout() {
    let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100));
    let timeout = Timeout::new(Duration::from_secs(5));
    let calls = AtomicUsize::new(0);

    let result = timeout
        .run(with_retry(
            &policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err("flaky")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
        ))
        .await;

    assert!(matches!(result, Ok(Ok(2))));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cuts_off_slow_retries() {
    let policy = RetryPolicy::new(10)
        .with_initial_delay(Duration::from_secs(2))
        .with_jitter(false);
    let timeout = Timeout::new(Duration::from_secs(3));

    let result = timeout
        .run(with_retry(
            &policy,
            || async { Err::<(), _>("down") },
            |_| true,
        ))
        .await;

    assert!(matches!(result, Err(ResilienceError::Timeout(_))));
}
