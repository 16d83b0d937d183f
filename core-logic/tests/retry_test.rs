use core_logic::{
    is_transient_error, poll_until, with_retry, NetworkError, PollConfig, PollOutcome, RetryConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_transient_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("connection reset by peer"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_exhausts_on_transient_errors() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("Request timeout"))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_retry_stops_on_permanent_error() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("Invalid address"))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_transient_error_detection() {
    let timeout_error = anyhow::anyhow!("Request timeout");
    let rate_limit_error = anyhow::anyhow!("429 Too Many Requests");
    let permanent_error = anyhow::anyhow!("Invalid address");

    assert!(is_transient_error(&timeout_error));
    assert!(is_transient_error(&rate_limit_error));
    assert!(!is_transient_error(&permanent_error));
}

#[test]
fn test_typed_network_errors() {
    let timeout = anyhow::Error::new(NetworkError::Timeout {
        timeout_ms: 30_000,
        endpoint: "/me/tasks".to_string(),
    });
    let server = anyhow::Error::new(NetworkError::HttpError {
        status_code: 502,
        endpoint: "/api/draw/info".to_string(),
    });
    let forbidden = anyhow::Error::new(NetworkError::HttpError {
        status_code: 403,
        endpoint: "/api/draw/info".to_string(),
    });
    let invalid = anyhow::Error::new(NetworkError::InvalidResponse {
        endpoint: "/me/login".to_string(),
        reason: "request timeout in body".to_string(),
    });

    assert!(is_transient_error(&timeout));
    assert!(is_transient_error(&server));
    assert!(!is_transient_error(&forbidden));
    assert!(!is_transient_error(&invalid));
}

#[tokio::test]
async fn test_poll_ready_on_third_check() {
    let config = PollConfig::new(5, Duration::ZERO);

    let outcome = poll_until(config, "bridge status", |attempt| async move {
        Ok(if attempt == 3 { Some("finished") } else { None })
    })
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::Ready("finished"));
}

#[tokio::test]
async fn test_poll_is_bounded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = PollConfig::new(4, Duration::ZERO);

    let outcome: PollOutcome<()> = poll_until(config, "never ready", |_| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    })
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 4 });
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_poll_error_aborts() {
    let config = PollConfig::new(4, Duration::ZERO);

    let result: anyhow::Result<PollOutcome<()>> =
        poll_until(config, "broken", |_| async { Err(anyhow::anyhow!("bad payload")) }).await;

    assert!(result.is_err());
}
