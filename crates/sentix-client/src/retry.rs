use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::http::{ClientError, HTTP_TARGET};

/// Run `attempt(timeout)`; on a timeout-class failure run it exactly once more with `timeout * 2`.
///
/// Any other failure, and any failure of the second attempt, is returned as-is.
pub async fn with_retry<T, F, Fut>(what: &str, timeout: Duration, mut attempt: F) -> Result<T, ClientError>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    match attempt(timeout).await {
        Err(err) if err.is_timeout_class() => {
            let doubled = timeout.saturating_mul(2);
            warn!(
                target: HTTP_TARGET,
                what,
                error = %err,
                retry_timeout_ms = doubled.as_millis() as u64,
                "retrying with doubled timeout"
            );
            attempt(doubled).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    async fn run(first: ClientError, second_ok: bool) -> (Result<u8, ClientError>, Vec<Duration>) {
        let seen = Mutex::new(Vec::new());
        let first = Mutex::new(Some(first));
        let out = with_retry("test", Duration::from_millis(100), |t| {
            seen.lock().unwrap().push(t);
            let failure = first.lock().unwrap().take();
            async move {
                match failure {
                    Some(err) => Err(err),
                    None if second_ok => Ok(7),
                    None => Err(ClientError::Timeout),
                }
            }
        })
        .await;
        (out, seen.into_inner().unwrap())
    }

    #[tokio::test]
    async fn timeout_retries_once_with_doubled_timeout() {
        let (out, seen) = run(ClientError::Timeout, true).await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(seen, vec![Duration::from_millis(100), Duration::from_millis(200)]);
    }

    #[tokio::test]
    async fn second_failure_propagates() {
        let (out, seen) = run(ClientError::Aborted, false).await;
        assert!(matches!(out, Err(ClientError::Timeout)));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let http = ClientError::Http {
            status: 500,
            status_text: "Internal Server Error".into(),
            body: "boom".into(),
        };
        let (out, seen) = run(http, true).await;
        assert_eq!(out.unwrap_err().status(), Some(500));
        assert_eq!(seen, vec![Duration::from_millis(100)]);

        let (_, seen) = run(ClientError::Decode("bad json".into()), true).await;
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn timeout_in_message_counts_as_timeout_class() {
        let (out, seen) = run(ClientError::Network("operation timeout".into()), true).await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(seen.len(), 2);
    }
}
