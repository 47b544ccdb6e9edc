use std::future::Future;
use std::time::Duration;

/// Creates an HTTP client for processor calls with connection pooling and a
/// request timeout.
///
/// The timeout guards each request at the transport level; orchestration
/// steps wrap calls in [`with_timeout`] as well so fakes and the record store
/// are bounded the same way.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub(crate) fn create_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
}

/// Await `operation`, mapping an elapsed `limit` into the caller's error type.
///
/// There are no retries: every external call gets exactly one attempt.
pub(crate) async fn with_timeout<F, T, E>(
    limit: Duration,
    operation: F,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
