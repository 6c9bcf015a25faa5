//! Shared HTTP plumbing for remote embedding providers.

use std::time::Duration;

use medrag_core::EmbedError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// JSON-over-HTTP client with bounded retries on transient failures.
#[derive(Clone)]
pub(crate) struct JsonClient {
    client: Client,
    timeout: Duration,
    max_retries: usize,
    provider: &'static str,
}

impl JsonClient {
    pub(crate) fn new(
        provider: &'static str,
        mut headers: HeaderMap,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbedError> {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                EmbedError::Config(format!("failed to build {provider} HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            timeout,
            max_retries: max_retries.max(1),
            provider,
        })
    }

    /// POST `body` to `url` and decode the JSON response.
    pub(crate) async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, EmbedError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut attempt = 0usize;
        loop {
            match self.client.post(url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<R>().await.map_err(|e| {
                            EmbedError::Inference(format!(
                                "failed to parse {} response: {e}",
                                self.provider
                            ))
                        });
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(
                            provider = self.provider,
                            %status,
                            attempt,
                            "retrying embedding request"
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Request(format!(
                        "{} returned {status}: {body}",
                        self.provider
                    )));
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        debug!(
                            provider = self.provider,
                            attempt,
                            error = %err,
                            "retrying embedding request"
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(EmbedError::Timeout(self.timeout));
                    }
                    return Err(EmbedError::Request(format!(
                        "{} request failed: {err}",
                        self.provider
                    )));
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}

/// Verify every output has the expected dimension.
pub(crate) fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<(), EmbedError> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(EmbedError::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}

/// Verify the provider answered once per input.
pub(crate) fn check_count(provider: &str, got: usize, expected: usize) -> Result<(), EmbedError> {
    if got == expected {
        Ok(())
    } else {
        Err(EmbedError::Inference(format!(
            "{provider} returned {got} embeddings for {expected} inputs"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_statuses() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::UNAUTHORIZED));
        assert!(!should_retry(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(2), Duration::from_millis(1000));
        assert_eq!(retry_backoff(9), retry_backoff(5));
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[vec![0.0; 4], vec![1.0; 4]], 4).is_ok());
        let err = check_dimensions(&[vec![0.0; 4], vec![1.0; 3]], 4).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_check_count() {
        assert!(check_count("openai", 2, 2).is_ok());
        assert!(check_count("openai", 1, 2).is_err());
    }
}
