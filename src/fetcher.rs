//! HTTP fetching with bounded retries and rate-limit backoff.
//!
//! The module uses a trait-based design so the transport can be swapped
//! without touching extraction logic:
//! - [`Transport`]: One raw GET, returning status and body
//! - [`ReqwestTransport`]: The `reqwest` implementation, with a per-request timeout
//! - [`RetryingFetcher`]: Decorator adding the retry policy to any transport
//! - [`Fetcher`]: What the pipeline consumes: a URL in, a 2xx body out
//!
//! # Retry Policy
//!
//! - At most `max_attempts` attempts per URL (3 by default)
//! - HTTP 429: wait `rate_limit_step * attempt` (30s, 60s, ...) and retry
//! - Transport error: wait `transport_backoff * attempt` and retry
//! - Any other non-2xx status: fail immediately, no retry
//! - No wait after the final attempt

use crate::config::FetchSettings;
use crate::error::{BoxError, FetchError};
use crate::utils::truncate_for_log;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Raw outcome of a single GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single HTTP GET with no retry logic of its own.
pub trait Transport {
    async fn get(&self, url: &str) -> Result<RawResponse, BoxError>;
}

/// Fetch a page body, or fail with a [`FetchError`].
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the configured timeout and user agent.
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, BoxError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Adds the retry policy described in the module docs to any [`Transport`].
pub struct RetryingFetcher<T> {
    inner: T,
    max_attempts: usize,
    rate_limit_step: Duration,
    transport_backoff: Duration,
}

impl<T> RetryingFetcher<T>
where
    T: Transport,
{
    pub fn new(
        inner: T,
        max_attempts: usize,
        rate_limit_step: Duration,
        transport_backoff: Duration,
    ) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            rate_limit_step,
            transport_backoff,
        }
    }

    pub fn from_settings(inner: T, settings: &FetchSettings) -> Self {
        Self::new(
            inner,
            settings.max_attempts,
            Duration::from_secs(settings.rate_limit_step_secs),
            Duration::from_secs(settings.transport_backoff_secs),
        )
    }

    /// Wait imposed after the `attempt`-th (1-based) response was a 429.
    pub fn rate_limit_wait(&self, attempt: usize) -> Duration {
        self.rate_limit_step.saturating_mul(attempt as u32)
    }
}

impl<T> fmt::Debug for RetryingFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("max_attempts", &self.max_attempts)
            .field("rate_limit_step", &self.rate_limit_step)
            .field("transport_backoff", &self.transport_backoff)
            .finish()
    }
}

enum Failure {
    RateLimited,
    Transport(BoxError),
}

impl<T> Fetcher for RetryingFetcher<T>
where
    T: Transport,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            let wait = match self.inner.get(url).await {
                Ok(resp) if resp.status == 429 => {
                    last = Some(Failure::RateLimited);
                    let wait = self.rate_limit_wait(attempt);
                    warn!(attempt, max = self.max_attempts, ?wait, %url, "Rate limited (429)");
                    wait
                }
                Ok(resp) if !resp.is_success() => {
                    debug!(body = %truncate_for_log(&resp.body, 200), "Error response body");
                    return Err(FetchError::HttpStatus {
                        status: resp.status,
                        url: url.to_string(),
                    });
                }
                Ok(resp) => {
                    debug!(
                        attempt,
                        bytes = resp.body.len(),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Fetched"
                    );
                    return Ok(resp.body);
                }
                Err(e) => {
                    let wait = self.transport_backoff.saturating_mul(attempt as u32);
                    warn!(attempt, max = self.max_attempts, ?wait, error = %e, %url, "Transport error");
                    last = Some(Failure::Transport(e));
                    wait
                }
            };

            if attempt < self.max_attempts {
                sleep(wait).await;
            }
        }

        error!(
            attempts = self.max_attempts,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            %url,
            "Fetch exhausted retries"
        );
        Err(match last {
            Some(Failure::Transport(source)) => FetchError::Transport {
                url: url.to_string(),
                attempts: self.max_attempts,
                source,
            },
            _ => FetchError::RateLimited {
                url: url.to_string(),
                attempts: self.max_attempts,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of outcomes; `Err` entries become transport errors.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<RawResponse, String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<(u16, &str), &str>>) -> Self {
            let outcomes = outcomes
                .into_iter()
                .map(|o| {
                    o.map(|(status, body)| RawResponse {
                        status,
                        body: body.to_string(),
                    })
                    .map_err(str::to_string)
                })
                .collect();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl Transport for Scripted {
        async fn get(&self, _url: &str) -> Result<RawResponse, BoxError> {
            *self.calls.lock().unwrap() += 1;
            match self.outcomes.lock().unwrap().pop_front() {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(e)) => Err(e.into()),
                None => Err("script exhausted".into()),
            }
        }
    }

    fn fetcher(outcomes: Vec<Result<(u16, &str), &str>>) -> RetryingFetcher<Scripted> {
        RetryingFetcher::new(Scripted::new(outcomes), 3, Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let f = fetcher(vec![Ok((200, "<html>ok</html>"))]);
        assert_eq!(f.fetch("https://x.test/").await.unwrap(), "<html>ok</html>");
        assert_eq!(f.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let f = fetcher(vec![Ok((429, "")), Ok((429, "")), Ok((204, "done"))]);
        assert_eq!(f.fetch("https://x.test/").await.unwrap(), "done");
        assert_eq!(f.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limited_every_attempt() {
        let f = fetcher(vec![Ok((429, "")), Ok((429, "")), Ok((429, "")), Ok((200, "late"))]);
        let err = f.fetch("https://x.test/").await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { attempts: 3, .. }));
        assert_eq!(f.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let f = fetcher(vec![Ok((404, "missing")), Ok((200, "never"))]);
        let err = f.fetch("https://x.test/gone/").await.unwrap_err();
        match err {
            FetchError::HttpStatus { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://x.test/gone/");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let f = fetcher(vec![Err("connection reset"), Ok((200, "recovered"))]);
        assert_eq!(f.fetch("https://x.test/").await.unwrap(), "recovered");
        assert_eq!(f.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_errors_exhaust_budget() {
        let f = fetcher(vec![Ok((429, "")), Err("timeout"), Err("timeout")]);
        let err = f.fetch("https://x.test/").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { attempts: 3, .. }));
    }

    #[test]
    fn test_rate_limit_wait_is_linear() {
        let f = RetryingFetcher::new(
            Scripted::new(vec![]),
            3,
            Duration::from_secs(30),
            Duration::ZERO,
        );
        assert_eq!(f.rate_limit_wait(1), Duration::from_secs(30));
        assert_eq!(f.rate_limit_wait(2), Duration::from_secs(60));
        assert_eq!(f.rate_limit_wait(3), Duration::from_secs(90));
    }
}
