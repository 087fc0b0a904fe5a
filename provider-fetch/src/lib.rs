//! A small rate-limited HTTP fetcher shared by every provider-specific
//! source adapter in `chess-ingest`.
//!
//! Each [`Provider`] carries its own scheduling policy (inter-request delay,
//! 429 back-off rule, retry cap, request timeout). A [`Fetcher`] enforces
//! that policy around a single `reqwest::Client` and exposes both a
//! whole-body fetch (`fetch_text`, used for Chess.com's small JSON
//! responses) and a streaming fetch (`fetch_reader`, used for Lichess' long
//! lived PGN stream).

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::TryStreamExt;
use log::{debug, warn};
use miette::Diagnostic;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = "chess-analytics-ingest/0.1";

/// A provider this fetcher can talk to. Each has a fixed scheduling policy;
/// there is no per-instance customization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    ChessCom,
    Lichess,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::ChessCom => "Chess.com",
            Provider::Lichess => "Lichess",
        }
    }

    pub fn profile(&self) -> ProviderProfile {
        match self {
            Provider::ChessCom => ProviderProfile {
                inter_request_delay: Duration::from_millis(500),
                backoff: BackoffPolicy::Exponential {
                    initial_ms: 2_000,
                    cap_ms: 60_000,
                },
                max_retries: 3,
                request_timeout: Duration::from_secs(30),
            },
            Provider::Lichess => ProviderProfile {
                inter_request_delay: Duration::ZERO,
                backoff: BackoffPolicy::Fixed { ms: 60_000 },
                max_retries: 3,
                request_timeout: Duration::from_secs(600),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BackoffPolicy {
    /// Doubles each retry, capped at `cap_ms`. Used by Chess.com.
    Exponential { initial_ms: u64, cap_ms: u64 },
    /// Same delay every retry. Used by Lichess.
    Fixed { ms: u64 },
}

impl BackoffPolicy {
    fn initial(&self) -> u64 {
        match self {
            BackoffPolicy::Exponential { initial_ms, .. } => *initial_ms,
            BackoffPolicy::Fixed { ms } => *ms,
        }
    }

    fn next(&self, current_ms: u64) -> u64 {
        match self {
            BackoffPolicy::Exponential { cap_ms, .. } => (current_ms * 2).min(*cap_ms),
            BackoffPolicy::Fixed { ms } => *ms,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    pub inter_request_delay: Duration,
    pub backoff: BackoffPolicy,
    pub max_retries: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("{provider} reported the resource was not found: {url}")]
    NotFound { provider: &'static str, url: String },

    #[error("{provider} rate limit exceeded after {retries} retries fetching {url}")]
    RateLimited {
        provider: &'static str,
        retries: u32,
        url: String,
    },

    #[error("{provider} returned HTTP {status} fetching {url}")]
    ProviderError {
        provider: &'static str,
        status: u16,
        url: String,
    },

    #[error("error building request for {url}")]
    RequestBuild {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error executing request for {url}")]
    RequestExecute {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error reading response body for {url}")]
    RequestBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

/// Enforces one provider's scheduling policy around a `reqwest::Client`.
///
/// A `Fetcher` is meant to live for the duration of a single ingestion job;
/// the inter-request delay applies before every request after the first one
/// this instance makes.
pub struct Fetcher {
    client: reqwest::Client,
    provider: Provider,
    profile: ProviderProfile,
    made_first_request: AtomicBool,
}

impl Fetcher {
    pub fn new(provider: Provider) -> Self {
        let profile = provider.profile();
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(profile.request_timeout)
            .build()
            .expect("reqwest client configuration is valid");

        Self {
            client,
            provider,
            profile,
            made_first_request: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// GETs `url`, returning the whole response body as a string. Used by
    /// Chess.com's archive-list and per-archive JSON endpoints.
    pub async fn fetch_text(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        self.fetch_text_with_accept(url, None, cancel).await
    }

    pub async fn fetch_text_with_accept(
        &self,
        url: &str,
        accept: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let response = self.execute_with_retry(url, accept, cancel).await?;

        tokio::select! {
            body = response.text() => body.map_err(|source| FetchError::RequestBody {
                url: url.to_string(),
                source,
            }),
            _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
        }
    }

    /// GETs `url` and returns an `AsyncBufRead` over the streaming response
    /// body. Used by the Lichess streaming games endpoint; the Parser reads
    /// directly from this without buffering the whole response.
    pub async fn fetch_reader(
        &self,
        url: &str,
        accept: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Pin<Box<dyn AsyncBufRead + Send>>, FetchError> {
        let response = self.execute_with_retry(url, accept, cancel).await?;

        let byte_stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let reader = StreamReader::new(byte_stream);
        Ok(Box::pin(tokio::io::BufReader::new(reader)))
    }

    async fn execute_with_retry(
        &self,
        url: &str,
        accept: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, FetchError> {
        self.wait_between_requests(cancel).await?;

        let mut backoff_ms = self.profile.backoff.initial();
        let mut retries = 0;

        loop {
            let mut request = self.client.get(url);
            if let Some(accept) = accept {
                request = request.header(reqwest::header::ACCEPT, accept);
            }
            let request = request.build().map_err(|source| FetchError::RequestBuild {
                url: url.to_string(),
                source,
            })?;

            let response = tokio::select! {
                result = self.client.execute(request) => result.map_err(|source| FetchError::RequestExecute {
                    url: url.to_string(),
                    source,
                })?,
                _ = cancel.cancelled() => return Err(FetchError::Cancelled { url: url.to_string() }),
            };

            match response.status().as_u16() {
                200 => return Ok(response),
                429 => {
                    if retries >= self.profile.max_retries {
                        return Err(FetchError::RateLimited {
                            provider: self.provider.name(),
                            retries,
                            url: url.to_string(),
                        });
                    }
                    warn!(
                        "{} returned 429 for {url}, sleeping {backoff_ms}ms before retry {}/{}",
                        self.provider.name(),
                        retries + 1,
                        self.profile.max_retries
                    );
                    self.sleep_or_cancel(Duration::from_millis(backoff_ms), url, cancel)
                        .await?;
                    backoff_ms = self.profile.backoff.next(backoff_ms);
                    retries += 1;
                }
                404 => {
                    return Err(FetchError::NotFound {
                        provider: self.provider.name(),
                        url: url.to_string(),
                    });
                }
                status => {
                    return Err(FetchError::ProviderError {
                        provider: self.provider.name(),
                        status,
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    async fn wait_between_requests(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        if self.made_first_request.swap(true, Ordering::SeqCst) {
            let delay = self.profile.inter_request_delay;
            if !delay.is_zero() {
                debug!("sleeping {delay:?} before next {} request", self.provider.name());
                self.sleep_or_cancel(delay, "", cancel).await?;
            }
        }
        Ok(())
    }

    async fn sleep_or_cancel(
        &self,
        duration: Duration,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chesscom_backoff_doubles_and_caps() {
        let policy = Provider::ChessCom.profile().backoff;
        let first = policy.initial();
        assert_eq!(first, 2_000);
        let second = policy.next(first);
        assert_eq!(second, 4_000);
        let huge = policy.next(50_000);
        assert_eq!(huge, 60_000);
    }

    #[test]
    fn lichess_backoff_is_fixed() {
        let policy = Provider::Lichess.profile().backoff;
        assert_eq!(policy.initial(), 60_000);
        assert_eq!(policy.next(60_000), 60_000);
    }

    #[test]
    fn provider_profiles_match_documented_policy() {
        let chesscom = Provider::ChessCom.profile();
        assert_eq!(chesscom.inter_request_delay, Duration::from_millis(500));
        assert_eq!(chesscom.max_retries, 3);
        assert_eq!(chesscom.request_timeout, Duration::from_secs(30));

        let lichess = Provider::Lichess.profile();
        assert_eq!(lichess.inter_request_delay, Duration::ZERO);
        assert_eq!(lichess.max_retries, 3);
        assert_eq!(lichess.request_timeout, Duration::from_secs(600));
    }

    /// A stub server returning `429, 429, 200` should make the fetcher sleep
    /// at least 2000ms then at least 4000ms before it finally succeeds, per
    /// Chess.com's exponential backoff policy. Runs under paused tokio time
    /// so the virtual clock advances through the sleeps instantly.
    #[tokio::test(start_paused = true)]
    async fn chesscom_429_backoff_respects_documented_delays() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Provider::ChessCom);
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let body = fetcher.fetch_text(&server.uri(), &cancel).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(body, "ok");
        assert!(elapsed >= Duration::from_millis(2_000 + 4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries_with_rate_limited_error() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Provider::ChessCom);
        let cancel = CancellationToken::new();
        let err = fetcher.fetch_text(&server.uri(), &cancel).await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { retries: 3, .. }));
    }
}
