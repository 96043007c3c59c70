//! Retrying JSON fetcher
//!
//! This module handles all HTTP requests to the catalog API, including:
//! - Building the HTTP client with the configured default headers
//! - Bounded retries with jittered backoff
//! - A fixed cooldown after rate limiting
//! - Classification of every attempt

use crate::config::{ApiConfig, FetcherConfig};
use crate::ConfigError;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Outcome class of a single request attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// HTTP 200 with a decodable JSON body
    Success,
    /// HTTP 200 with an empty body
    Empty,
    /// Any status other than 200 and 429
    HttpError(u16),
    Timeout,
    /// HTTP 200 whose body is not valid JSON
    Decode,
    /// HTTP 429
    RateLimited,
    /// Connection-level failure that is neither a timeout nor a status
    Transport,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Empty => f.write_str("empty body"),
            Self::HttpError(code) => write!(f, "HTTP {}", code),
            Self::Timeout => f.write_str("timeout"),
            Self::Decode => f.write_str("malformed JSON"),
            Self::RateLimited => f.write_str("rate limited"),
            Self::Transport => f.write_str("transport error"),
        }
    }
}

/// One request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

/// Terminal failure after the retry budget is spent
#[derive(Debug, Clone, Error)]
#[error("Giving up on {url} after {} attempts", .attempts.len())]
pub struct FetchFailure {
    pub url: String,
    pub attempts: Vec<FetchAttempt>,
}

impl FetchFailure {
    /// Outcome of the final attempt
    pub fn last_outcome(&self) -> Option<AttemptOutcome> {
        self.attempts.last().map(|a| a.outcome)
    }
}

/// Fetches a URL and decodes its JSON body
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchFailure>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `api` - Supplies the default request headers
/// * `fetcher` - Supplies the per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(IngestError)` - A header is invalid or the client could not be built
pub fn build_http_client(api: &ApiConfig, fetcher: &FetcherConfig) -> crate::Result<Client> {
    let mut headers = HeaderMap::new();
    for (name, value) in &api.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}' value: {}", name, e)))?;
        headers.insert(name, value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(fetcher.timeout_secs))
        .connect_timeout(Duration::from_secs(fetcher.timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// HTTP implementation of [`JsonFetcher`]
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200, JSON body | Return the decoded body |
/// | HTTP 200, empty body | Retry after jitter |
/// | HTTP 429 | Retry after the fixed cooldown, no jitter |
/// | Other status | Retry after jitter |
/// | Timeout | Retry after jitter |
/// | Malformed JSON | Retry after jitter |
/// | Connection error | Retry after jitter |
///
/// Every attempt, rate-limited ones included, counts against the budget.
/// Nothing is slept after the final attempt.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    delay_min: Duration,
    delay_max: Duration,
    cooldown: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client
    pub fn new(api: &ApiConfig, config: &FetcherConfig) -> crate::Result<Self> {
        let client = build_http_client(api, config)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            retries: config.retries.max(1),
            delay_min: Duration::from_millis(config.retry_delay_min_ms),
            delay_max: Duration::from_millis(config.retry_delay_max_ms),
            cooldown: Duration::from_millis(config.rate_limit_cooldown_ms),
        }
    }

    /// Uniform delay within the configured retry range
    fn jitter(&self) -> Duration {
        if self.delay_min >= self.delay_max {
            return self.delay_min;
        }
        rand::thread_rng().gen_range(self.delay_min..=self.delay_max)
    }

    async fn attempt(&self, url: &str) -> Result<Value, AttemptOutcome> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptOutcome::RateLimited);
        }
        if status != StatusCode::OK {
            return Err(AttemptOutcome::HttpError(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AttemptOutcome::Empty);
        }

        serde_json::from_slice(&body).map_err(|_| AttemptOutcome::Decode)
    }
}

fn classify(error: reqwest::Error) -> AttemptOutcome {
    if error.is_timeout() {
        AttemptOutcome::Timeout
    } else {
        AttemptOutcome::Transport
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchFailure> {
        let mut attempts = Vec::with_capacity(self.retries as usize);

        for attempt in 1..=self.retries {
            let outcome = match self.attempt(url).await {
                Ok(value) => {
                    tracing::debug!(
                        "Attempt {}/{} for {}: {}",
                        attempt,
                        self.retries,
                        url,
                        AttemptOutcome::Success
                    );
                    return Ok(value);
                }
                Err(outcome) => outcome,
            };

            tracing::debug!(
                "Attempt {}/{} for {} failed: {}",
                attempt,
                self.retries,
                url,
                outcome
            );
            attempts.push(FetchAttempt {
                url: url.to_string(),
                attempt,
                outcome,
            });

            if attempt == self.retries {
                break;
            }

            let wait = if outcome == AttemptOutcome::RateLimited {
                tracing::info!("Rate limited, cooling down for {:?}", self.cooldown);
                self.cooldown
            } else {
                self.jitter()
            };
            tokio::time::sleep(wait).await;
        }

        tracing::warn!("Giving up on {} after {} attempts", url, attempts.len());
        Err(FetchFailure {
            url: url.to_string(),
            attempts,
        })
    }
}
