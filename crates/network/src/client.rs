// crates/network/src/client.rs
//! HTTP client wrapper with resilience

use crate::error::{NetworkError, NetworkResult};
use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client as ReqwestClient, Response, StatusCode, Url};
use securgeek_resilience::{with_retry, RetryPolicy};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cap on a whole request including its body; `None` for open-ended streams
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Longest pause between two reads of a body
    pub read_timeout: Option<Duration>,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Retry policy; `None` makes every request a single attempt
    pub retry_policy: Option<RetryPolicy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            user_agent: format!("SecurGeek/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            retry_policy: None,
        }
    }
}

/// HTTP client with resilience features
#[derive(Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(read_timeout) = config.read_timeout {
            builder = builder.read_timeout(read_timeout);
        }
        let client = builder.build().map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs a HEAD request; non-success statuses are errors
    pub async fn head(&self, url: &Url) -> NetworkResult<Response> {
        self.request(|| self.inner.head(url.clone()).send()).await
    }

    /// Performs a GET request; non-success statuses are errors
    pub async fn get(&self, url: &Url) -> NetworkResult<Response> {
        self.request(|| self.inner.get(url.clone()).send()).await
    }

    /// Starts a GET at byte `offset`. Servers without range support answer
    /// with the whole body, which [`RangedResponse::start`] reports as 0.
    pub async fn get_range(&self, url: &Url, offset: u64) -> NetworkResult<RangedResponse> {
        let response = self
            .request(|| {
                let request = self.inner.get(url.clone());
                if offset > 0 {
                    request.header(RANGE, format!("bytes={}-", offset)).send()
                } else {
                    request.send()
                }
            })
            .await?;
        Ok(RangedResponse::new(response))
    }

    /// Checks if a URL answers HEAD with a success status
    pub async fn is_accessible(&self, url: &Url) -> bool {
        self.head(url).await.is_ok()
    }

    /// Internal request handler with retry
    async fn request<F, Fut>(&self, request_fn: F) -> NetworkResult<Response>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let policy = self
            .config
            .retry_policy
            .clone()
            .unwrap_or_else(RetryPolicy::none);

        with_retry(
            &policy,
            || {
                let pending = request_fn();
                async move { check_status(pending.await) }
            },
            NetworkError::is_retryable,
        )
        .await
    }
}

/// Body of a possibly partial GET and where it sits in the resource
pub struct RangedResponse {
    response: Response,
    start: u64,
    total: Option<u64>,
    partial: bool,
}

impl RangedResponse {
    fn new(response: Response) -> Self {
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        match (response.status(), content_range) {
            (StatusCode::PARTIAL_CONTENT, Some((start, total))) => Self {
                response,
                start,
                total,
                partial: true,
            },
            _ => {
                let total = response.content_length();
                Self {
                    response,
                    start: 0,
                    total,
                    partial: false,
                }
            }
        }
    }

    /// Offset of the first body byte within the resource
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Length of the whole resource, when the server says
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Whether the server honoured the range
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Next piece of the body, `None` at the end
    pub async fn chunk(&mut self) -> NetworkResult<Option<Bytes>> {
        self.response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout
            } else {
                NetworkError::Http(e)
            }
        })
    }
}

/// `bytes 100-199/1000` -> `(100, Some(1000))`; `*` totals are unknown
fn parse_content_range(value: &str) -> Option<(u64, Option<u64>)> {
    let range = value.trim().strip_prefix("bytes ")?;
    let (span, total) = range.split_once('/')?;
    let (start, _) = span.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let total = total.trim().parse().ok();
    Some((start, total))
}

fn check_status(result: Result<Response, reqwest::Error>) -> NetworkResult<Response> {
    let response = result.map_err(|e| {
        if e.is_timeout() {
            NetworkError::Timeout
        } else {
            NetworkError::Http(e)
        }
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NetworkError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}
