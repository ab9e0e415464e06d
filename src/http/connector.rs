//! Connectors
//!
//! A connector turns a `Request` into a `Response`. Implementors only
//! provide the transport (`execute`); the provided `send` runs the
//! request's response hooks as soon as the response arrives, and
//! `send_async` does the same on a spawned task.

use super::request::Request;
use super::response::Response;
use crate::error::{Error, Result};
use crate::types::StringMap;
use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

/// Transport capable of sending requests
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform the round-trip and buffer the response
    ///
    /// Non-success statuses are returned as responses, not errors.
    async fn execute(&self, request: &Request) -> Result<Response>;

    /// Send a request, running its response hooks on arrival
    async fn send(&self, request: Request) -> Result<Response> {
        let response = self.execute(&request).await?;
        request.hooks().run(&response)?;
        Ok(response)
    }
}

/// Dispatch a request on a background task
///
/// The round-trip and the request's hooks run whether or not the returned
/// future is ever awaited. Dropping the future detaches the task.
pub fn send_async<C>(connector: Arc<C>, request: Request) -> ResponseFuture
where
    C: Connector + ?Sized,
{
    let handle = tokio::spawn(async move { connector.send(request).await });
    ResponseFuture::spawned(handle)
}

// ============================================================================
// Response Future
// ============================================================================

/// A response that is either already here or still in flight
#[derive(Debug)]
pub struct ResponseFuture {
    inner: ResponseFutureInner,
}

#[derive(Debug)]
enum ResponseFutureInner {
    Ready(Option<Response>),
    Spawned(JoinHandle<Result<Response>>),
}

impl ResponseFuture {
    /// Wrap an already received response
    pub fn ready(response: Response) -> Self {
        Self {
            inner: ResponseFutureInner::Ready(Some(response)),
        }
    }

    pub(crate) fn spawned(handle: JoinHandle<Result<Response>>) -> Self {
        Self {
            inner: ResponseFutureInner::Spawned(handle),
        }
    }

    /// Whether the response was resolved before being handed out
    pub fn is_ready(&self) -> bool {
        matches!(self.inner, ResponseFutureInner::Ready(_))
    }

    /// Whether awaiting would complete without waiting on the network
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            ResponseFutureInner::Ready(_) => true,
            ResponseFutureInner::Spawned(handle) => handle.is_finished(),
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            ResponseFutureInner::Ready(response) => Poll::Ready(
                response
                    .take()
                    .ok_or_else(|| Error::Other("response future polled after completion".into())),
            ),
            ResponseFutureInner::Spawned(handle) => {
                Pin::new(handle).poll(cx).map(|joined| match joined {
                    Ok(result) => result,
                    Err(e) => Err(Error::TaskJoin(e)),
                })
            }
        }
    }
}

// ============================================================================
// HTTP Connector
// ============================================================================

/// Configuration for the HTTP connector
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            default_headers: StringMap::new(),
            user_agent: format!("solidafy-pager/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectorConfig {
    /// Create a new config builder
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::default()
    }
}

/// Builder for connector config
#[derive(Default)]
pub struct ConnectorConfigBuilder {
    config: ConnectorConfig,
}

impl ConnectorConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ConnectorConfig {
        self.config
    }
}

/// reqwest-backed connector
///
/// Cloning shares the underlying connection pool but copies the config.
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    config: ConnectorConfig,
}

impl HttpConnector {
    /// Create a connector with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ConnectorConfig::default())
    }

    /// Create a connector with custom configuration
    pub fn with_config(config: ConnectorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Connector configuration
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        let full = match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        };
        Ok(Url::parse(&full)?)
    }

    fn classify(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            return Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            };
        }
        Error::Http(error)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let url = self.build_url(&request.path)?;
        let mut req = self.client.request(request.method.into(), url.clone());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        debug!("{} {} -> {}", request.method, url, status);
        Ok(Response::from_parts(status, headers, body, Some(final_url)))
    }
}

impl std::fmt::Debug for HttpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
