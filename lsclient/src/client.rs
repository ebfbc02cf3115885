//! HTTP client for the LiveStream server API
//!
//! # Example
//!
//! ```no_run
//! use lsclient::LiveStreamClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LiveStreamClient::builder()
//!         .api_base("https://myzaptech.site")
//!         .build()
//!         .await?;
//!
//!     let status = client.get_status().await?;
//!     println!("live: {} ({} viewers)", status.is_live, status.viewers);
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::models::{ApiResponse, ServerInfo, StreamStats, StreamStatus, StreamUrlInfo};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

/// Default timeout for HTTP requests (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "LiveStream/0.1.0 (lsclient)";

pub const STATUS_PATH: &str = "/api/stream/status";
pub const URL_PATH: &str = "/api/stream/url";
pub const STATS_PATH: &str = "/api/stream/stats";
pub const START_PATH: &str = "/api/stream/start";
pub const STOP_PATH: &str = "/api/stream/stop";
pub const INFO_PATH: &str = "/api/info";

/// LiveStream server HTTP client
///
/// Stateless: every call is an independent request bounded by the
/// configured timeout. Cloning is cheap (the connection pool is shared).
#[derive(Debug, Clone)]
pub struct LiveStreamClient {
    pub(crate) client: Client,
    api_base: String,
    timeout: Duration,
    debug: bool,
}

impl LiveStreamClient {
    /// Create a new client with default settings
    pub async fn new() -> Result<Self> {
        Self::builder().build().await
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Build a client from the loaded configuration
    pub async fn from_settings(settings: &lsconfig::Settings) -> Result<Self> {
        Self::builder()
            .api_base(settings.api.base_url.clone())
            .timeout(settings.api.request_timeout())
            .debug(settings.debug)
            .build()
            .await
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Uses the default API base and timeout.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            debug: false,
        }
    }

    /// Get the API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}{}",
            self.api_base.trim_end_matches('/'),
            path
        ))?)
    }

    /// Perform a request and decode the JSON envelope
    ///
    /// Fails with [`Error::Timeout`] when the whole exchange (headers and
    /// body) exceeds the timeout, and with [`Error::HttpStatus`] on a
    /// non-2xx answer. A late answer is never observed: the in-flight
    /// request is dropped when the timeout fires.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<ApiResponse<T>> {
        let url = self.endpoint(path)?;

        let exchange = async {
            let response = self
                .client
                .request(method.clone(), url.clone())
                .header(CONTENT_TYPE, "application/json")
                .timeout(self.timeout)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus(status.as_u16()));
            }

            let body: Value = response.json().await?;
            Ok::<Value, Error>(body)
        };

        let outcome = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout),
        };

        match outcome {
            Ok(body) => {
                if self.debug {
                    debug!(method = %method, url = %url, "📡 API Response: {}", body);
                }
                Ok(serde_json::from_value(body)?)
            }
            Err(err) => {
                error!(method = %method, url = %url, "❌ API Error: {}", err);
                Err(err)
            }
        }
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<T>(Method::GET, path).await?.into_data()
    }

    // ========================================================================
    // Stream
    // ========================================================================

    /// GET /api/stream/status
    pub async fn get_status(&self) -> Result<StreamStatus> {
        self.get_data(STATUS_PATH).await
    }

    /// GET /api/stream/url
    pub async fn get_stream_url(&self) -> Result<StreamUrlInfo> {
        self.get_data(URL_PATH).await
    }

    /// GET /api/stream/stats
    pub async fn get_stats(&self) -> Result<StreamStats> {
        self.get_data(STATS_PATH).await
    }

    /// POST /api/stream/start
    pub async fn start_stream(&self) -> Result<ApiResponse<Value>> {
        self.request(Method::POST, START_PATH).await
    }

    /// POST /api/stream/stop
    pub async fn stop_stream(&self) -> Result<ApiResponse<Value>> {
        self.request(Method::POST, STOP_PATH).await
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /api/info
    pub async fn get_server_info(&self) -> Result<ServerInfo> {
        self.get_data(INFO_PATH).await
    }

    /// Whether the API answers at all
    ///
    /// Never fails: any error is swallowed and reported as `false`.
    pub async fn check_connection(&self) -> bool {
        match self.get_server_info().await {
            Ok(_) => true,
            Err(err) => {
                debug!("Connection check failed: {}", err);
                false
            }
        }
    }
}

/// Builder for configuring a LiveStreamClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    api_base: String,
    timeout: Duration,
    user_agent: String,
    proxy: Option<String>,
    debug: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            debug: false,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Log every decoded response at debug level
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the client
    pub async fn build(self) -> Result<LiveStreamClient> {
        let client = if let Some(client) = self.client {
            client
        } else {
            let mut builder = Client::builder().user_agent(&self.user_agent);

            if let Some(proxy_url) = &self.proxy {
                let proxy = reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::other(format!("Invalid proxy: {}", e)))?;
                builder = builder.proxy(proxy);
            }

            builder.build().map_err(Error::Network)?
        };

        // Fail early on an unusable base URL
        Url::parse(&self.api_base)?;

        Ok(LiveStreamClient {
            client,
            api_base: self.api_base,
            timeout: self.timeout,
            debug: self.debug,
        })
    }
}
