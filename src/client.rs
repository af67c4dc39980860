//! Async client for the Ucotron server.
//!
//! The [`Client`] type is the main entry point for non-blocking calls. Use
//! [`ClientBuilder`] to configure it; the same builder produces the
//! [`blocking::Client`](crate::blocking::Client).

use crate::config::{ClientConfig, Settings, DEFAULT_SERVER_URL};
use crate::options::{
    AddMemoryOptions, AugmentOptions, EntityOptions, LearnOptions, ListEntitiesOptions,
    ListMemoriesOptions, SearchOptions, UpdateMemoryOptions,
};
use crate::request::{Call, NAMESPACE_HEADER};
use crate::response::{Expect, Json, JsonList, NoContent};
use crate::retry::{RetryConfig, RetryState, Step};
use crate::transport::TransportSlot;
use crate::types::{
    AugmentResponse, CreateMemoryResponse, EntityResponse, HealthResponse, LearnResponse,
    MemoryResponse, MetricsResponse, SearchResponse,
};
use crate::{blocking, endpoints, Error, Result};
use http::{HeaderValue, StatusCode};
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An async client for the Ucotron memory server.
///
/// Every call runs the same retry protocol: 4xx responses fail immediately,
/// 5xx responses and transport faults are retried with exponential backoff
/// until the attempt budget is spent. The underlying HTTP client is created
/// on first use and shared by clones of this client.
///
/// # Examples
///
/// ```no_run
/// use ucotron::{Client, SearchOptions};
///
/// # async fn example() -> Result<(), ucotron::Error> {
/// let client = Client::new("http://localhost:8420")?;
///
/// client.add_memory("Juan works at Acme as a data engineer.", None).await?;
///
/// let opts = SearchOptions {
///     limit: Some(5),
///     ..Default::default()
/// };
/// let found = client.search("Where does Juan work?", Some(&opts)).await?;
/// for item in &found.results {
///     println!("{:.3} {}", item.score, item.content);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    settings: Settings,
    transport: TransportSlot<reqwest::Client>,
}

impl Client {
    /// Creates a client for `server_url` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(server_url: impl AsRef<str>) -> Result<Self> {
        ClientBuilder::new().base_url(server_url)?.build()
    }

    /// Creates a client for `server_url` with the given configuration.
    pub fn with_config(server_url: impl AsRef<str>, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new()
            .base_url(server_url)?
            .config(config)
            .build()
    }

    /// Creates a client from `UCOTRON_*` environment variables.
    ///
    /// See [`ClientBuilder::from_env`].
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env()?.build()
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_settings(settings: Settings) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                settings,
                transport: TransportSlot::empty(),
            }),
        }
    }

    /// The server URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.settings.base_url
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.settings.config
    }

    // -- lifecycle ----------------------------------------------------------

    /// Creates the HTTP transport now instead of on the first call.
    pub fn open(&self) -> Result<()> {
        self.transport().map(|_| ())
    }

    /// Releases the HTTP transport and its pooled connections.
    ///
    /// The client stays usable: the next call opens a fresh transport. Do not
    /// close a client while a call on it is still in flight.
    pub fn close(&self) {
        if self.inner.transport.close() {
            tracing::debug!(base_url = %self.base_url(), "Closed HTTP transport");
        }
    }

    /// Returns `true` while a transport is open.
    pub fn is_open(&self) -> bool {
        self.inner.transport.is_open()
    }

    /// Opens the client and returns a guard that closes it when dropped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ucotron::Client;
    ///
    /// # async fn example() -> Result<(), ucotron::Error> {
    /// let client = Client::new("http://localhost:8420")?;
    /// {
    ///     let session = client.session()?;
    ///     let health = session.health().await?;
    ///     println!("server is {}", health.status);
    /// } // transport released here, even if a call above failed
    /// # Ok(())
    /// # }
    /// ```
    pub fn session(&self) -> Result<Session<'_>> {
        self.open()?;
        Ok(Session { client: self })
    }

    fn transport(&self) -> Result<reqwest::Client> {
        self.inner.transport.get_or_open(|| {
            let settings = &self.inner.settings;
            let http = reqwest::Client::builder()
                .timeout(settings.config.timeout())
                .default_headers(settings.headers.clone())
                .build()
                .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
            tracing::debug!(base_url = %settings.base_url, "Opened HTTP transport");
            Ok(http)
        })
    }

    // -- engine -------------------------------------------------------------

    /// Runs `call` through the retry protocol and decodes the result as `E`.
    async fn execute<E: Expect>(&self, call: Call) -> Result<E::Output> {
        let settings = &self.inner.settings;
        let namespace = call.namespace_header(settings.default_namespace())?;
        let http = self.transport()?;
        let url = settings.url(&call.path);
        let mut state = RetryState::new(settings.config.retry, &call);

        loop {
            tracing::debug!(
                method = %call.method,
                url = %url,
                namespace = ?namespace,
                attempt = state.attempt() + 1,
                "Executing HTTP request"
            );

            let exchange = send(&http, &call, &url, &namespace).await;
            match state.advance::<E>(exchange) {
                Step::Finish(result) => return result,
                Step::Backoff(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    // -- endpoints ----------------------------------------------------------

    /// Checks server health and reports which models are loaded.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.execute::<Json<HealthResponse>>(endpoints::health())
            .await
    }

    /// Fetches server-wide request counters.
    pub async fn metrics(&self) -> Result<MetricsResponse> {
        self.execute::<Json<MetricsResponse>>(endpoints::metrics())
            .await
    }

    /// Runs a hybrid vector and graph search over stored memories.
    pub async fn search(
        &self,
        query: &str,
        opts: Option<&SearchOptions>,
    ) -> Result<SearchResponse> {
        self.execute::<Json<SearchResponse>>(endpoints::search(query, opts)?)
            .await
    }

    /// Retrieves memories and entities relevant to `context`, along with a
    /// ready-to-use context string.
    pub async fn augment(
        &self,
        context: &str,
        opts: Option<&AugmentOptions>,
    ) -> Result<AugmentResponse> {
        self.execute::<Json<AugmentResponse>>(endpoints::augment(context, opts)?)
            .await
    }

    /// Extracts and stores knowledge from an agent's output.
    pub async fn learn(&self, output: &str, opts: Option<&LearnOptions>) -> Result<LearnResponse> {
        self.execute::<Json<LearnResponse>>(endpoints::learn(output, opts)?)
            .await
    }

    /// Ingests `text` as a new memory.
    pub async fn add_memory(
        &self,
        text: &str,
        opts: Option<&AddMemoryOptions>,
    ) -> Result<CreateMemoryResponse> {
        self.execute::<Json<CreateMemoryResponse>>(endpoints::add_memory(text, opts)?)
            .await
    }

    /// Fetches a single memory by id.
    pub async fn get_memory(&self, id: u64, opts: Option<&EntityOptions>) -> Result<MemoryResponse> {
        self.execute::<Json<MemoryResponse>>(endpoints::get_memory(id, opts))
            .await
    }

    /// Lists memories, optionally filtered by node type and paginated.
    pub async fn list_memories(
        &self,
        opts: Option<&ListMemoriesOptions>,
    ) -> Result<Vec<MemoryResponse>> {
        self.execute::<JsonList<MemoryResponse>>(endpoints::list_memories(opts))
            .await
    }

    /// Replaces the content and/or metadata of a memory.
    pub async fn update_memory(
        &self,
        id: u64,
        opts: Option<&UpdateMemoryOptions>,
    ) -> Result<MemoryResponse> {
        self.execute::<Json<MemoryResponse>>(endpoints::update_memory(id, opts)?)
            .await
    }

    /// Deletes a memory. The server answers with no body.
    pub async fn delete_memory(&self, id: u64, opts: Option<&EntityOptions>) -> Result<()> {
        self.execute::<NoContent>(endpoints::delete_memory(id, opts))
            .await
    }

    /// Fetches an entity, including its neighbors when the server reports them.
    pub async fn get_entity(&self, id: u64, opts: Option<&EntityOptions>) -> Result<EntityResponse> {
        self.execute::<Json<EntityResponse>>(endpoints::get_entity(id, opts))
            .await
    }

    /// Lists entities, paginated by `limit` and `offset`.
    pub async fn list_entities(
        &self,
        opts: Option<&ListEntitiesOptions>,
    ) -> Result<Vec<EntityResponse>> {
        self.execute::<JsonList<EntityResponse>>(endpoints::list_entities(opts))
            .await
    }
}

/// Makes a single HTTP attempt and reads the whole body.
async fn send(
    http: &reqwest::Client,
    call: &Call,
    url: &str,
    namespace: &HeaderValue,
) -> Result<(StatusCode, String)> {
    let mut request = http
        .request(call.method.clone(), url)
        .header(NAMESPACE_HEADER, namespace.clone());
    if !call.query.is_empty() {
        request = request.query(&call.query);
    }
    if let Some(body) = &call.body {
        request = request.json(body);
    }

    let started = Instant::now();
    let response = request
        .send()
        .await
        .map_err(|e| Error::connection(call.describe(), e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::connection(format!("{} (reading body)", call.describe()), e))?;

    tracing::info!(
        status = status.as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Received HTTP response"
    );
    Ok((status, body))
}

/// A [`Client`] that is closed when this guard goes out of scope.
///
/// Created by [`Client::session`]. Derefs to the client.
pub struct Session<'a> {
    client: &'a Client,
}

impl Deref for Session<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}

/// Builder for configuring and creating a [`Client`] or a
/// [`blocking::Client`].
///
/// # Examples
///
/// ```no_run
/// use ucotron::{ClientBuilder, RetryConfig};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), ucotron::Error> {
/// let client = ClientBuilder::new()
///     .base_url("http://localhost:8420/")?
///     .timeout(Duration::from_secs(10))
///     .retry(RetryConfig::new(5, 250, 4000))
///     .default_namespace("support-bot")
///     .api_key("uc_live_...")
///     .build()?;
/// assert_eq!(client.base_url(), "http://localhost:8420");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from `UCOTRON_SERVER_URL` (default `http://localhost:8420`) and
    /// [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let server_url = std::env::var("UCOTRON_SERVER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Ok(Self::new()
            .base_url(server_url)?
            .config(ClientConfig::from_env()?))
    }

    /// Sets the server URL. A single trailing slash is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        url::Url::parse(url)
            .map_err(|e| Error::Configuration(format!("Invalid base URL {url:?}: {e}")))?;
        // Normalized once, in `Settings::new`.
        self.base_url = Some(url.to_string());
        Ok(self)
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the timeout for each individual attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs_f64();
        self
    }

    /// Sets the backoff policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the namespace used by calls that do not name one. An empty
    /// string leaves it unset.
    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.default_namespace = Some(namespace.into()).filter(|ns| !ns.is_empty());
        self
    }

    /// Sets the bearer token sent with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    fn settings(self) -> Result<Settings> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;
        Settings::new(&base_url, self.config)
    }

    /// Builds an async [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the configuration is
    /// invalid.
    pub fn build(self) -> Result<Client> {
        Ok(Client::from_settings(self.settings()?))
    }

    /// Builds a [`blocking::Client`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the configuration is
    /// invalid.
    pub fn build_blocking(self) -> Result<blocking::Client> {
        Ok(blocking::Client::from_settings(self.settings()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = ClientBuilder::new().build().err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let with_slash = Client::new("http://127.0.0.1:8420/").unwrap();
        let without = Client::new("http://127.0.0.1:8420").unwrap();

        assert_eq!(with_slash.base_url(), "http://127.0.0.1:8420");
        assert_eq!(without.base_url(), "http://127.0.0.1:8420");
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = ClientBuilder::new()
            .base_url("http://127.0.0.1:8420")
            .unwrap()
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_builder_sets_config() {
        let client = ClientBuilder::new()
            .base_url("http://127.0.0.1:8420")
            .unwrap()
            .timeout(Duration::from_millis(1500))
            .retry(RetryConfig::disabled())
            .default_namespace("ns")
            .build()
            .unwrap();

        assert_eq!(client.config().timeout_secs, 1.5);
        assert_eq!(client.config().retry.max_attempts(), 1);
        assert_eq!(client.config().default_namespace.as_deref(), Some("ns"));
    }

    #[test]
    fn test_builder_ignores_empty_namespace() {
        let client = ClientBuilder::new()
            .base_url("http://127.0.0.1:8420")
            .unwrap()
            .default_namespace("")
            .build()
            .unwrap();

        assert_eq!(client.config().default_namespace, None);
    }

    #[test]
    fn test_transport_is_lazy() {
        let client = Client::new("http://127.0.0.1:8420").unwrap();
        assert!(!client.is_open());

        client.open().unwrap();
        assert!(client.is_open());

        client.close();
        assert!(!client.is_open());
    }

    #[test]
    fn test_session_closes_on_drop() {
        let client = Client::new("http://127.0.0.1:8420").unwrap();
        {
            let session = client.session().unwrap();
            assert!(session.is_open());
        }
        assert!(!client.is_open());
    }
}
