//! A blocking client for the Ucotron server.
//!
//! [`Client`] mirrors [`crate::Client`] method for method. Both send the same
//! requests and apply the same retry policy; this one occupies the calling
//! thread for the whole attempt and backoff sequence.
//!
//! Do not use it from inside an async runtime. Build it with
//! [`ClientBuilder::build_blocking`](crate::ClientBuilder::build_blocking).
//!
//! # Examples
//!
//! ```no_run
//! use ucotron::blocking::Client;
//!
//! # fn example() -> Result<(), ucotron::Error> {
//! let client = Client::new("http://localhost:8420")?;
//! let result = client.augment("What do you know about Juan?", None)?;
//! println!("{}", result.context_text);
//! # Ok(())
//! # }
//! ```

use crate::config::{ClientConfig, Settings};
use crate::options::{
    AddMemoryOptions, AugmentOptions, EntityOptions, LearnOptions, ListEntitiesOptions,
    ListMemoriesOptions, SearchOptions, UpdateMemoryOptions,
};
use crate::request::{Call, NAMESPACE_HEADER};
use crate::response::{Expect, Json, JsonList, NoContent};
use crate::retry::{RetryState, Step};
use crate::transport::TransportSlot;
use crate::types::{
    AugmentResponse, CreateMemoryResponse, EntityResponse, HealthResponse, LearnResponse,
    MemoryResponse, MetricsResponse, SearchResponse,
};
use crate::{endpoints, ClientBuilder, Error, Result};
use http::{HeaderValue, StatusCode};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

/// A blocking client for the Ucotron memory server.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    settings: Settings,
    transport: TransportSlot<reqwest::blocking::Client>,
}

impl Client {
    /// Creates a client for `server_url` with the default configuration.
    pub fn new(server_url: impl AsRef<str>) -> Result<Self> {
        ClientBuilder::new().base_url(server_url)?.build_blocking()
    }

    /// Creates a client for `server_url` with the given configuration.
    pub fn with_config(server_url: impl AsRef<str>, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new()
            .base_url(server_url)?
            .config(config)
            .build_blocking()
    }

    /// Creates a client from `UCOTRON_*` environment variables.
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env()?.build_blocking()
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

    /// Creates the HTTP transport now instead of on the first call.
    pub fn open(&self) -> Result<()> {
        self.transport().map(|_| ())
    }

    /// Releases the HTTP transport. The next call opens a fresh one.
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
    pub fn session(&self) -> Result<Session<'_>> {
        self.open()?;
        Ok(Session { client: self })
    }

    fn transport(&self) -> Result<reqwest::blocking::Client> {
        self.inner.transport.get_or_open(|| {
            let settings = &self.inner.settings;
            let http = reqwest::blocking::Client::builder()
                .timeout(settings.config.timeout())
                .default_headers(settings.headers.clone())
                .build()
                .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
            tracing::debug!(base_url = %settings.base_url, "Opened HTTP transport");
            Ok(http)
        })
    }

    fn execute<E: Expect>(&self, call: Call) -> Result<E::Output> {
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

            let exchange = send(&http, &call, &url, &namespace);
            match state.advance::<E>(exchange) {
                Step::Finish(result) => return result,
                Step::Backoff(delay) => std::thread::sleep(delay),
            }
        }
    }

    /// Checks server health and reports which models are loaded.
    pub fn health(&self) -> Result<HealthResponse> {
        self.execute::<Json<HealthResponse>>(endpoints::health())
    }

    /// Fetches server-wide request counters.
    pub fn metrics(&self) -> Result<MetricsResponse> {
        self.execute::<Json<MetricsResponse>>(endpoints::metrics())
    }

    /// Runs a hybrid vector and graph search over stored memories.
    pub fn search(&self, query: &str, opts: Option<&SearchOptions>) -> Result<SearchResponse> {
        self.execute::<Json<SearchResponse>>(endpoints::search(query, opts)?)
    }

    /// Retrieves memories and entities relevant to `context`, with a ready-made
    /// context string.
    pub fn augment(&self, context: &str, opts: Option<&AugmentOptions>) -> Result<AugmentResponse> {
        self.execute::<Json<AugmentResponse>>(endpoints::augment(context, opts)?)
    }

    /// Extracts and stores knowledge from an agent's output.
    pub fn learn(&self, output: &str, opts: Option<&LearnOptions>) -> Result<LearnResponse> {
        self.execute::<Json<LearnResponse>>(endpoints::learn(output, opts)?)
    }

    /// Ingests `text` as a new memory.
    pub fn add_memory(
        &self,
        text: &str,
        opts: Option<&AddMemoryOptions>,
    ) -> Result<CreateMemoryResponse> {
        self.execute::<Json<CreateMemoryResponse>>(endpoints::add_memory(text, opts)?)
    }

    /// Fetches a single memory by id.
    pub fn get_memory(&self, id: u64, opts: Option<&EntityOptions>) -> Result<MemoryResponse> {
        self.execute::<Json<MemoryResponse>>(endpoints::get_memory(id, opts))
    }

    /// Lists memories, optionally filtered by node type and paginated.
    pub fn list_memories(&self, opts: Option<&ListMemoriesOptions>) -> Result<Vec<MemoryResponse>> {
        self.execute::<JsonList<MemoryResponse>>(endpoints::list_memories(opts))
    }

    /// Replaces the content and/or metadata of a memory.
    pub fn update_memory(
        &self,
        id: u64,
        opts: Option<&UpdateMemoryOptions>,
    ) -> Result<MemoryResponse> {
        self.execute::<Json<MemoryResponse>>(endpoints::update_memory(id, opts)?)
    }

    /// Deletes a memory. The server answers with no body.
    pub fn delete_memory(&self, id: u64, opts: Option<&EntityOptions>) -> Result<()> {
        self.execute::<NoContent>(endpoints::delete_memory(id, opts))
    }

    /// Fetches an entity, including its neighbors when the server reports them.
    pub fn get_entity(&self, id: u64, opts: Option<&EntityOptions>) -> Result<EntityResponse> {
        self.execute::<Json<EntityResponse>>(endpoints::get_entity(id, opts))
    }

    /// Lists entities, paginated by `limit` and `offset`.
    pub fn list_entities(&self, opts: Option<&ListEntitiesOptions>) -> Result<Vec<EntityResponse>> {
        self.execute::<JsonList<EntityResponse>>(endpoints::list_entities(opts))
    }
}

fn send(
    http: &reqwest::blocking::Client,
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
        .map_err(|e| Error::connection(call.describe(), e))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| Error::connection(format!("{} (reading body)", call.describe()), e))?;

    tracing::info!(
        status = status.as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Received HTTP response"
    );
    Ok((status, body))
}

/// A blocking [`Client`] that is closed when this guard goes out of scope.
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
