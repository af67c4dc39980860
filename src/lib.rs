//! # Ucotron - client for the Ucotron memory server
//!
//! Ucotron stores text in a combined vector and graph store and serves it back
//! as search results or as ready-made prompt context. This crate wraps its
//! HTTP API in typed, retry-aware clients: [`Client`] for async code and
//! [`blocking::Client`] for everything else.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ucotron::{AddMemoryOptions, Client, RetryConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ucotron::Error> {
//!     let client = Client::builder()
//!         .base_url("http://localhost:8420")?
//!         .timeout(Duration::from_secs(10))
//!         .retry(RetryConfig::new(3, 100, 5000))
//!         .default_namespace("assistant")
//!         .build()?;
//!
//!     let created = client
//!         .add_memory("Juan moved to Madrid in 2021.", None)
//!         .await?;
//!     println!("stored {} chunks", created.chunk_node_ids.len());
//!
//!     let context = client.augment("Where does Juan live?", None).await?;
//!     println!("{}", context.context_text);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! Every call follows the same protocol in both clients:
//!
//! - status below 400: the body is decoded and returned
//! - status 400-499: [`Error::Server`] is returned at once
//! - status 500 and above, or a transport fault: the call is retried after
//!   `min(base_delay_ms * 2^attempt, max_delay_ms)` milliseconds, up to
//!   `max_retries` times, then [`Error::RetriesExhausted`] is returned
//!
//! ## Namespaces
//!
//! Each request carries an `X-Ucotron-Namespace` header. Its value is the
//! per-call `namespace` option if set, else the client's default namespace,
//! else `"default"`.
//!
//! ## Error Handling
//!
//! ```no_run
//! use ucotron::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::new("http://localhost:8420")?;
//! match client.health().await {
//!     Ok(health) => println!("status: {}", health.status),
//!     Err(Error::RetriesExhausted { attempts, last_error }) => {
//!         eprintln!("server unreachable after {attempts} attempts: {last_error}");
//!     }
//!     Err(e) => eprintln!("health check failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod client;
pub mod config;
mod endpoints;
mod error;
pub mod options;
mod request;
mod response;
pub mod retry;
mod transport;
pub mod types;

pub use client::{Client, ClientBuilder, Session};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use options::{
    AddMemoryOptions, AugmentOptions, EntityOptions, LearnOptions, ListEntitiesOptions,
    ListMemoriesOptions, SearchOptions, UpdateMemoryOptions,
};
pub use request::{DEFAULT_NAMESPACE, NAMESPACE_HEADER};
pub use retry::RetryConfig;
pub use types::{
    AugmentResponse, CreateMemoryResponse, EntityResponse, HealthResponse,
    IngestionMetricsResponse, LearnResponse, MemoryResponse, Metadata, MetricsResponse,
    ModelStatus, NeighborResponse, SearchResponse, SearchResultItem,
};
