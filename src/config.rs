//! Client configuration.
//!
//! A [`ClientConfig`] is fixed when a client is built and never changes
//! afterwards. It can be written by hand, deserialized as part of an
//! application's own config file, or read from `UCOTRON_*` environment
//! variables with [`ClientConfig::from_env`].

use crate::retry::RetryConfig;
use crate::{Error, Result};
use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Server URL used by [`ClientBuilder::from_env`](crate::ClientBuilder::from_env)
/// when `UCOTRON_SERVER_URL` is unset.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8420";

/// Settings shared by every call a client makes.
///
/// # Examples
///
/// ```
/// use ucotron::{ClientConfig, RetryConfig};
///
/// let config = ClientConfig {
///     timeout_secs: 5.0,
///     retry: RetryConfig::new(5, 200, 2000),
///     default_namespace: Some("agents".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.timeout().as_millis(), 5000);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout applied to each individual HTTP attempt, in seconds.
    pub timeout_secs: f64,

    /// Backoff settings for transient failures.
    pub retry: RetryConfig,

    /// Namespace used when a call does not name one. Falls back to
    /// `"default"` when unset.
    pub default_namespace: Option<String>,

    /// Bearer token sent in the `Authorization` header.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            retry: RetryConfig::default(),
            default_namespace: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .field("default_namespace", &self.default_namespace)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientConfig {
    /// Reads the configuration from `UCOTRON_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `UCOTRON_TIMEOUT_SECS` | `timeout_secs` |
    /// | `UCOTRON_MAX_RETRIES` | `retry.max_retries` |
    /// | `UCOTRON_BASE_DELAY_MS` | `retry.base_delay_ms` |
    /// | `UCOTRON_MAX_DELAY_MS` | `retry.max_delay_ms` |
    /// | `UCOTRON_NAMESPACE` | `default_namespace` |
    /// | `UCOTRON_API_KEY` | `api_key` |
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(timeout) = parse_var(&lookup, "UCOTRON_TIMEOUT_SECS")? {
            config.timeout_secs = timeout;
        }
        if let Some(max_retries) = parse_var(&lookup, "UCOTRON_MAX_RETRIES")? {
            config.retry.max_retries = max_retries;
        }
        if let Some(base) = parse_var(&lookup, "UCOTRON_BASE_DELAY_MS")? {
            config.retry.base_delay_ms = base;
        }
        if let Some(max) = parse_var(&lookup, "UCOTRON_MAX_DELAY_MS")? {
            config.retry.max_delay_ms = max;
        }
        config.default_namespace = lookup("UCOTRON_NAMESPACE").filter(|ns| !ns.is_empty());
        config.api_key = lookup("UCOTRON_API_KEY").filter(|key| !key.is_empty());

        Ok(config)
    }

    /// The per-attempt timeout as a [`Duration`].
    ///
    /// Values [`Duration`] cannot hold map to zero; [`validate`] rejects
    /// them, and values that round to zero, before a client is built.
    ///
    /// [`validate`]: ClientConfig::validate
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::ZERO)
    }

    /// Checks that the timeout is positive and the retry bounds are consistent.
    pub fn validate(&self) -> Result<()> {
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "timeout_secs must be a positive number of seconds, got {}",
                    self.timeout_secs
                )))
            }
        }
        self.retry.validate()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Configuration(format!("Invalid {name} value {raw:?}: {e}"))),
    }
}

/// Strips a single trailing slash from a server URL.
pub(crate) fn normalize_base_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Validated, immutable state shared by both client flavours.
#[derive(Debug)]
pub(crate) struct Settings {
    pub base_url: String,
    pub config: ClientConfig,
    pub headers: HeaderMap,
}

impl Settings {
    pub fn new(base_url: &str, config: ClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(base_url).to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::Configuration(format!("Invalid base URL {base_url:?}: {e}")))?;
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| Error::Configuration(format!("Invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            base_url,
            config,
            headers,
        })
    }

    /// Full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.config.default_namespace.as_deref()
    }
}
