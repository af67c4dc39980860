//! Description of a single logical API call.

use crate::{Error, Result};
use http::{HeaderValue, Method};
use serde::Serialize;

/// Header carrying the namespace every request is scoped to.
pub const NAMESPACE_HEADER: &str = "X-Ucotron-Namespace";

/// Namespace used when neither the call nor the client names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Everything needed to issue one logical request.
///
/// A `Call` is built once per public method invocation and reused verbatim
/// for every retry attempt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, including the `/api/v1` prefix.
    pub path: String,

    /// Per-call namespace override.
    pub namespace: Option<String>,

    /// Query parameters, in the order they are sent.
    pub query: Vec<(&'static str, String)>,

    /// JSON request body.
    pub body: Option<serde_json::Value>,
}

impl Call {
    /// Creates a new `Call` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            namespace: None,
            query: Vec::new(),
            body: None,
        }
    }

    /// Sets the namespace override, if one is given.
    pub fn with_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(str::to_owned);
        self
    }

    /// Adds a query parameter when a value is present.
    pub fn with_query_param<V: ToString>(mut self, key: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.query.push((key, value.to_string()));
        }
        self
    }

    /// Sets the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn with_body(mut self, body: &impl Serialize) -> Result<Self> {
        let json =
            serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
        self.body = Some(json);
        Ok(self)
    }

    /// Resolves the namespace header value: the call's override, else the
    /// client default, else [`DEFAULT_NAMESPACE`]. Empty strings count as unset.
    pub fn namespace_header(&self, client_default: Option<&str>) -> Result<HeaderValue> {
        let namespace = self
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(client_default.filter(|ns| !ns.is_empty()))
            .unwrap_or(DEFAULT_NAMESPACE);
        HeaderValue::from_str(namespace)
            .map_err(|e| Error::Configuration(format!("Invalid namespace {namespace:?}: {e}")))
    }

    /// Short description used in log lines and connection errors.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}
