//! Error types for Ucotron API calls.
//!
//! Every failure a call can produce surfaces as one [`Error`] value. The three
//! kinds the retry engine deals in are [`Error::Server`], [`Error::Connection`]
//! and [`Error::RetriesExhausted`]; the remaining variants are local faults that
//! are never retried.

use crate::retry::{classify, Disposition};
use http::StatusCode;

/// The main error type for Ucotron API calls.
///
/// # Examples
///
/// ```no_run
/// use ucotron::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("http://localhost:8420")?;
///
/// match client.get_memory(42, None).await {
///     Ok(memory) => println!("{}", memory.content),
///     Err(Error::Server { status, .. }) if status == http::StatusCode::NOT_FOUND => {
///         println!("no such memory");
///     }
///     Err(Error::RetriesExhausted { attempts, last_error }) => {
///         eprintln!("gave up after {attempts} attempts: {last_error}");
///     }
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The server answered with a status code of 400 or above.
    ///
    /// A 4xx status is surfaced immediately. A 5xx status is only surfaced
    /// directly when it is wrapped in [`Error::RetriesExhausted`].
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `message` - The raw response body
    /// * `code` - The machine-readable error code, empty if the server sent none
    #[error("Server error {status}: {message}")]
    Server {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        message: String,
        /// The `code` field of a JSON error body, or empty
        code: String,
    },

    /// The request could not complete at the transport level.
    ///
    /// Covers DNS failures, refused connections, timeouts, TLS failures and
    /// bodies that could not be read.
    #[error("Connection error: {message}")]
    Connection {
        /// What was being attempted when the transport failed
        message: String,
        /// The underlying transport fault, when there is one
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Every permitted attempt failed with a transient error.
    ///
    /// # Fields
    ///
    /// * `attempts` - The total number of attempts made
    /// * `last_error` - The error seen on the final attempt
    #[error("All {attempts} attempts exhausted, last error: {last_error}")]
    RetriesExhausted {
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        #[source]
        last_error: Box<Error>,
    },

    /// A successful response body did not match the expected shape.
    #[error("Failed to decode response (status {status}): {serde_error}")]
    Decode {
        /// The HTTP status code of the response
        status: StatusCode,
        /// The raw response body that failed to decode
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// The request body could not be encoded as JSON.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// Invalid configuration was provided at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Builds a [`Error::Server`] from a status and the raw response body.
    ///
    /// If the body is a JSON object with a string `code` field, that value is
    /// used as the machine code.
    pub(crate) fn server(status: StatusCode, body: String) -> Self {
        let code = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("code")?.as_str().map(str::to_owned))
            .unwrap_or_default();

        Error::Server {
            status,
            message: body,
            code,
        }
    }

    /// Builds a [`Error::Connection`] from a transport fault.
    pub(crate) fn connection(context: impl Into<String>, source: reqwest::Error) -> Self {
        let context = context.into();
        let message = if source.is_timeout() {
            format!("{context}: request timed out")
        } else if source.is_connect() {
            format!("{context}: connection failed")
        } else {
            format!("{context}: {source}")
        };

        Error::Connection {
            message,
            source: Some(source),
        }
    }

    /// Returns `true` if this error is transient.
    ///
    /// Only 5xx server errors and connection errors are transient. A wrapped
    /// [`Error::RetriesExhausted`] is terminal.
    ///
    /// # Examples
    ///
    /// ```
    /// use ucotron::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::Server {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     message: "busy".to_string(),
    ///     code: String::new(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::Server {
    ///     status: StatusCode::NOT_FOUND,
    ///     message: "missing".to_string(),
    ///     code: String::new(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Server { status, .. } => classify(*status) == Disposition::Transient,
            Error::Connection { .. } => true,
            Error::RetriesExhausted { .. } => false,
            Error::Decode { .. } => false,
            Error::Serialization(_) => false,
            Error::Configuration(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    ///
    /// For [`Error::RetriesExhausted`] this is the status of the last error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            Error::RetriesExhausted { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Returns the server-supplied error code, if any was sent.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Server { code, .. } if !code.is_empty() => Some(code.as_str()),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Server { message, .. } => Some(message.as_str()),
            Error::Decode { raw_response, .. } => Some(raw_response.as_str()),
            _ => None,
        }
    }

    /// Returns the number of attempts made, for exhausted retries.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Error::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns the last transient error, for exhausted retries.
    pub fn last_error(&self) -> Option<&Error> {
        match self {
            Error::RetriesExhausted { last_error, .. } => Some(&**last_error),
            _ => None,
        }
    }
}

/// A specialized `Result` type for Ucotron API calls.
pub type Result<T> = std::result::Result<T, Error>;
