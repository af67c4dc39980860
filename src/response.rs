//! Response shapes the engine can be asked to decode.
//!
//! Every call names the shape it expects with a marker type: [`Json`] for a
//! single object, [`JsonList`] for an array of objects, [`NoContent`] when the
//! body is discarded. The engine decodes a successful body by dispatching on
//! that marker.

use crate::{Error, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Decoding rule for a successful response body.
pub(crate) trait Expect {
    /// The typed value handed back to the caller.
    type Output;

    fn decode(status: StatusCode, body: String) -> Result<Self::Output>;
}

/// A single JSON object decoded into `T`.
pub(crate) struct Json<T>(PhantomData<T>);

/// A JSON array whose items are each decoded into `T`.
pub(crate) struct JsonList<T>(PhantomData<T>);

/// No body is expected; whatever the server sent is dropped.
pub(crate) struct NoContent;

impl<T: DeserializeOwned> Expect for Json<T> {
    type Output = T;

    fn decode(status: StatusCode, body: String) -> Result<T> {
        serde_json::from_str(&body).map_err(|e| decode_error(status, body, e.to_string()))
    }
}

impl<T: DeserializeOwned> Expect for JsonList<T> {
    type Output = Vec<T>;

    fn decode(status: StatusCode, body: String) -> Result<Vec<T>> {
        let items: Vec<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(items) => items,
            Err(e) => return Err(decode_error(status, body, e.to_string())),
        };

        let mut decoded = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<T>(item) {
                Ok(value) => decoded.push(value),
                Err(e) => return Err(decode_error(status, body, format!("item {index}: {e}"))),
            }
        }
        Ok(decoded)
    }
}

impl Expect for NoContent {
    type Output = ();

    fn decode(_status: StatusCode, _body: String) -> Result<()> {
        Ok(())
    }
}

fn decode_error(status: StatusCode, raw_response: String, serde_error: String) -> Error {
    Error::Decode {
        status,
        raw_response,
        serde_error,
    }
}
