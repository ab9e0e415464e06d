//! Buffered HTTP responses
//!
//! The body is read fully before hooks run, so a `Response` is cheap to
//! clone and can be decoded any number of times.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

/// A fully received HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    url: Option<String>,
}

impl Response {
    /// Create a response from a status and body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            url: None,
        }
    }

    /// Create a 200 response with a JSON body
    pub fn json_ok(body: &JsonValue) -> Self {
        Self::new(200, body.to_string())
    }

    /// Create a response from its parts
    pub fn from_parts(status: u16, headers: HeaderMap, body: Bytes, url: Option<String>) -> Self {
        Self {
            status,
            headers,
            body,
            url,
        }
    }

    /// Add a header
    ///
    /// Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// URL the response was received from, when known
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Raw body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::JsonParse)
    }

    /// Decode the body as an untyped JSON value
    pub fn json_value(&self) -> Result<JsonValue> {
        self.json()
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is a client or server error
    pub fn is_failed(&self) -> bool {
        self.status >= 400
    }

    /// Return an error if this response represents a failure
    pub fn throw(&self) -> Result<&Self> {
        if self.is_failed() {
            return Err(Error::http_status(self.status, self.text()));
        }
        Ok(self)
    }
}
