//! Endpoint descriptions.
//!
//! An [`Endpoint`] carries exactly what is needed to build one request: the
//! path relative to a [`BaseAddress`](crate::BaseAddress), the method, and the
//! optional headers, parameters and raw body.
//!
//! # Example
//!
//! ```
//! use courier_core::{Endpoint, Method};
//! use serde_json::json;
//!
//! let endpoint = Endpoint::get("/counters")
//!     .with_header("Accept-Language", "en")
//!     .with_parameters(json!({ "page": 2 }));
//!
//! assert_eq!(endpoint.method(), Method::Get);
//! assert_eq!(endpoint.path(), "/counters");
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;

use crate::{BuildError, Method};

/// Immutable description of a single HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
    method: Method,
    headers: Option<HashMap<String, String>>,
    parameters: Option<Value>,
    raw_body: Option<Bytes>,
}

impl Endpoint {
    /// Creates an endpoint with no headers, parameters or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: None,
            parameters: None,
            raw_body: None,
        }
    }

    /// Shorthand for a GET endpoint.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Shorthand for a POST endpoint.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Shorthand for a PUT endpoint.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Shorthand for a DELETE endpoint.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Adds a header, replacing a previous value for the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Adds several headers.
    #[must_use]
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.get_or_insert_with(HashMap::new).extend(headers);
        self
    }

    /// Sets the parameters, encoded in the query string or the body depending on the method.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Sets the parameters from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::BodyEncoding`] if the value cannot be represented as JSON.
    pub fn with_serialized_parameters<T: serde::Serialize>(
        self,
        parameters: &T,
    ) -> Result<Self, BuildError> {
        let value = serde_json::to_value(parameters).map_err(BuildError::BodyEncoding)?;
        Ok(self.with_parameters(value))
    }

    /// Sets a raw body, sent verbatim and taking precedence over JSON-encoded parameters.
    #[must_use]
    pub fn with_raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// Path relative to the base address.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Headers, if any were set.
    #[must_use]
    pub const fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    /// Parameters, if any were set.
    #[must_use]
    pub const fn parameters(&self) -> Option<&Value> {
        self.parameters.as_ref()
    }

    /// Raw body, if any was set.
    #[must_use]
    pub const fn raw_body(&self) -> Option<&Bytes> {
        self.raw_body.as_ref()
    }
}
