//! Transport-level requests.
//!
//! [`build`] turns a [`BaseAddress`] and an [`Endpoint`] into the
//! [`TransportRequest`] handed to a [`Transport`](crate::Transport). Transports
//! and tests can also assemble requests directly with [`TransportRequest::builder`].
//!
//! # Example
//!
//! ```
//! use courier_core::{BaseAddress, Endpoint, Method, build};
//! use serde_json::json;
//!
//! let base = BaseAddress::new("https://api.example.com/v1/");
//! let endpoint = Endpoint::get("/counters").with_parameters(json!({ "page": 1 }));
//!
//! let request = build(&base, &endpoint).unwrap();
//! assert_eq!(request.method(), Method::Get);
//! assert_eq!(request.url().as_str(), "https://api.example.com/v1/counters?page=1");
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;
use url::Url;

use crate::{BuildError, Endpoint, Method};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Root address that endpoint paths are resolved against.
///
/// The address is kept as text; it only has to form a valid absolute URL
/// once combined with a path, which [`build`] checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseAddress(String);

impl BaseAddress {
    /// Creates a base address, dropping trailing slashes.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        Self(address.trim_end_matches('/').to_string())
    }

    /// The address without trailing slashes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins `path` onto this address and parses the result.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidUrl`] when the combination does not parse,
    /// [`BuildError::NotAbsolute`] when it has no host and
    /// [`BuildError::UnsupportedScheme`] when it is not `http` or `https`.
    pub fn join(&self, path: &str) -> Result<Url, BuildError> {
        let path = path.trim_start_matches('/');
        let raw = if path.is_empty() {
            self.0.clone()
        } else {
            format!("{}/{path}", self.0)
        };

        let url = Url::parse(&raw).map_err(|source| BuildError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;

        if url.cannot_be_a_base() || !url.has_host() {
            return Err(BuildError::NotAbsolute(raw));
        }

        if !matches!(url.scheme(), "http" | "https") {
            return Err(BuildError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(url)
    }
}

impl From<&str> for BaseAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for BaseAddress {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl From<Url> for BaseAddress {
    fn from(url: Url) -> Self {
        Self::new(String::from(url))
    }
}

impl std::fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the transport request for `endpoint` against `base`.
///
/// Parameters go to the query string for GET and DELETE and to a JSON body
/// for POST and PUT, unless a raw body is set. Query parameters skip `null`
/// members; arrays repeat the key (`a=1&a=2`). Endpoint headers are applied
/// last and replace defaults with the same name.
///
/// # Errors
///
/// Fails with a [`BuildError`] when the URL is malformed, the parameters
/// cannot be encoded, or a header is not valid HTTP.
pub fn build(base: &BaseAddress, endpoint: &Endpoint) -> Result<TransportRequest, BuildError> {
    let url = base.join(endpoint.path())?;
    let method = endpoint.method();
    let mut builder = TransportRequest::builder(method, url);

    if let Some(parameters) = endpoint.parameters() {
        if method.encodes_parameters_in_query() {
            let parameters = without_nulls(parameters);
            if !parameters.is_null() {
                let query =
                    serde_html_form::to_string(&parameters).map_err(BuildError::QueryEncoding)?;
                builder = builder.raw_query(&query);
            }
        } else if endpoint.raw_body().is_none() {
            let body = serde_json::to_vec(parameters).map_err(BuildError::BodyEncoding)?;
            builder = builder
                .header("Content-Type", JSON_CONTENT_TYPE)
                .body(Bytes::from(body));
        }
    }

    if let Some(raw_body) = endpoint.raw_body() {
        builder = builder.body(raw_body.clone());
    }

    if let Some(headers) = endpoint.headers() {
        for (name, value) in headers {
            validate_header(name, value)?;
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    Ok(builder.build())
}

/// Drops `null` object members and array items; a top-level `null` stays `null`.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(members) => Value::Object(
            members
                .iter()
                .filter(|(_, member)| !member.is_null())
                .map(|(key, member)| (key.clone(), without_nulls(member)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), BuildError> {
    let valid = http::HeaderName::from_bytes(name.as_bytes()).is_ok()
        && http::HeaderValue::from_str(value).is_ok();
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidHeader(name.to_string()))
    }
}

/// A request ready for the transport: method, absolute URL, headers and optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
}

impl TransportRequest {
    /// Creates a new [`TransportRequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> TransportRequestBuilder {
        TransportRequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HashMap<String, String>, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for [`TransportRequest`].
#[derive(Debug, Clone)]
pub struct TransportRequestBuilder {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
}

impl TransportRequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets a header, replacing any header with the same name regardless of case.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends an already-encoded query string to the URL.
    #[must_use]
    pub fn raw_query(mut self, encoded: &str) -> Self {
        if encoded.is_empty() {
            return self;
        }
        let query = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded.to_string(),
        };
        self.url.set_query(Some(&query));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`TransportRequest`].
    #[must_use]
    pub fn build(self) -> TransportRequest {
        TransportRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}
