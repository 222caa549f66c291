//! HTTP responses as seen by the executor and by callers.
//!
//! [`RawResponse`] is what a transport returns; [`ResponseMeta`] is the part of
//! it handed back to the caller alongside the typed result.

use std::collections::HashMap;

use bytes::Bytes;
use url::Url;

/// HTTP response with status, headers, body and the URL that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
    url: Url,
}

impl RawResponse {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes, url: Url) -> Self {
        Self {
            status,
            headers,
            body,
            url,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
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

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// URL of the response.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Metadata without the body.
    #[must_use]
    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: self.status,
            headers: self.headers.clone(),
            url: self.url.clone(),
        }
    }
}

/// Status, headers and URL of a response, delivered with every result that had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    status: u16,
    headers: HashMap<String, String>,
    url: Url,
}

impl ResponseMeta {
    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
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

    /// URL of the response.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    fn url() -> Url {
        Url::parse("https://api.example.com/counters").expect("valid URL")
    }

    #[test]
    fn response_basic() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let response = RawResponse::new(200, headers, Bytes::from(r#"{"id":1}"#), url());

        check!(response.status() == 200);
        check!(response.header("Content-Type") == Some("application/json"));
        check!(response.is_success());
    }

    #[test]
    fn response_success_range() {
        for status in [200, 201, 204, 299] {
            check!(RawResponse::new(status, HashMap::new(), Bytes::new(), url()).is_success());
        }
        for status in [100, 199, 300, 404, 500] {
            check!(!RawResponse::new(status, HashMap::new(), Bytes::new(), url()).is_success());
        }
    }

    #[test]
    fn response_meta_drops_body() {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "42".to_string());
        let response = RawResponse::new(404, headers, Bytes::from("gone"), url());

        let meta = response.meta();
        check!(meta.status() == 404);
        check!(meta.header("X-Request-Id") == Some("42"));
        check!(meta.url() == &url());
    }
}
