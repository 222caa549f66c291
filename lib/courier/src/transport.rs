//! HTTP transport implementation using hyper-util.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::util::BoxCloneService;
use tower::{BoxError, Layer, ServiceExt};
use tower_service::Service;
use tracing::warn;

use crate::{
    FailureReason, RawResponse, TransportFailure, TransportOutcome, TransportRequest,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
};

// ============================================================================
// Type-Erased Service for Layer Composition
// ============================================================================

/// Type-erased service that tower layers are composed over.
pub type BoxedService = BoxCloneService<TransportRequest, RawResponse, BoxError>;

/// Future type for the Tower Service implementation.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<RawResponse, BoxError>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// `BoxCloneService` is not `Sync`; the mutex only guards the clone taken per call.
/// Each call drives its own clone to readiness before calling it, so layers
/// gated on `poll_ready` (concurrency limits, rate limits) hold their contract.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: TransportRequest) -> ServiceFuture {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}

/// Classifies an error coming out of the service stack.
///
/// Failures raised by the hyper transport keep their reason; a tower timeout
/// is a timeout; anything else is unrecognized.
#[must_use]
pub fn classify_boxed(error: BoxError) -> TransportFailure {
    match error.downcast::<TransportFailure>() {
        Ok(failure) => *failure,
        Err(error) if error.is::<tower::timeout::error::Elapsed>() => {
            TransportFailure::new(FailureReason::TimedOut, error.to_string())
        }
        Err(error) => TransportFailure::new(FailureReason::Unrecognized, error_chain(&*error)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn source_chain<'a>(
    error: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(Some(error), |&current| current.source())
}

/// Whether a `rustls` error sits anywhere in the chain.
///
/// `io::Error` hides a wrapped error from `source()`, so it is unwrapped by hand.
fn is_tls_error(error: &(dyn std::error::Error + 'static)) -> bool {
    source_chain(error).any(|cause| {
        cause.is::<rustls::Error>()
            || cause
                .downcast_ref::<std::io::Error>()
                .and_then(std::io::Error::get_ref)
                .is_some_and(|inner| inner.is::<rustls::Error>())
    })
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}

// ============================================================================
// Raw Transport (internal, direct hyper access)
// ============================================================================

/// Raw hyper-util client, the innermost service of every [`HyperTransport`].
#[derive(Clone)]
struct RawHyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl RawHyperTransport {
    fn new(config: ClientConfig) -> Self {
        let connector = https_connector(&config);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    /// Build a hyper request: default headers first, request headers override them.
    fn build_hyper_request(
        &self,
        request: TransportRequest,
    ) -> Result<http::Request<Full<Bytes>>, TransportFailure> {
        let (method, url, headers, body) = request.into_parts();

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportFailure::new(
                FailureReason::BadUrl,
                format!("unsupported scheme `{}` in {url}", url.scheme()),
            ));
        }

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        if let Some(header_map) = builder.headers_mut() {
            let defaults = self.config.default_headers.iter().map(|(n, v)| (n, v));
            for (name, value) in defaults.chain(headers.iter()) {
                let name = http::HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| TransportFailure::new(FailureReason::BadUrl, e.to_string()))?;
                let value = http::HeaderValue::from_str(value)
                    .map_err(|e| TransportFailure::new(FailureReason::BadUrl, e.to_string()))?;
                header_map.insert(name, value);
            }
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| TransportFailure::new(FailureReason::BadUrl, e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFailure> {
        let url = request.url().clone();
        let hyper_request = self.build_hyper_request(request)?;
        let timeout = self.config.timeout;

        let exchange = async {
            let response = self
                .inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)?;

            let status = response.status().as_u16();
            let headers = Self::extract_headers(response.headers());

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| {
                    TransportFailure::new(FailureReason::ConnectionLost, error_chain(&e))
                })?
                .to_bytes();

            Ok(RawResponse::new(status, headers, body, url))
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| timed_out(timeout))?
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportFailure {
        let msg = error_chain(&err);

        if is_tls_error(&err) {
            return TransportFailure::new(FailureReason::Other, msg);
        }

        // The connector reports a URI it cannot dial as a connect error.
        let lowered = msg.to_ascii_lowercase();
        if lowered.contains("invalid uri") || lowered.contains("unsupported scheme") {
            return TransportFailure::new(FailureReason::BadUrl, msg);
        }

        if err.is_connect() {
            if source_chain(&err).any(|cause| {
                cause
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
            }) {
                return TransportFailure::new(FailureReason::TimedOut, msg);
            }
            return TransportFailure::new(FailureReason::NotConnectedToInternet, msg);
        }

        // The connection existed; the exchange broke on it.
        TransportFailure::new(FailureReason::ConnectionLost, msg)
    }
}

fn timed_out(timeout: Duration) -> TransportFailure {
    TransportFailure::new(
        FailureReason::TimedOut,
        format!("no complete response within {}ms", timeout.as_millis()),
    )
}

impl Service<TransportRequest> for RawHyperTransport {
    type Response = RawResponse;
    type Error = BoxError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await.map_err(BoxError::from) })
    }
}

// ============================================================================
// Public Transport
// ============================================================================

/// HTTP transport using hyper-util with connection pooling, TLS, and tower layers.
///
/// # Example
///
/// ```ignore
/// use courier::HyperTransport;
/// use std::time::Duration;
///
/// let transport = HyperTransport::new();
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(10))
///     .default_header("X-Client", "counters-app")
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: SyncService,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new transport with custom configuration and no layers.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let raw = RawHyperTransport::new(config.clone());
        Self::with_service(BoxCloneService::new(raw), config)
    }

    fn with_service(service: BoxedService, config: ClientConfig) -> Self {
        Self {
            service: SyncService::new(service),
            config,
        }
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl courier_core::Transport for HyperTransport {
    /// A panic inside the service stack (a faulty layer) is reported as an
    /// `Unrecognized` failure, so the caller still gets exactly one outcome.
    async fn perform(&self, request: TransportRequest) -> TransportOutcome {
        match AssertUnwindSafe(self.service.call(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => TransportOutcome::Response(response),
            Ok(Err(error)) => TransportOutcome::Failure(classify_boxed(error)),
            Err(payload) => {
                let message = panic_message(&*payload);
                warn!(panic = message, "transport service panicked");
                TransportOutcome::Failure(TransportFailure::new(
                    FailureReason::Unrecognized,
                    format!("service panicked: {message}"),
                ))
            }
        }
    }
}

impl Service<TransportRequest> for HyperTransport {
    type Response = RawResponse;
    type Error = BoxError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use courier::HyperTransport;
/// use courier::tower::timeout::TimeoutLayer;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .layer(TimeoutLayer::new(Duration::from_secs(5)))
///     .build();
/// ```
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: ClientConfigBuilder,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Set the exchange timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Add a header sent with every request unless the request sets it.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.default_header(name, value);
        self
    }

    /// Add a Tower layer around the transport.
    ///
    /// Layers are applied in order: first added = innermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<TransportRequest, Response = RawResponse, Error = BoxError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<TransportRequest>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Build the transport with all configured layers.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let config = self.config.build();
        let mut service: BoxedService =
            BoxCloneService::new(RawHyperTransport::new(config.clone()));

        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        HyperTransport::with_service(service, config)
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn transport_default() {
        let transport = HyperTransport::new();
        check!(transport.config().timeout == Duration::from_secs(30));
    }

    #[test]
    fn transport_builder() {
        let transport = HyperTransport::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .build();

        check!(transport.config().timeout == Duration::from_secs(60));
        check!(transport.config().pool_idle_per_host == 16);
    }

    #[test]
    fn transport_is_debug() {
        let debug = format!("{:?}", HyperTransport::new());
        check!(debug.contains("HyperTransport"));
    }

    #[test]
    fn classify_keeps_transport_failures() {
        let failure = TransportFailure::new(FailureReason::ConnectionLost, "reset by peer");
        check!(classify_boxed(Box::new(failure.clone())) == failure);
    }

    #[test]
    fn classify_tower_timeout() {
        let failure = classify_boxed(Box::new(tower::timeout::error::Elapsed::new()));
        check!(failure.reason() == FailureReason::TimedOut);
    }

    #[test]
    fn tls_errors_are_found_through_io_errors() {
        let wrapped = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls::Error::General("bad record".to_string()),
        );
        check!(is_tls_error(&wrapped));
        check!(is_tls_error(&rustls::Error::DecryptError));

        let lookalike = std::io::Error::other("tls-proxy refused the ssl tunnel");
        check!(!is_tls_error(&lookalike));
    }

    #[test]
    fn non_http_scheme_is_bad_url() {
        let transport = RawHyperTransport::new(ClientConfig::default());
        let url = url::Url::parse("ftp://example.com/counters").expect("url");
        let request = TransportRequest::builder(courier_core::Method::Get, url).build();

        let failure = transport.build_hyper_request(request).err();
        check!(failure.map(|failure| failure.reason()) == Some(FailureReason::BadUrl));
    }

    #[test]
    fn classify_foreign_error() {
        let failure = classify_boxed("rate limiter exploded".into());
        check!(failure.reason() == FailureReason::Unrecognized);
        check!(failure.description() == "rate limiter exploded");
    }
}
