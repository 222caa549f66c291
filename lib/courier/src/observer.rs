//! Request/outcome diagnostics through `tracing`.
//!
//! Only compiled with the `debug-observer` feature.

use bytes::Bytes;
use tracing::{debug, info, warn};

use courier_core::{Observer, TransportOutcome, TransportRequest};

/// Log level for the [`TracingObserver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers and bodies too).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Observer that logs every request and its raw outcome.
///
/// # Example
///
/// ```ignore
/// use courier::{ApiClient, HyperTransport, TracingObserver};
///
/// let client = ApiClient::new(HyperTransport::new(), "https://api.example.com")
///     .with_observer(TracingObserver::debug());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    level: LogLevel,
}

impl TracingObserver {
    /// Create an observer that logs summaries at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer that also logs headers and bodies at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Observer for TracingObserver {
    fn observe(&self, request: &TransportRequest, outcome: &TransportOutcome) {
        let method = request.method();
        let url = request.url().as_str();

        if self.level == LogLevel::Debug {
            debug!(
                %method,
                url,
                headers = ?request.headers(),
                body = request.body().map(render_body).as_deref(),
                "request"
            );
        }

        match outcome {
            TransportOutcome::Response(response) => {
                let status = response.status();
                if response.is_success() {
                    info!(%method, url, status, "response received");
                } else {
                    warn!(%method, url, status, "response with HTTP error status");
                }
                if self.level == LogLevel::Debug {
                    debug!(
                        status,
                        headers = ?response.headers(),
                        body = render_body(response.body()),
                        "response"
                    );
                }
            }
            TransportOutcome::Failure(failure) => {
                warn!(%method, url, error = %failure, "no response");
            }
        }
    }
}

/// Pretty-prints JSON bodies; anything else is shown as lossy UTF-8.
fn render_body(body: &Bytes) -> String {
    if body.is_empty() {
        return String::from("<empty>");
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
