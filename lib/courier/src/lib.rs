//! Typed HTTP API calls with a structured error taxonomy.
//!
//! Describe a call with an [`Endpoint`], run it through an [`ApiClient`], and
//! get back a typed value or an [`ApiError`] saying whether the network, the
//! server or the payload was at fault.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct Counter {
//!     id: u64,
//!     value: i64,
//! }
//!
//! let client = ApiClient::new(HyperTransport::new(), "https://api.example.com");
//!
//! match client.request::<Counter>(&Endpoint::get("/counters/1")).await.result {
//!     Ok(counter) => println!("{counter:?}"),
//!     Err(error) if error.is_not_found() => println!("no such counter"),
//!     Err(error) => println!("failed: {error}"),
//! }
//! ```

mod api_client;
mod config;
mod connector;
#[cfg(feature = "debug-observer")]
mod observer;
pub mod prelude;
mod transport;

// Re-export client types
pub use api_client::{ApiClient, RequestHandle};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::https_connector;
#[cfg(feature = "debug-observer")]
pub use observer::{LogLevel, TracingObserver};
pub use transport::{
    BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture, classify_boxed,
};

// Re-export tower for layer composition
pub use tower;

// Re-export core types
pub use courier_core::{
    ApiError, BaseAddress, BuildError, Completion, DecodeError, DecodeErrorKind, Decoder,
    Endpoint, Executor, FailureReason, Json, Method, NetworkKind, NoopObserver, Observer,
    ParseKind, RawResponse, ResponseMeta, Result, ServiceKind, Transport, TransportFailure,
    TransportOutcome, TransportRequest, TransportRequestBuilder, build, from_json, interpret,
};

// Re-export crates that appear in public signatures
pub use bytes;
pub use url;
