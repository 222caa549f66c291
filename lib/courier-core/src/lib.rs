//! Core types and pipeline for the courier HTTP client.
//!
//! This crate turns endpoint descriptions into typed results:
//! - [`Endpoint`] and [`BaseAddress`] - what to call and where
//! - [`build`] and [`TransportRequest`] - request construction
//! - [`Transport`], [`TransportOutcome`] and [`TransportFailure`] - the network boundary
//! - [`Decoder`], [`Json`] and [`DecodeError`] - typed body decoding
//! - [`ApiError`] and its kinds - the error taxonomy
//! - [`Executor`], [`interpret`] and [`Completion`] - the request pipeline
//! - [`Observer`] - diagnostics hook that never affects results
//!
//! It performs no I/O itself; the `courier` crate provides a hyper-based transport.

mod decode;
mod endpoint;
mod error;
mod executor;
mod method;
mod observer;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use decode::{DecodeError, DecodeErrorKind, Decoder, Json, from_json};
pub use endpoint::Endpoint;
pub use error::{ApiError, BuildError, NetworkKind, ParseKind, Result, ServiceKind};
pub use executor::{Completion, Executor, interpret};
pub use method::Method;
pub use observer::{NoopObserver, Observer};
pub use request::{BaseAddress, TransportRequest, TransportRequestBuilder, build};
pub use response::{RawResponse, ResponseMeta};
pub use transport::{FailureReason, Transport, TransportFailure, TransportOutcome};
