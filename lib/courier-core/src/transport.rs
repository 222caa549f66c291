//! Transport boundary.
//!
//! A [`Transport`] performs one [`TransportRequest`] and reports exactly one
//! [`TransportOutcome`]: either a response or a [`TransportFailure`]. It never
//! interprets status codes; that is the executor's job.

use std::future::Future;

use derive_more::{Display, Error};

use crate::{RawResponse, TransportRequest};

/// Why a transport could not produce a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FailureReason {
    /// The call was cancelled before completing.
    #[display("cancelled")]
    Cancelled,
    /// The connection dropped after it was established.
    #[display("connection lost")]
    ConnectionLost,
    /// The request target was rejected by the transport.
    #[display("bad URL")]
    BadUrl,
    /// The transport's deadline elapsed.
    #[display("timed out")]
    TimedOut,
    /// No connection could be made to the host.
    #[display("not connected to internet")]
    NotConnectedToInternet,
    /// Identified as a transport failure, but of no listed kind.
    #[display("other")]
    Other,
    /// An error value the transport could not identify at all.
    #[display("unrecognized")]
    Unrecognized,
}

/// A failed exchange, with a description suitable for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{reason}: {description}")]
pub struct TransportFailure {
    reason: FailureReason,
    description: String,
}

impl TransportFailure {
    /// Creates a failure.
    #[must_use]
    pub fn new(reason: FailureReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: description.into(),
        }
    }

    /// Failure of a call cancelled by the caller.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(FailureReason::Cancelled, "request cancelled")
    }

    /// Failure category.
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        self.reason
    }

    /// Human-readable description from the transport.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// What a transport produced for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// No response was obtained.
    Failure(TransportFailure),
    /// A response was received, whatever its status.
    Response(RawResponse),
}

impl TransportOutcome {
    /// The response, if one was received.
    #[must_use]
    pub const fn response(&self) -> Option<&RawResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if no response was received.
    #[must_use]
    pub const fn failure(&self) -> Option<&TransportFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Response(_) => None,
        }
    }
}

impl From<RawResponse> for TransportOutcome {
    fn from(response: RawResponse) -> Self {
        Self::Response(response)
    }
}

impl From<TransportFailure> for TransportOutcome {
    fn from(failure: TransportFailure) -> Self {
        Self::Failure(failure)
    }
}

/// Core transport trait.
///
/// Implementations own connection handling, TLS and pooling. `perform` must
/// resolve exactly once; dropping the returned future aborts the call.
pub trait Transport: Send + Sync {
    /// Perform the request.
    fn perform(&self, request: TransportRequest) -> impl Future<Output = TransportOutcome> + Send;
}

impl<X: Transport> Transport for &X {
    fn perform(&self, request: TransportRequest) -> impl Future<Output = TransportOutcome> + Send {
        (**self).perform(request)
    }
}

impl<X: Transport> Transport for std::sync::Arc<X> {
    fn perform(&self, request: TransportRequest) -> impl Future<Output = TransportOutcome> + Send {
        (**self).perform(request)
    }
}
