//! Diagnostic observation of request/outcome pairs.

use crate::{TransportOutcome, TransportRequest};

/// Receives every request together with the raw outcome the transport produced.
///
/// Observers only see shared references and return nothing, so they cannot
/// influence the result delivered to the caller.
pub trait Observer: Send + Sync {
    /// Called once per performed request, before the outcome is interpreted.
    fn observe(&self, request: &TransportRequest, outcome: &TransportOutcome);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _request: &TransportRequest, _outcome: &TransportOutcome) {}
}

impl<F> Observer for F
where
    F: Fn(&TransportRequest, &TransportOutcome) + Send + Sync,
{
    fn observe(&self, request: &TransportRequest, outcome: &TransportOutcome) {
        self(request, outcome);
    }
}
