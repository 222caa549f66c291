//! Caller-facing API client.
//!
//! [`ApiClient`] combines a [`Transport`] with a [`BaseAddress`] and an
//! [`Observer`], and delivers each request's outcome either as an awaited
//! [`Completion`] or through a one-shot callback ([`ApiClient::spawn`]).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, info_span};

use courier_core::{
    ApiError, BaseAddress, Completion, Decoder, Endpoint, Executor, Json, NoopObserver, Observer,
    ResponseMeta, Transport,
};

/// Generic API client.
///
/// Cloning is cheap when the transport is (as [`HyperTransport`](crate::HyperTransport)
/// is), so one transport and its connection pool can serve many APIs.
///
/// # Example
///
/// ```ignore
/// use courier::{ApiClient, Endpoint, HyperTransport};
///
/// let client = ApiClient::new(HyperTransport::new(), "https://api.example.com");
/// let counters: Vec<Counter> = client
///     .request(&Endpoint::get("/counters"))
///     .await
///     .into_result()?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient<X, O = NoopObserver> {
    executor: Executor<X, O>,
    base: BaseAddress,
}

impl<X: Transport> ApiClient<X> {
    /// Create a client for the API at `base`.
    ///
    /// The address is only validated when a request is built.
    #[must_use]
    pub fn new(transport: X, base: impl Into<BaseAddress>) -> Self {
        Self {
            executor: Executor::new(transport),
            base: base.into(),
        }
    }
}

impl<X: Transport, O: Observer> ApiClient<X, O> {
    /// Replace the observer.
    #[must_use]
    pub fn with_observer<O2: Observer>(self, observer: O2) -> ApiClient<X, O2> {
        ApiClient {
            executor: self.executor.with_observer(observer),
            base: self.base,
        }
    }

    /// The API base address.
    #[must_use]
    pub const fn base_address(&self) -> &BaseAddress {
        &self.base
    }

    /// The underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &Executor<X, O> {
        &self.executor
    }

    /// Call `endpoint` and decode a JSON body into `T`.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Completion<T> {
        self.request_with(endpoint, &Json::<T>::new()).await
    }

    /// Call `endpoint` and decode the body with `decoder`.
    pub async fn request_with<T, D>(&self, endpoint: &Endpoint, decoder: &D) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
    {
        self.executor.request(&self.base, endpoint, decoder).await
    }

    /// Like [`ApiClient::request_with`], completing with `Network(Cancelled)`
    /// if `cancelled` resolves before the transport does.
    pub async fn request_until<T, D, C>(
        &self,
        endpoint: &Endpoint,
        decoder: &D,
        cancelled: C,
    ) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
        C: Future<Output = ()>,
    {
        self.executor
            .request_until(&self.base, endpoint, decoder, cancelled)
            .await
    }
}

impl<X, O> ApiClient<X, O>
where
    X: Transport + Clone + 'static,
    O: Observer + Clone + 'static,
{
    /// Run a JSON request in the background and hand its outcome to `callback`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T, F>(&self, endpoint: Endpoint, callback: F) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>, Option<ResponseMeta>) + Send + 'static,
    {
        self.spawn_with(endpoint, Json::<T>::new(), callback)
    }

    /// Run a request in the background, decoding with `decoder`.
    ///
    /// `callback` runs exactly once, on the runtime's worker, with the result
    /// and the response metadata when a response was received. Cancelling
    /// through the returned handle makes a pending call complete with
    /// `Network(Cancelled)`; dropping the handle lets the call run to its end.
    pub fn spawn_with<T, D, F>(&self, endpoint: Endpoint, decoder: D, callback: F) -> RequestHandle
    where
        T: Send + 'static,
        D: Decoder<T> + 'static,
        F: FnOnce(Result<T, ApiError>, Option<ResponseMeta>) + Send + 'static,
    {
        let client = self.clone();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let span = info_span!("courier_request", method = %endpoint.method(), path = endpoint.path());

        let cancelled = async move {
            if cancel_rx.await.is_err() {
                // Handle dropped without cancelling.
                std::future::pending::<()>().await;
            }
        };

        let task = tokio::spawn(
            async move {
                let completion = client
                    .request_until(&endpoint, &decoder, cancelled)
                    .await;
                let (result, response) = completion.into_parts();
                debug!(success = result.is_ok(), "delivering completion");
                callback(result, response);
            }
            .instrument(span),
        );

        RequestHandle {
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Handle on a request started with [`ApiClient::spawn`].
///
/// Awaiting the handle waits until the callback has run.
#[derive(Debug)]
pub struct RequestHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RequestHandle {
    /// Cancel the request.
    ///
    /// Has no effect once the request has completed or was already cancelled;
    /// the callback still runs exactly once.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already be done; nothing to signal then.
            let _ = cancel.send(());
        }
    }

    /// Whether the callback has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for RequestHandle {
    type Output = Result<(), JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx)
    }
}
