//! Request execution and outcome interpretation.
//!
//! [`Executor`] drives one request through the pipeline:
//!
//! 1. build the [`TransportRequest`] (a failure stops here, the transport is never called)
//! 2. perform it, racing an optional cancellation signal
//! 3. show the request/outcome pair to the [`Observer`]
//! 4. [`interpret`] the outcome into a typed [`Completion`]
//!
//! Each call produces exactly one [`Completion`].

use std::future::Future;
use std::pin::pin;

use futures_util::future::{Either, select};
use tracing::debug;

use crate::{
    ApiError, BaseAddress, Decoder, Endpoint, NoopObserver, Observer, ResponseMeta, ServiceKind,
    Transport, TransportFailure, TransportOutcome, TransportRequest, build,
};

/// The single result of a request: a value or an error, plus response metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<T> {
    /// Decoded value or classified error.
    pub result: Result<T, ApiError>,
    /// Status, headers and URL of the response, when one was received.
    pub response: Option<ResponseMeta>,
}

impl<T> Completion<T> {
    /// Successful completion.
    #[must_use]
    pub const fn success(value: T, response: Option<ResponseMeta>) -> Self {
        Self {
            result: Ok(value),
            response,
        }
    }

    /// Failed completion.
    #[must_use]
    pub const fn failure(error: ApiError, response: Option<ResponseMeta>) -> Self {
        Self {
            result: Err(error),
            response,
        }
    }

    /// Consume into the result, dropping the metadata.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] when the request failed.
    pub fn into_result(self) -> Result<T, ApiError> {
        self.result
    }

    /// Consume into (result, metadata).
    #[must_use]
    pub fn into_parts(self) -> (Result<T, ApiError>, Option<ResponseMeta>) {
        (self.result, self.response)
    }

    /// Returns `true` if a value was decoded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Interprets a transport outcome.
///
/// - transport failure: `Network`, or `Unknown` for unrecognized errors
/// - status outside 200-299: `Service` by status code
/// - success with an empty body: `Service(NoData)`
/// - otherwise the body is decoded; failures become `Parse`
pub fn interpret<T, D>(outcome: TransportOutcome, decoder: &D) -> Completion<T>
where
    D: Decoder<T> + ?Sized,
{
    let response = match outcome {
        TransportOutcome::Failure(failure) => {
            return Completion::failure(ApiError::from(&failure), None);
        }
        TransportOutcome::Response(response) => response,
    };

    let meta = Some(response.meta());

    if !response.is_success() {
        return Completion::failure(ApiError::from_status(response.status()), meta);
    }

    if response.body().is_empty() {
        return Completion::failure(ApiError::Service(ServiceKind::NoData), meta);
    }

    match decoder.decode(response.body()) {
        Ok(value) => Completion::success(value, meta),
        Err(error) => Completion::failure(ApiError::from(&error), meta),
    }
}

/// Runs requests over a [`Transport`], reporting to an [`Observer`].
#[derive(Debug, Clone)]
pub struct Executor<X, O = NoopObserver> {
    transport: X,
    observer: O,
}

impl<X: Transport> Executor<X> {
    /// Creates an executor without an observer.
    #[must_use]
    pub const fn new(transport: X) -> Self {
        Self {
            transport,
            observer: NoopObserver,
        }
    }
}

impl<X: Transport, O: Observer> Executor<X, O> {
    /// Replaces the observer.
    #[must_use]
    pub fn with_observer<O2: Observer>(self, observer: O2) -> Executor<X, O2> {
        Executor {
            transport: self.transport,
            observer,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &X {
        &self.transport
    }

    /// The observer.
    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Builds and executes `endpoint` against `base`.
    ///
    /// A build failure completes with `Network(BadUrl)` without calling the transport.
    pub async fn request<T, D>(&self, base: &BaseAddress, endpoint: &Endpoint, decoder: &D) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
    {
        self.request_until(base, endpoint, decoder, std::future::pending())
            .await
    }

    /// Like [`Executor::request`], completing with `Network(Cancelled)` if
    /// `cancelled` resolves first.
    pub async fn request_until<T, D, C>(
        &self,
        base: &BaseAddress,
        endpoint: &Endpoint,
        decoder: &D,
        cancelled: C,
    ) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
        C: Future<Output = ()>,
    {
        match build(base, endpoint) {
            Ok(request) => self.execute_until(request, decoder, cancelled).await,
            Err(error) => Completion::failure(ApiError::from(&error), None),
        }
    }

    /// Executes an already-built request.
    pub async fn execute<T, D>(&self, request: TransportRequest, decoder: &D) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
    {
        self.execute_until(request, decoder, std::future::pending())
            .await
    }

    /// Executes an already-built request, racing it against `cancelled`.
    ///
    /// When `cancelled` wins, the in-flight transport future is dropped and
    /// the outcome is a [`Cancelled`](crate::FailureReason::Cancelled) failure,
    /// observed and interpreted like any other.
    pub async fn execute_until<T, D, C>(
        &self,
        request: TransportRequest,
        decoder: &D,
        cancelled: C,
    ) -> Completion<T>
    where
        D: Decoder<T> + ?Sized,
        C: Future<Output = ()>,
    {
        let method = request.method();
        let url = request.url().clone();

        let outcome = {
            let perform = pin!(self.transport.perform(request.clone()));
            let cancelled = pin!(cancelled);
            match select(perform, cancelled).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right(((), _)) => {
                    debug!(%method, %url, "request cancelled");
                    TransportOutcome::Failure(TransportFailure::cancelled())
                }
            }
        };

        self.observer.observe(&request, &outcome);

        let completion = interpret(outcome, decoder);
        match &completion.result {
            Ok(_) => debug!(%method, %url, "request succeeded"),
            Err(error) => debug!(%method, %url, %error, "request failed"),
        }
        completion
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use serde::Deserialize;
    use url::Url;

    use super::*;
    use crate::{FailureReason, Json, Method, NetworkKind, ParseKind, RawResponse};

    #[derive(Debug, PartialEq, Deserialize)]
    struct Counter {
        id: String,
        count: u32,
    }

    fn url() -> Url {
        Url::parse("https://api.example.com/counters").expect("valid URL")
    }

    fn response(status: u16, body: &'static str) -> TransportOutcome {
        TransportOutcome::Response(RawResponse::new(
            status,
            HashMap::new(),
            Bytes::from(body),
            url(),
        ))
    }

    /// Transport returning a fixed outcome and counting calls.
    struct Scripted {
        outcome: TransportOutcome,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcome: TransportOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for Scripted {
        async fn perform(&self, _request: TransportRequest) -> TransportOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    /// Transport that never answers.
    struct Hanging;

    impl Transport for Hanging {
        async fn perform(&self, _request: TransportRequest) -> TransportOutcome {
            std::future::pending().await
        }
    }

    #[test]
    fn interpret_success() {
        let completion = interpret(response(200, r#"{"id":"a1","count":2}"#), &Json::<Counter>::new());

        let expected = Counter {
            id: "a1".to_string(),
            count: 2,
        };
        check!(completion.result == Ok(expected));
        check!(completion.response.map(|meta| meta.status()) == Some(200));
    }

    #[test]
    fn interpret_success_range_with_body() {
        for status in [200, 201, 202, 226, 299] {
            let completion = interpret(response(status, r#"{"id":"a1","count":2}"#), &Json::<Counter>::new());
            check!(completion.is_success(), "status {status}");
        }
    }

    #[test]
    fn interpret_empty_body_is_no_data() {
        for status in [200, 201, 204, 299] {
            let completion = interpret(response(status, ""), &Json::<Counter>::new());
            check!(completion.result == Err(ApiError::Service(ServiceKind::NoData)), "status {status}");
            check!(completion.response.is_some());
        }
    }

    #[test]
    fn interpret_status_codes() {
        let cases = [
            (404, ServiceKind::NotFound),
            (500, ServiceKind::InternalServerError),
            (408, ServiceKind::RequestTimeout),
            (409, ServiceKind::ClientError),
            (401, ServiceKind::Unauthorized),
        ];
        for (status, kind) in cases {
            let completion = interpret(response(status, r#"{"error":"x"}"#), &Json::<Counter>::new());
            check!(completion.result == Err(ApiError::Service(kind)));
            check!(completion.response.map(|meta| meta.status()) == Some(status));
        }
    }

    #[test]
    fn interpret_error_status_wins_over_empty_body() {
        let completion = interpret(response(404, ""), &Json::<Counter>::new());
        check!(completion.result == Err(ApiError::Service(ServiceKind::NotFound)));
    }

    #[test]
    fn interpret_redirect_status_is_unknown_service_error() {
        let completion = interpret(response(304, ""), &Json::<Counter>::new());
        let_assert!(Err(ApiError::Service(ServiceKind::Unknown(description))) = completion.result);
        check!(description == "304 Not Modified");
    }

    #[test]
    fn interpret_transport_failure() {
        let outcome = TransportOutcome::Failure(TransportFailure::new(
            FailureReason::NotConnectedToInternet,
            "connection refused",
        ));
        let completion = interpret(outcome, &Json::<Counter>::new());

        check!(completion.result == Err(ApiError::Network(NetworkKind::NotConnectedToInternet)));
        check!(completion.response.is_none());
    }

    #[test]
    fn interpret_missing_field() {
        let completion = interpret(response(200, r#"{"id":"a1"}"#), &Json::<Counter>::new());

        let_assert!(Err(ApiError::Parse(ParseKind::KeyNotFound(description))) = completion.result);
        check!(!description.is_empty());
        check!(description.contains("count"));
    }

    #[test]
    fn interpret_custom_decoder_error() {
        let decoder = |_: &[u8]| -> Result<u32, crate::DecodeError> {
            Err(crate::DecodeError::new(crate::DecodeErrorKind::Other, "", "unsupported encoding"))
        };
        let completion = interpret(response(200, "x"), &decoder);

        check!(completion.result == Err(ApiError::Parse(ParseKind::Unknown("unsupported encoding".to_string()))));
    }

    #[tokio::test]
    async fn request_build_failure_skips_transport() {
        let transport = Scripted::new(response(200, "{}"));
        let executor = Executor::new(&transport);

        let completion: Completion<Counter> = executor
            .request(&BaseAddress::new("not a url"), &Endpoint::get("/counters"), &Json::new())
            .await;

        check!(completion.result == Err(ApiError::Network(NetworkKind::BadUrl)));
        check!(completion.response.is_none());
        check!(transport.calls.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn request_performs_transport_once() {
        let transport = Scripted::new(response(200, r#"{"id":"a1","count":1}"#));
        let executor = Executor::new(&transport);

        let completion: Completion<Counter> = executor
            .request(
                &BaseAddress::new("https://api.example.com"),
                &Endpoint::get("/counters"),
                &Json::new(),
            )
            .await;

        check!(completion.is_success());
        check!(transport.calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn observer_sees_request_and_outcome() {
        let transport = Scripted::new(response(503, ""));
        let seen = Mutex::new(Vec::new());
        let executor = Executor::new(&transport).with_observer(
            |request: &TransportRequest, outcome: &TransportOutcome| {
                seen.lock()
                    .expect("lock")
                    .push((request.method(), outcome.response().map(RawResponse::status)));
            },
        );

        let request = TransportRequest::builder(Method::Delete, url()).build();
        let completion = executor.execute(request, &Json::<Counter>::new()).await;

        check!(completion.result == Err(ApiError::Service(ServiceKind::InternalServerError)));
        check!(seen.lock().expect("lock").as_slice() == &[(Method::Delete, Some(503))]);
    }

    #[tokio::test]
    async fn cancellation_completes_with_cancelled() {
        let observed = AtomicUsize::new(0);
        let executor = Executor::new(Hanging).with_observer(
            |_: &TransportRequest, outcome: &TransportOutcome| {
                check!(outcome.failure().map(TransportFailure::reason) == Some(FailureReason::Cancelled));
                observed.fetch_add(1, Ordering::SeqCst);
            },
        );

        let request = TransportRequest::builder(Method::Get, url()).build();
        let completion = executor
            .execute_until(request, &Json::<Counter>::new(), std::future::ready(()))
            .await;

        check!(completion.result.as_ref().is_err_and(ApiError::is_cancelled));
        check!(completion.response.is_none());
        check!(observed.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn completed_transport_wins_over_pending_cancellation() {
        let transport = Scripted::new(response(200, r#"{"id":"a1","count":1}"#));
        let executor = Executor::new(&transport);

        let request = TransportRequest::builder(Method::Get, url()).build();
        let completion = executor
            .execute_until(request, &Json::<Counter>::new(), std::future::pending())
            .await;

        check!(completion.is_success());
    }
}
