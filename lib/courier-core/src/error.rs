//! Error taxonomy for courier.
//!
//! Every failure reaching a caller is an [`ApiError`]:
//!
//! - [`ApiError::Network`] - the transport could not complete the exchange
//!   (including cancellation and requests that could not be built)
//! - [`ApiError::Service`] - the server answered with a non-2xx status or an empty body
//! - [`ApiError::Parse`] - the body could not be decoded into the requested type
//! - [`ApiError::Unknown`] - an error value this crate does not recognize
//!
//! The mappings into these kinds are total; anything unmapped lands in an
//! `Unknown` variant carrying the original description.

use derive_more::{Display, Error, From};

use crate::{DecodeError, DecodeErrorKind, FailureReason, TransportFailure};

// ============================================================================
// Error Kinds
// ============================================================================

/// HTTP-level failures, identified by status code or a missing body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum ServiceKind {
    /// 400.
    #[display("bad request")]
    BadRequest,
    /// 401.
    #[display("unauthorized")]
    Unauthorized,
    /// 403.
    #[display("forbidden")]
    Forbidden,
    /// 404.
    #[display("not found")]
    NotFound,
    /// 408.
    #[display("request timeout")]
    RequestTimeout,
    /// 405-407 and 409-499.
    #[display("client error")]
    ClientError,
    /// 500-599.
    #[display("internal server error")]
    InternalServerError,
    /// Successful status with an empty body.
    #[display("no data")]
    NoData,
    /// Any other status.
    #[display("unexpected status {_0}")]
    Unknown(String),
}

impl ServiceKind {
    /// Classifies a status code.
    ///
    /// 408 is deliberately kept out of the generic client-error range, and codes
    /// of the 4xx block not listed (such as 402) fall through to `Unknown`.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            405..=407 | 409..=499 => Self::ClientError,
            500..=599 => Self::InternalServerError,
            other => Self::Unknown(describe_status(other)),
        }
    }
}

fn describe_status(status: u16) -> String {
    http::StatusCode::from_u16(status)
        .map_or_else(|_| status.to_string(), |code| code.to_string())
}

/// Transport and connectivity failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum NetworkKind {
    /// The call was cancelled before it completed.
    #[display("cancelled")]
    Cancelled,
    /// An established connection dropped mid-exchange.
    #[display("network connection lost")]
    NetworkConnectionLost,
    /// The request could not be formed into a valid URL.
    #[display("bad URL")]
    BadUrl,
    /// The transport gave up waiting.
    #[display("timed out")]
    TimedOut,
    /// No connection to the host could be made.
    #[display("not connected to internet")]
    NotConnectedToInternet,
    /// Any other transport failure.
    #[display("{_0}")]
    Unknown(String),
}

impl From<&TransportFailure> for NetworkKind {
    fn from(failure: &TransportFailure) -> Self {
        match failure.reason() {
            FailureReason::Cancelled => Self::Cancelled,
            FailureReason::ConnectionLost => Self::NetworkConnectionLost,
            FailureReason::BadUrl => Self::BadUrl,
            FailureReason::TimedOut => Self::TimedOut,
            FailureReason::NotConnectedToInternet => Self::NotConnectedToInternet,
            FailureReason::Other | FailureReason::Unrecognized => {
                Self::Unknown(failure.description().to_string())
            }
        }
    }
}

/// Body decoding failures, each with a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum ParseKind {
    /// A value had the wrong type.
    #[display("type mismatch: {_0}")]
    TypeMismatch(String),
    /// A value was null where one was required.
    #[display("value not found: {_0}")]
    ValueNotFound(String),
    /// A required key was absent.
    #[display("key not found: {_0}")]
    KeyNotFound(String),
    /// The body is not well-formed.
    #[display("data corrupted: {_0}")]
    DataCorrupted(String),
    /// Any other decoding failure.
    #[display("{_0}")]
    Unknown(String),
}

impl ParseKind {
    /// The description carried by this kind.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::TypeMismatch(description)
            | Self::ValueNotFound(description)
            | Self::KeyNotFound(description)
            | Self::DataCorrupted(description)
            | Self::Unknown(description) => description,
        }
    }
}

impl From<&DecodeError> for ParseKind {
    fn from(error: &DecodeError) -> Self {
        let description = error.description();
        match error.kind() {
            DecodeErrorKind::TypeMismatch => Self::TypeMismatch(description),
            DecodeErrorKind::ValueNotFound => Self::ValueNotFound(description),
            DecodeErrorKind::KeyNotFound => Self::KeyNotFound(description),
            DecodeErrorKind::DataCorrupted => Self::DataCorrupted(description),
            DecodeErrorKind::Other => Self::Unknown(description),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Terminal error delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Error)]
pub enum ApiError {
    /// HTTP-level failure.
    #[display("service error: {_0}")]
    Service(#[error(not(source))] ServiceKind),

    /// Transport-level failure.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] NetworkKind),

    /// Decoding failure.
    #[display("parse error: {_0}")]
    Parse(#[error(not(source))] ParseKind),

    /// Unclassifiable failure.
    #[display("unknown error")]
    Unknown,
}

/// Result type alias using [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Service error for a non-success status code.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self::Service(ServiceKind::from_status(status))
    }

    /// Classifies an arbitrary error value.
    ///
    /// Errors produced by this crate keep their classification; anything else
    /// becomes [`ApiError::Unknown`].
    #[must_use]
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(api_error) = error.downcast_ref::<Self>() {
            return api_error.clone();
        }
        if let Some(failure) = error.downcast_ref::<TransportFailure>() {
            return Self::from(failure);
        }
        if let Some(decode_error) = error.downcast_ref::<DecodeError>() {
            return Self::from(decode_error);
        }
        if let Some(build_error) = error.downcast_ref::<BuildError>() {
            return Self::from(build_error);
        }

        tracing::warn!(error = %error, "unrecognized error");
        Self::Unknown
    }

    /// Returns `true` for [`NetworkKind::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Network(NetworkKind::Cancelled))
    }

    /// Returns `true` for [`ServiceKind::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Service(ServiceKind::NotFound))
    }

    /// Returns `true` for any network error.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<&TransportFailure> for ApiError {
    fn from(failure: &TransportFailure) -> Self {
        if failure.reason() == FailureReason::Unrecognized {
            tracing::warn!(description = failure.description(), "unrecognized transport failure");
            return Self::Unknown;
        }
        Self::Network(NetworkKind::from(failure))
    }
}

impl From<&DecodeError> for ApiError {
    fn from(error: &DecodeError) -> Self {
        Self::Parse(ParseKind::from(error))
    }
}

impl From<&BuildError> for ApiError {
    fn from(error: &BuildError) -> Self {
        tracing::warn!(error = %error, "request could not be built");
        Self::Network(NetworkKind::BadUrl)
    }
}

// ============================================================================
// Build Error
// ============================================================================

/// Reasons an endpoint could not be turned into a transport request.
#[derive(Debug, Display, Error, From)]
pub enum BuildError {
    /// Base address and path do not form a parseable URL.
    #[display("invalid URL `{url}`: {source}")]
    #[from(skip)]
    InvalidUrl {
        /// The text that failed to parse.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The URL parsed but has no host.
    #[display("URL `{_0}` is not absolute")]
    #[from(skip)]
    NotAbsolute(#[error(not(source))] String),

    /// Parameters could not be encoded as a query string.
    #[display("query encoding error: {_0}")]
    #[from]
    QueryEncoding(serde_html_form::ser::Error),

    /// Parameters could not be encoded as a JSON body.
    #[display("body encoding error: {_0}")]
    #[from]
    BodyEncoding(serde_json::Error),

    /// The URL scheme is neither `http` nor `https`.
    #[display("unsupported URL scheme `{_0}`")]
    #[from(skip)]
    UnsupportedScheme(#[error(not(source))] String),

    /// A header name or value is not valid HTTP.
    #[display("invalid header `{_0}`")]
    #[from(skip)]
    InvalidHeader(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn status_named_codes() {
        check!(ServiceKind::from_status(400) == ServiceKind::BadRequest);
        check!(ServiceKind::from_status(401) == ServiceKind::Unauthorized);
        check!(ServiceKind::from_status(403) == ServiceKind::Forbidden);
        check!(ServiceKind::from_status(404) == ServiceKind::NotFound);
        check!(ServiceKind::from_status(408) == ServiceKind::RequestTimeout);
    }

    #[test]
    fn status_client_error_range_excludes_408() {
        for status in [405, 406, 407, 409, 410, 422, 429, 451, 499] {
            check!(ServiceKind::from_status(status) == ServiceKind::ClientError, "status {status}");
        }
        check!(ServiceKind::from_status(408) != ServiceKind::ClientError);
    }

    #[test]
    fn status_server_error_range() {
        for status in [500, 502, 503, 504, 599] {
            check!(ServiceKind::from_status(status) == ServiceKind::InternalServerError);
        }
    }

    #[test]
    fn status_unlisted_codes_are_unknown() {
        let_assert!(ServiceKind::Unknown(description) = ServiceKind::from_status(402));
        check!(description == "402 Payment Required");

        let_assert!(ServiceKind::Unknown(description) = ServiceKind::from_status(302));
        check!(description == "302 Found");

        let_assert!(ServiceKind::Unknown(description) = ServiceKind::from_status(42));
        check!(description == "42");
    }

    #[test]
    fn status_mapping_is_total() {
        for status in 100..=599 {
            let kind = ServiceKind::from_status(status);
            if let ServiceKind::Unknown(description) = kind {
                check!(!description.is_empty(), "status {status}");
            }
        }
    }

    #[test]
    fn network_kind_from_failure() {
        let cases = [
            (FailureReason::Cancelled, NetworkKind::Cancelled),
            (FailureReason::ConnectionLost, NetworkKind::NetworkConnectionLost),
            (FailureReason::BadUrl, NetworkKind::BadUrl),
            (FailureReason::TimedOut, NetworkKind::TimedOut),
            (
                FailureReason::NotConnectedToInternet,
                NetworkKind::NotConnectedToInternet,
            ),
        ];
        for (reason, expected) in cases {
            let failure = TransportFailure::new(reason, "details");
            check!(NetworkKind::from(&failure) == expected);
        }

        let failure = TransportFailure::new(FailureReason::Other, "tls handshake failed");
        check!(NetworkKind::from(&failure) == NetworkKind::Unknown("tls handshake failed".to_string()));
    }

    #[test]
    fn unrecognized_failure_is_unknown_error() {
        let failure = TransportFailure::new(FailureReason::Unrecognized, "boxed error");
        check!(ApiError::from(&failure) == ApiError::Unknown);
    }

    #[test]
    fn build_error_is_bad_url() {
        let error = BuildError::NotAbsolute("mailto:x".to_string());
        check!(ApiError::from(&error) == ApiError::Network(NetworkKind::BadUrl));
        let error = BuildError::UnsupportedScheme("ftp".to_string());
        check!(ApiError::from(&error) == ApiError::Network(NetworkKind::BadUrl));
    }

    #[test]
    fn from_error_downcasts_known_types() {
        let failure = TransportFailure::new(FailureReason::TimedOut, "deadline");
        check!(ApiError::from_error(&failure) == ApiError::Network(NetworkKind::TimedOut));

        let api_error = ApiError::from_status(404);
        check!(ApiError::from_error(&api_error) == api_error);
    }

    #[test]
    fn from_error_foreign_type_is_unknown() {
        let error = std::io::Error::other("disk on fire");
        check!(ApiError::from_error(&error) == ApiError::Unknown);
    }

    #[test]
    fn error_display() {
        check!(ApiError::from_status(404).to_string() == "service error: not found");
        check!(ApiError::Network(NetworkKind::NotConnectedToInternet).to_string() == "network error: not connected to internet");
        check!(ApiError::Parse(ParseKind::KeyNotFound("missing field `id`".to_string())).to_string() == "parse error: key not found: missing field `id`");
        check!(ApiError::Unknown.to_string() == "unknown error");
    }

    #[test]
    fn error_predicates() {
        check!(ApiError::Network(NetworkKind::Cancelled).is_cancelled());
        check!(ApiError::Network(NetworkKind::Cancelled).is_network());
        check!(ApiError::from_status(404).is_not_found());
        check!(!ApiError::Unknown.is_network());
    }
}
