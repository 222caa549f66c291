//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    ApiClient, ApiError, ClientConfig, Completion, Endpoint, HyperTransport, Json, Method,
    NetworkKind, ParseKind, RequestHandle, ResponseMeta, ServiceKind,
};
#[cfg(feature = "debug-observer")]
pub use crate::TracingObserver;
pub use serde::{Deserialize, Serialize};
