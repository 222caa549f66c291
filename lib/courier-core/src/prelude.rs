//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    ApiError, BaseAddress, Completion, Decoder, Endpoint, Executor, Json, Method, NetworkKind,
    Observer, ParseKind, ServiceKind, Transport, TransportOutcome, TransportRequest,
};
