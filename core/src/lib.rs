//! Async HTTP adapter over a host engine's request object.
//!
//! # Overview
//! A host engine (a game engine's HTTP node, a platform HTTP API) performs
//! the actual request. This crate describes the request, waits for the
//! host's single completion signal, and maps the outcome to the response
//! body or a structured `ApiResponseError`.
//!
//! # Design
//! - `HttpAdapter::send` is the async path for hosts wrapped in
//!   `HostTransport` / `TransportHandle`.
//! - `HttpAdapter::prepare` and `interpret` are the same logic split at the
//!   I/O boundary, for hosts that run the request themselves (see the
//!   `engine-http-ffi` crate).
//! - The adapter never retries. `is_transient` tells a retry layer which
//!   failures are worth another attempt.
//! - Logging goes through `tracing`; without a subscriber it is a no-op.

pub mod adapter;
pub mod cancel;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use adapter::{interpret, parse_error_body, HttpAdapter};
pub use cancel::CancellationToken;
pub use config::{AdapterConfig, MethodPolicy};
pub use error::{
    is_transient, is_transient_error, AdapterError, ApiResponseError, SubmitError,
    TransientClassifier, NO_CODE, NO_STATUS,
};
pub use http::{header_lines, select_verb, AdapterRequest, HttpMethod, TransportVerb, ACCEPT_JSON};
pub use transport::{
    Completion, CompletionSender, HostTransport, TransportHandle, TransportRequest, TransportResult,
};
