//! Error types for the HTTP adapter.
//!
//! # Design
//! Two failure kinds reach callers. `SubmitError` means the host refused to
//! dispatch the request at all; it carries only the host's descriptor.
//! `ApiResponseError` means a request completed (or the transport gave up)
//! without a 2xx answer; it carries the HTTP status and whatever the server
//! put in its JSON error body. Status `-1` stands for "no HTTP status was
//! obtainable".
//!
//! Retry decisions belong to the caller. `is_transient` is the classifier an
//! external retry layer consults.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Status used when the transport could not produce an HTTP status.
pub const NO_STATUS: i64 = -1;

/// Application code used when the error body carries none.
pub const NO_CODE: i32 = -1;

/// The host refused to dispatch a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The request object is not attached to a live host tree.
    #[error("failed to send request: transport not configured")]
    Unconfigured,

    /// The request object is already processing another request.
    #[error("failed to send request: transport busy")]
    Busy,

    /// The host rejected a parameter, typically a malformed URI.
    #[error("failed to send request: invalid parameter: {0}")]
    InvalidParameter(String),

    /// Connecting failed synchronously (non-threaded hosts).
    #[error("failed to send request: can't connect: {0}")]
    CantConnect(String),

    #[error("failed to send request: {0}")]
    Other(String),
}

/// A request finished without a 2xx answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponseError {
    /// HTTP status, or `NO_STATUS` when the transport failed.
    pub status_code: i64,
    pub message: String,
    /// Application-level code from the error body (`code`).
    pub grpc_status_code: i32,
    /// Entries copied from the body's nested `error` object.
    pub details: BTreeMap<String, Value>,
}

impl ApiResponseError {
    pub fn new(status_code: i64, message: impl Into<String>, grpc_status_code: i32) -> Self {
        Self {
            status_code,
            message: message.into(),
            grpc_status_code,
            details: BTreeMap::new(),
        }
    }

    /// Copy a nested `error` payload onto this error.
    ///
    /// Object entries are copied key by key; any other non-null value is
    /// kept whole under the key `"error"`.
    pub fn copy_details(&mut self, payload: &Value) {
        match payload {
            Value::Object(map) => {
                for (k, v) in map {
                    self.details.insert(k.clone(), v.clone());
                }
            }
            Value::Null => {}
            other => {
                self.details.insert("error".to_string(), other.clone());
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.status_code >= 500 || self.status_code == NO_STATUS
    }
}

impl fmt::Display for ApiResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiResponseError(StatusCode={}, Message='{}', GrpcStatusCode={})",
            self.status_code, self.message, self.grpc_status_code
        )
    }
}

impl std::error::Error for ApiResponseError {}

/// Everything `HttpAdapter::send` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Api(#[from] ApiResponseError),

    /// The caller's cancellation token fired while the request was pending.
    #[error("request was cancelled")]
    Cancelled,

    /// Only produced under `MethodPolicy::Reject`.
    #[error("unsupported HTTP method: '{0}'")]
    UnsupportedMethod(String),
}

impl AdapterError {
    /// The structured API error, if this is one.
    pub fn api(&self) -> Option<&ApiResponseError> {
        match self {
            AdapterError::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Signature of the transient classifier handed to retry layers.
pub type TransientClassifier = fn(&AdapterError) -> bool;

/// An error is transient when it is a structured API error with status
/// `>= 500`, or `-1` (no status obtainable). Everything else is permanent.
pub fn is_transient(err: &AdapterError) -> bool {
    err.api().is_some_and(ApiResponseError::is_transient)
}

/// Same classification for errors that arrive type-erased.
pub fn is_transient_error(err: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(api) = err.downcast_ref::<ApiResponseError>() {
        return api.is_transient();
    }
    err.downcast_ref::<AdapterError>().is_some_and(is_transient)
}
