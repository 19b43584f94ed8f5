//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible fields: `*mut c_char`
//! instead of `String`, pointer + length instead of `Vec`, and enums with
//! explicit discriminants. Conversion functions live here to keep `lib.rs`
//! focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use engine_http_core::{is_transient, AdapterError, HttpAdapter, TransportRequest, TransportVerb};

/// Opaque handle to an adapter. The host performs the I/O itself, so the
/// adapter carries no transport.
pub struct FfiAdapter {
    pub(crate) inner: HttpAdapter<()>,
}

/// Convert to a C string, dropping interior NUL bytes instead of failing.
pub(crate) fn to_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    let mut bytes = s.into();
    bytes.retain(|&b| b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

/// Length as the `u32` the C side sees, or `None` if it does not fit.
pub(crate) fn c_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Hand a byte buffer to C. Empty buffers become null; buffers longer than
/// `u32::MAX` are refused so the length can always be freed back.
fn into_raw_bytes(bytes: Vec<u8>) -> Option<(*mut u8, u32)> {
    if bytes.is_empty() {
        return Some((std::ptr::null_mut(), 0));
    }
    let len = c_len(bytes.len())?;
    let ptr = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    Some((ptr, len))
}

/// Reclaim a buffer produced by `into_raw_bytes`.
///
/// # Safety
/// `ptr`/`len` must come from `into_raw_bytes` and not have been freed.
pub(crate) unsafe fn free_raw_bytes(ptr: *mut u8, len: u32) {
    if !ptr.is_null() && len > 0 {
        drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Host verb as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTransportVerb {
    Get = 0,
    Head = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
    Options = 5,
    Trace = 6,
    Connect = 7,
    Patch = 8,
}

impl From<TransportVerb> for FfiTransportVerb {
    fn from(v: TransportVerb) -> Self {
        match v {
            TransportVerb::Get => FfiTransportVerb::Get,
            TransportVerb::Head => FfiTransportVerb::Head,
            TransportVerb::Post => FfiTransportVerb::Post,
            TransportVerb::Put => FfiTransportVerb::Put,
            TransportVerb::Delete => FfiTransportVerb::Delete,
            TransportVerb::Options => FfiTransportVerb::Options,
            TransportVerb::Trace => FfiTransportVerb::Trace,
            TransportVerb::Connect => FfiTransportVerb::Connect,
            TransportVerb::Patch => FfiTransportVerb::Patch,
        }
    }
}

/// A caller header as a key-value pair of C strings. Owned by the caller.
#[repr(C)]
pub struct FfiHeader {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A prepared request, ready for the host's HTTP object.
///
/// `header_lines` is an array of `header_lines_len` `"Key: Value"` strings,
/// `Accept: application/json` first. `body` is null when there is none.
#[repr(C)]
pub struct FfiTransportRequest {
    pub verb: FfiTransportVerb,
    pub uri: *mut c_char,
    pub header_lines: *mut *mut c_char,
    pub header_lines_len: u32,
    pub body: *mut u8,
    pub body_len: u32,
    pub timeout_ms: u64,
    pub use_threads: bool,
}

/// Status written through `engine_http_prepare`'s out-parameter.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiPrepareStatus {
    Ok = 0,
    /// A required pointer was null or a string was not UTF-8.
    NullArg = 1,
    /// The method was refused by `MethodPolicy::Reject`.
    UnsupportedMethod = 2,
    /// Header count or body length does not fit in `u32`.
    TooLarge = 3,
    Panic = 4,
}

impl FfiTransportRequest {
    /// Convert a core `TransportRequest` into a heap-allocated `FfiTransportRequest`.
    ///
    /// `None` if the header count or body length overflows `u32`. Lengths
    /// are checked before anything is handed to C.
    pub(crate) fn from_core(req: TransportRequest) -> Option<*mut Self> {
        let header_lines_len = c_len(req.header_lines.len())?;
        let (body, body_len) = into_raw_bytes(req.body.unwrap_or_default())?;

        let lines: Vec<*mut c_char> = req.header_lines.into_iter().map(to_c_string).collect();
        let header_lines = Box::into_raw(lines.into_boxed_slice()) as *mut *mut c_char;

        Some(Box::into_raw(Box::new(FfiTransportRequest {
            verb: req.verb.into(),
            uri: to_c_string(req.uri),
            header_lines,
            header_lines_len,
            body,
            body_len,
            timeout_ms: req.timeout.as_millis() as u64,
            use_threads: req.use_threads,
        })))
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Outcome codes returned in `FfiOutcome`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiOutcomeCode {
    Ok = 0,
    Api = 1,
    NullArg = 2,
    Panic = 3,
    /// The response body is longer than `u32::MAX` bytes.
    TooLarge = 4,
}

/// Result envelope for `engine_http_complete`.
///
/// On success `code` is `Ok` and `body`/`body_len` hold the response text as
/// UTF-8 bytes, not NUL-terminated and possibly containing NUL. On an API
/// failure `code` is `Api` and the structured fields are filled in;
/// `details_json` is a JSON object (`{}` when the body had no nested error).
/// For `NullArg`, `Panic` and `TooLarge`, `message` describes the problem.
#[repr(C)]
pub struct FfiOutcome {
    pub code: FfiOutcomeCode,
    pub body: *mut u8,
    pub body_len: u32,
    pub status_code: i64,
    pub message: *mut c_char,
    pub grpc_status_code: i32,
    pub details_json: *mut c_char,
    pub transient: bool,
}

impl FfiOutcome {
    fn empty(code: FfiOutcomeCode) -> Self {
        FfiOutcome {
            code,
            body: std::ptr::null_mut(),
            body_len: 0,
            status_code: 0,
            message: std::ptr::null_mut(),
            grpc_status_code: 0,
            details_json: std::ptr::null_mut(),
            transient: false,
        }
    }

    pub(crate) fn ok(body: String) -> *mut Self {
        let Some((ptr, len)) = into_raw_bytes(body.into_bytes()) else {
            let mut outcome = Self::empty(FfiOutcomeCode::TooLarge);
            outcome.message = to_c_string("response body exceeds u32::MAX bytes");
            return Box::into_raw(Box::new(outcome));
        };
        let mut outcome = Self::empty(FfiOutcomeCode::Ok);
        outcome.body = ptr;
        outcome.body_len = len;
        Box::into_raw(Box::new(outcome))
    }

    /// Build an outcome from an adapter error. `interpret` only yields
    /// `Api`, but every variant gets a sensible mapping.
    pub(crate) fn from_error(err: AdapterError) -> *mut Self {
        let transient = is_transient(&err);
        let mut outcome = Self::empty(FfiOutcomeCode::Api);
        match err {
            AdapterError::Api(api) => {
                let details = serde_json::to_string(&api.details).unwrap_or_else(|_| "{}".to_string());
                outcome.status_code = api.status_code;
                outcome.message = to_c_string(api.message);
                outcome.grpc_status_code = api.grpc_status_code;
                outcome.details_json = to_c_string(details);
            }
            other => {
                outcome.status_code = engine_http_core::NO_STATUS;
                outcome.grpc_status_code = engine_http_core::NO_CODE;
                outcome.message = to_c_string(other.to_string());
                outcome.details_json = to_c_string("{}");
            }
        }
        outcome.transient = transient;
        Box::into_raw(Box::new(outcome))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        let mut outcome = Self::empty(FfiOutcomeCode::NullArg);
        outcome.message = to_c_string(format!("null argument: {name}"));
        Box::into_raw(Box::new(outcome))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        let mut outcome = Self::empty(FfiOutcomeCode::Panic);
        outcome.message = to_c_string(msg);
        Box::into_raw(Box::new(outcome))
    }
}
