//! C-ABI wrapper around `engine-http-core`.
//!
//! # Overview
//! For engines that own their HTTP object and drive I/O themselves (a
//! GDExtension, a C++ host loop). The host asks the adapter to prepare a
//! request, hands it to its own HTTP node, and passes the completion signal
//! back to get the response text or a structured error.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `engine_http_prepare` / `engine_http_complete` mirror the core's
//!   `HttpAdapter::prepare` / `interpret` 1:1.
//! - The caller owns all returned pointers and must call the matching
//!   `engine_http_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::time::Duration;

use engine_http_core::{
    interpret, AdapterConfig, AdapterRequest, Completion, HttpAdapter, MethodPolicy, TransportResult,
};

use types::*;

/// Read a C string; null or invalid UTF-8 becomes `None`.
fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Copy a caller buffer; null or zero length is an empty buffer.
fn read_bytes(ptr: *const u8, len: u32) -> Vec<u8> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }.to_vec()
}

// ---------------------------------------------------------------------------
// Adapter lifecycle
// ---------------------------------------------------------------------------

/// Create an adapter.
///
/// `timeout_ms` is the default used when `engine_http_prepare` gets a
/// negative timeout. With `reject_unknown_methods` false, unrecognized
/// methods are sent as GET.
/// The caller must free the returned pointer with `engine_http_adapter_free`.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_adapter_new(
    timeout_ms: u64,
    reject_unknown_methods: bool,
    use_threads: bool,
) -> *mut FfiAdapter {
    catch_unwind(|| {
        let config = AdapterConfig {
            timeout_ms,
            method_policy: if reject_unknown_methods {
                MethodPolicy::Reject
            } else {
                MethodPolicy::FallbackToGet
            },
            use_threads,
        };
        let adapter = HttpAdapter::with_config((), config);
        Box::into_raw(Box::new(FfiAdapter { inner: adapter }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create an adapter configured from `ENGINE_HTTP_*` environment variables.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_adapter_from_env() -> *mut FfiAdapter {
    catch_unwind(|| {
        let adapter = HttpAdapter::with_config((), AdapterConfig::from_env());
        Box::into_raw(Box::new(FfiAdapter { inner: adapter }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an adapter created by `engine_http_adapter_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_adapter_free(adapter: *mut FfiAdapter) {
    if !adapter.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(adapter) });
        });
    }
}

// ---------------------------------------------------------------------------
// Prepare
// ---------------------------------------------------------------------------

/// Prepare a request for the host's HTTP object.
///
/// `headers` points to `headers_len` caller-owned pairs; `body` may be null.
/// A negative `timeout_ms` selects the adapter's default.
/// Returns null on failure. When `status` is non-null it receives the
/// reason: `NullArg` for a null or non-UTF-8 argument, `UnsupportedMethod`
/// when the adapter's policy rejects the method, `TooLarge` when a length
/// does not fit in `u32`, and `Ok` on success.
/// The caller must free the returned pointer with `engine_http_free_request`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn engine_http_prepare(
    adapter: *const FfiAdapter,
    method: *const c_char,
    uri: *const c_char,
    headers: *const FfiHeader,
    headers_len: u32,
    body: *const u8,
    body_len: u32,
    timeout_ms: i64,
    status: *mut FfiPrepareStatus,
) -> *mut FfiTransportRequest {
    let outcome = catch_unwind(|| {
        prepare_request(adapter, method, uri, headers, headers_len, body, body_len, timeout_ms)
    })
    .unwrap_or(Err(FfiPrepareStatus::Panic));

    let (request, code) = match outcome {
        Ok(request) => (request, FfiPrepareStatus::Ok),
        Err(code) => (std::ptr::null_mut(), code),
    };
    if !status.is_null() {
        unsafe { *status = code };
    }
    request
}

#[allow(clippy::too_many_arguments)]
fn prepare_request(
    adapter: *const FfiAdapter,
    method: *const c_char,
    uri: *const c_char,
    headers: *const FfiHeader,
    headers_len: u32,
    body: *const u8,
    body_len: u32,
    timeout_ms: i64,
) -> Result<*mut FfiTransportRequest, FfiPrepareStatus> {
    if adapter.is_null() {
        return Err(FfiPrepareStatus::NullArg);
    }
    let adapter = unsafe { &*adapter };
    let (Some(method), Some(uri)) = (read_str(method), read_str(uri)) else {
        return Err(FfiPrepareStatus::NullArg);
    };

    let timeout = if timeout_ms < 0 {
        adapter.inner.config().default_timeout()
    } else {
        Duration::from_millis(timeout_ms as u64)
    };
    let mut request = AdapterRequest::new(method, uri, timeout);

    if !headers.is_null() && headers_len > 0 {
        let pairs = unsafe { std::slice::from_raw_parts(headers, headers_len as usize) };
        for pair in pairs {
            let (Some(key), Some(value)) = (read_str(pair.key), read_str(pair.value)) else {
                return Err(FfiPrepareStatus::NullArg);
            };
            request = request.header(key, value);
        }
    }

    if !body.is_null() {
        request = request.body(read_bytes(body, body_len));
    }

    let prepared = adapter
        .inner
        .prepare(&request)
        .map_err(|_| FfiPrepareStatus::UnsupportedMethod)?;
    FfiTransportRequest::from_core(prepared).ok_or(FfiPrepareStatus::TooLarge)
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// Interpret the host's completion signal.
///
/// `result` is the host's transport result code (0 = success); unknown
/// codes count as a failed request. `body` may be null for an empty body.
/// The caller must free the returned pointer with `engine_http_free_outcome`.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_complete(
    result: i32,
    status: i64,
    body: *const u8,
    body_len: u32,
) -> *mut FfiOutcome {
    catch_unwind(|| {
        let completion = Completion {
            result: TransportResult::from_code(result).unwrap_or(TransportResult::RequestFailed),
            status,
            headers: Vec::new(),
            body: read_bytes(body, body_len),
        };
        match interpret(completion) {
            Ok(text) => FfiOutcome::ok(text),
            Err(e) => FfiOutcome::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiOutcome::panic("panic in engine_http_complete"))
}

/// Whether a retry layer should try the request again.
///
/// True only for API failures with status `>= 500` or `-1`. False for null.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_is_transient(outcome: *const FfiOutcome) -> bool {
    if outcome.is_null() {
        return false;
    }
    let outcome = unsafe { &*outcome };
    matches!(outcome.code, FfiOutcomeCode::Api) && outcome.transient
}

/// Render a one-line description of a failed outcome for host logs.
///
/// Returns null for null or successful outcomes. Free with
/// `engine_http_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_describe(outcome: *const FfiOutcome) -> *mut c_char {
    catch_unwind(|| {
        if outcome.is_null() {
            return std::ptr::null_mut();
        }
        let outcome = unsafe { &*outcome };
        let message = read_str(outcome.message).unwrap_or("");
        match outcome.code {
            FfiOutcomeCode::Ok => std::ptr::null_mut(),
            FfiOutcomeCode::Api => to_c_string(format!(
                "ApiResponseError(StatusCode={}, Message='{}', GrpcStatusCode={})",
                outcome.status_code, message, outcome.grpc_status_code
            )),
            FfiOutcomeCode::NullArg | FfiOutcomeCode::Panic | FfiOutcomeCode::TooLarge => {
                to_c_string(message)
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiTransportRequest` returned by `engine_http_prepare`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_free_request(req: *mut FfiTransportRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.uri);
        if !req.header_lines.is_null() {
            let lines = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.header_lines,
                    req.header_lines_len as usize,
                ))
            };
            for line in lines.iter() {
                free_c_string(*line);
            }
        }
        unsafe { free_raw_bytes(req.body, req.body_len) };
    });
}

/// Free an `FfiOutcome` returned by `engine_http_complete`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_free_outcome(outcome: *mut FfiOutcome) {
    if outcome.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let outcome = unsafe { Box::from_raw(outcome) };
        unsafe { free_raw_bytes(outcome.body, outcome.body_len) };
        free_c_string(outcome.message);
        free_c_string(outcome.details_json);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn engine_http_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
