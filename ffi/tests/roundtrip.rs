//! Host-driven round trips through the C ABI against the live mock server.
//!
//! # Design
//! Plays the engine side of the boundary: prepare a request through
//! `engine_http_prepare`, perform it with ureq as the "HTTP node", then hand
//! the completion to `engine_http_complete`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use engine_http_ffi::types::{
    FfiHeader, FfiOutcome, FfiOutcomeCode, FfiPrepareStatus, FfiTransportRequest, FfiTransportVerb,
};
use engine_http_ffi::{
    engine_http_adapter_free, engine_http_adapter_new, engine_http_complete,
    engine_http_free_outcome, engine_http_free_request, engine_http_is_transient,
    engine_http_prepare,
};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn c_str(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
}

fn body_text(outcome: &FfiOutcome) -> String {
    if outcome.body.is_null() {
        return String::new();
    }
    let bytes = unsafe { std::slice::from_raw_parts(outcome.body, outcome.body_len as usize) };
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, lines: &[String]) -> ureq::RequestBuilder<B> {
    for line in lines {
        if let Some((key, value)) = line.split_once(": ") {
            builder = builder.header(key, value);
        }
    }
    builder
}

/// Perform a prepared request with ureq and report it the way an engine's
/// HTTP node would: `(result, status, body)`.
fn host_execute(req: &FfiTransportRequest) -> (i32, i64, Vec<u8>) {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(std::time::Duration::from_millis(req.timeout_ms)))
        .build()
        .new_agent();

    let uri = c_str(req.uri);
    let lines: Vec<String> = unsafe {
        std::slice::from_raw_parts(req.header_lines, req.header_lines_len as usize)
    }
    .iter()
    .map(|l| c_str(*l))
    .collect();
    let body: &[u8] = if req.body.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(req.body, req.body_len as usize) }
    };

    let uri = uri.as_str();
    let outcome = match req.verb {
        FfiTransportVerb::Get => with_headers(agent.get(uri), &lines).call(),
        FfiTransportVerb::Head => with_headers(agent.head(uri), &lines).call(),
        FfiTransportVerb::Delete => with_headers(agent.delete(uri), &lines).call(),
        FfiTransportVerb::Post => with_headers(agent.post(uri), &lines).send(body),
        FfiTransportVerb::Put => with_headers(agent.put(uri), &lines).send(body),
        other => panic!("adapter never emits {other:?}"),
    };

    match outcome {
        Ok(mut response) => {
            let status = i64::from(response.status().as_u16());
            let body = response.body_mut().read_to_vec().unwrap_or_default();
            (0, status, body)
        }
        // RESULT_CANT_CONNECT
        Err(_) => (2, 0, Vec::new()),
    }
}

fn round_trip(
    base: &str,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> *mut FfiOutcome {
    let adapter = engine_http_adapter_new(5_000, false, true);
    let method = CString::new(method).unwrap();
    let uri = CString::new(format!("{base}{path}")).unwrap();

    let owned: Vec<(CString, CString)> = headers
        .iter()
        .map(|(k, v)| (CString::new(*k).unwrap(), CString::new(*v).unwrap()))
        .collect();
    let pairs: Vec<FfiHeader> = owned
        .iter()
        .map(|(k, v)| FfiHeader {
            key: k.as_ptr(),
            value: v.as_ptr(),
        })
        .collect();
    let (body_ptr, body_len) = match body {
        Some(b) => (b.as_ptr(), b.len() as u32),
        None => (std::ptr::null(), 0),
    };

    let mut status = FfiPrepareStatus::Panic;
    let req = engine_http_prepare(
        adapter,
        method.as_ptr(),
        uri.as_ptr(),
        pairs.as_ptr(),
        pairs.len() as u32,
        body_ptr,
        body_len,
        -1,
        &mut status,
    );
    assert!(!req.is_null());
    assert_eq!(status, FfiPrepareStatus::Ok);

    let (result, status, response) = host_execute(unsafe { &*req });
    engine_http_free_request(req);
    engine_http_adapter_free(adapter);

    engine_http_complete(result, status, response.as_ptr(), response.len() as u32)
}

#[test]
fn create_then_fetch_through_the_c_abi() {
    let base = start_server();

    let outcome = round_trip(
        &base,
        "POST",
        "/v2/items",
        &[("Content-Type", "application/json")],
        Some(r#"{"name":"Lantern"}"#),
    );
    let o = unsafe { &*outcome };
    assert_eq!(o.code, FfiOutcomeCode::Ok);
    let created: serde_json::Value = serde_json::from_str(&body_text(o)).unwrap();
    assert_eq!(created["name"], "Lantern");
    let id = created["id"].as_str().unwrap().to_string();
    engine_http_free_outcome(outcome);

    let outcome = round_trip(&base, "GET", &format!("/v2/items/{id}"), &[], None);
    let o = unsafe { &*outcome };
    assert_eq!(o.code, FfiOutcomeCode::Ok);
    let fetched: serde_json::Value = serde_json::from_str(&body_text(o)).unwrap();
    assert_eq!(fetched["id"], id.as_str());
    engine_http_free_outcome(outcome);
}

#[test]
fn missing_item_is_a_structured_error() {
    let base = start_server();

    let outcome = round_trip(
        &base,
        "GET",
        "/v2/items/00000000-0000-0000-0000-000000000000",
        &[],
        None,
    );
    let o = unsafe { &*outcome };
    assert_eq!(o.code, FfiOutcomeCode::Api);
    assert_eq!(o.status_code, 404);
    assert_eq!(c_str(o.message), "item not found");
    assert_eq!(o.grpc_status_code, 5);
    assert!(!engine_http_is_transient(outcome));
    engine_http_free_outcome(outcome);
}

#[test]
fn unavailable_is_transient() {
    let base = start_server();

    let outcome = round_trip(&base, "GET", "/status/503", &[], None);
    let o = unsafe { &*outcome };
    assert_eq!(o.status_code, 503);
    assert_eq!(o.grpc_status_code, -1);
    assert!(engine_http_is_transient(outcome));
    engine_http_free_outcome(outcome);
}
