//! The HTTP adapter: one request in, one body or one error out.
//!
//! # Design
//! `send` is the async entry point for hosts that expose their request
//! object through `HostTransport`. It is built from two synchronous halves
//! that are public on their own, for hosts that run the I/O themselves:
//!
//! - `HttpAdapter::prepare` turns an `AdapterRequest` into a
//!   `TransportRequest` (verb, header lines, timeout).
//! - `interpret` turns the host's `Completion` into the response text or an
//!   `ApiResponseError`.
//!
//! The adapter never retries. `transient_classifier` hands a retry layer the
//! rule for what is worth retrying.

use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AdapterConfig;
use crate::error::{is_transient, AdapterError, ApiResponseError, TransientClassifier, NO_CODE, NO_STATUS};
use crate::http::{header_lines, select_verb, AdapterRequest};
use crate::transport::{
    completion_channel, Completion, HandleGuard, HostTransport, TransportHandle, TransportRequest,
    TransportResult,
};

/// Adapter bound to one host transport.
///
/// Holds no per-request state, so one adapter can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct HttpAdapter<T> {
    transport: T,
    config: AdapterConfig,
}

impl<T> HttpAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, AdapterConfig::default())
    }

    pub fn with_config(transport: T, config: AdapterConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a request that uses the configured default timeout.
    pub fn request(&self, method: &str, uri: &str) -> AdapterRequest {
        AdapterRequest::new(method, uri, self.config.default_timeout())
    }

    /// The rule an external retry layer should use with this adapter.
    pub fn transient_classifier(&self) -> TransientClassifier {
        is_transient
    }

    /// Resolve the verb and build the header lines for `request`.
    ///
    /// Fails only with `AdapterError::UnsupportedMethod`, and only under
    /// `MethodPolicy::Reject`.
    pub fn prepare(&self, request: &AdapterRequest) -> Result<TransportRequest, AdapterError> {
        let verb = select_verb(&request.method, self.config.method_policy)?;
        Ok(TransportRequest {
            verb,
            uri: request.uri.clone(),
            header_lines: header_lines(&request.headers),
            body: request.body.clone(),
            timeout: request.timeout,
            use_threads: self.config.use_threads,
        })
    }
}

impl<T: HostTransport> HttpAdapter<T> {
    /// Send `request` through the host and wait for its single completion.
    ///
    /// Returns the response body as text when the transport succeeded with a
    /// 2xx status. The host's request handle is released on every exit path.
    pub async fn send(&self, request: AdapterRequest) -> Result<String, AdapterError> {
        let span = tracing::debug_span!(
            target: "engine_http::adapter",
            "http_request",
            request_id = %Uuid::new_v4(),
            method = %request.method
        );
        self.send_inner(request).instrument(span).await
    }

    async fn send_inner(&self, request: AdapterRequest) -> Result<String, AdapterError> {
        let prepared = self.prepare(&request)?;

        if request.cancellation.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(AdapterError::Cancelled);
        }

        let mut guard = HandleGuard::new(self.transport.acquire());
        tracing::debug!(target: "engine_http::transport", "Acquired request handle");

        let handle = guard.handle_mut();
        handle.set_timeout(prepared.timeout);
        handle.set_use_threads(prepared.use_threads);

        let (completion_tx, completion_rx) = completion_channel();
        if let Err(err) = handle.request(&prepared, completion_tx) {
            tracing::warn!(
                target: "engine_http::adapter",
                "Submit failed: method='{}', uri='{}': {}",
                request.method,
                request.uri,
                err
            );
            return Err(err.into());
        }

        tracing::info!(
            target: "engine_http::adapter",
            "Send: method='{}', uri='{}', body='{}'",
            request.method,
            request.uri,
            request.body_text()
        );

        let received = match &request.cancellation {
            Some(token) => tokio::select! {
                biased;
                received = completion_rx => received,
                _ = token.cancelled() => {
                    tracing::debug!(target: "engine_http::adapter", "Cancelled while awaiting completion");
                    return Err(AdapterError::Cancelled);
                }
            },
            None => completion_rx.await,
        };
        drop(guard);

        // A handle that dropped its sender never produced a status.
        let completion = received.unwrap_or_else(|_| Completion::failed(TransportResult::NoResponse));
        interpret(completion)
    }
}

/// Turn the host's completion into the response text or a structured error.
///
/// Success requires both a successful transport result and a status in
/// `200..=299`. Any other completion becomes an `ApiResponseError` built
/// from the JSON error body; a failed transport reports status `-1`.
pub fn interpret(completion: Completion) -> Result<String, AdapterError> {
    let body = String::from_utf8_lossy(&completion.body).into_owned();

    tracing::info!(
        target: "engine_http::adapter",
        "Received: status={}, contents='{}'",
        completion.status,
        body
    );

    let transport_ok = completion.result.is_success();
    if transport_ok && (200..=299).contains(&completion.status) {
        return Ok(body);
    }

    let status = if transport_ok { completion.status } else { NO_STATUS };
    Err(parse_error_body(status, &body).into())
}

/// Build an `ApiResponseError` from an error response body.
///
/// The body is read as a JSON object with optional `message`, `code` and
/// `error` keys. Anything missing or malformed falls back to an empty
/// message and code `-1`.
pub fn parse_error_body(status_code: i64, body: &str) -> ApiResponseError {
    let decoded = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let message = match decoded.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let code = decoded
        .get("code")
        .and_then(Value::as_i64)
        .and_then(|c| i32::try_from(c).ok())
        .unwrap_or(NO_CODE);

    let mut err = ApiResponseError::new(status_code, message, code);
    if let Some(payload) = decoded.get("error") {
        err.copy_details(payload);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MethodPolicy;
    use crate::http::TransportVerb;
    use std::time::Duration;

    fn adapter() -> HttpAdapter<()> {
        HttpAdapter::new(())
    }

    fn api_err(result: Result<String, AdapterError>) -> ApiResponseError {
        match result {
            Err(AdapterError::Api(e)) => e,
            other => panic!("expected ApiResponseError, got {other:?}"),
        }
    }

    #[test]
    fn prepare_builds_transport_request() {
        let a = adapter();
        let req = a
            .request("POST", "http://127.0.0.1:7350/v2/account")
            .header("Authorization", "Bearer t")
            .body(r#"{"a":1}"#);
        let prepared = a.prepare(&req).unwrap();
        assert_eq!(prepared.verb, TransportVerb::Post);
        assert_eq!(prepared.uri, "http://127.0.0.1:7350/v2/account");
        assert_eq!(
            prepared.header_lines,
            vec!["Accept: application/json", "Authorization: Bearer t"]
        );
        assert_eq!(prepared.body.as_deref(), Some(&br#"{"a":1}"#[..]));
        assert_eq!(prepared.timeout, Duration::from_secs(10));
        assert_eq!(prepared.use_threads, a.config().use_threads);
    }

    #[test]
    fn prepare_with_unknown_method_depends_on_policy() {
        let req = adapter().request("PATCH", "http://localhost/");
        assert_eq!(adapter().prepare(&req).unwrap().verb, TransportVerb::Get);

        let strict = HttpAdapter::with_config(
            (),
            AdapterConfig {
                method_policy: MethodPolicy::Reject,
                ..AdapterConfig::default()
            },
        );
        assert!(matches!(
            strict.prepare(&req),
            Err(AdapterError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn interpret_success_returns_body_verbatim() {
        let body = interpret(Completion::new(201, r#"{"id":1}"#)).unwrap();
        assert_eq!(body, r#"{"id":1}"#);

        let body = interpret(Completion::new(299, "  raw text \n")).unwrap();
        assert_eq!(body, "  raw text \n");
    }

    #[test]
    fn interpret_not_found() {
        let err = api_err(interpret(Completion::new(
            404,
            r#"{"message":"not found","code":5}"#,
        )));
        assert_eq!(err.status_code, 404);
        assert_eq!(err.message, "not found");
        assert_eq!(err.grpc_status_code, 5);
        assert!(!err.is_transient());
    }

    #[test]
    fn interpret_unparseable_5xx_uses_defaults() {
        for body in ["", "<html>oops</html>", "[1,2]", "\"str\""] {
            let err = api_err(interpret(Completion::new(503, body)));
            assert_eq!(err.status_code, 503, "{body:?}");
            assert_eq!(err.message, "", "{body:?}");
            assert_eq!(err.grpc_status_code, -1, "{body:?}");
            assert!(err.is_transient());
        }
    }

    #[test]
    fn interpret_boundaries_of_success_range() {
        assert!(interpret(Completion::new(200, "")).is_ok());
        assert!(interpret(Completion::new(199, "")).is_err());
        assert!(interpret(Completion::new(300, "")).is_err());
    }

    #[test]
    fn transport_failure_reports_no_status() {
        let mut completion = Completion::failed(TransportResult::CantConnect);
        completion.status = 200;
        let err = api_err(interpret(completion));
        assert_eq!(err.status_code, NO_STATUS);
        assert!(err.is_transient());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let body = interpret(Completion::new(200, vec![b'o', b'k', 0xff])).unwrap();
        assert_eq!(body, "ok\u{fffd}");
    }

    #[test]
    fn error_body_with_nested_error_copies_details() {
        let err = parse_error_body(
            400,
            r#"{"message":"invalid","code":3,"error":{"field":"username","min":6}}"#,
        );
        assert_eq!(err.message, "invalid");
        assert_eq!(err.grpc_status_code, 3);
        assert_eq!(err.details["field"], "username");
        assert_eq!(err.details["min"], 6);
    }

    #[test]
    fn error_body_with_odd_field_types() {
        let err = parse_error_body(409, r#"{"message":42,"code":"five"}"#);
        assert_eq!(err.message, "42");
        assert_eq!(err.grpc_status_code, -1);

        let err = parse_error_body(409, r#"{"message":null,"code":99999999999}"#);
        assert_eq!(err.message, "");
        assert_eq!(err.grpc_status_code, -1);
    }

    #[test]
    fn classifier_is_is_transient() {
        let classify = adapter().transient_classifier();
        let err = AdapterError::Api(ApiResponseError::new(-1, "", -1));
        assert!(classify(&err));
        assert!(!classify(&AdapterError::Cancelled));
    }
}
