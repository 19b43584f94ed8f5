//! Request-side types: the caller's request, its method, and the host verb
//! it maps onto.
//!
//! # Design
//! Callers hand over the method as a case-sensitive string because that is
//! what existing call sites pass. `HttpMethod` is the typed view of the five
//! supported methods and `TransportVerb` is the host's own verb table. The
//! mapping between them lives in `select_verb`, which also applies the
//! configured policy for unrecognized methods.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::config::MethodPolicy;
use crate::error::AdapterError;

/// The header line prepended to every outgoing request.
pub const ACCEPT_JSON: &str = "Accept: application/json";

/// HTTP method accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// The host verb this method is sent with.
    pub fn verb(self) -> TransportVerb {
        match self {
            HttpMethod::Get => TransportVerb::Get,
            HttpMethod::Post => TransportVerb::Post,
            HttpMethod::Put => TransportVerb::Put,
            HttpMethod::Delete => TransportVerb::Delete,
            HttpMethod::Head => TransportVerb::Head,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is case-sensitive: `"get"` is not a method.
impl FromStr for HttpMethod {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(AdapterError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Verb table of the host transport. Discriminants match the numbering
/// engine HTTP clients use, so they can cross the C boundary unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransportVerb {
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

impl TransportVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportVerb::Get => "GET",
            TransportVerb::Head => "HEAD",
            TransportVerb::Post => "POST",
            TransportVerb::Put => "PUT",
            TransportVerb::Delete => "DELETE",
            TransportVerb::Options => "OPTIONS",
            TransportVerb::Trace => "TRACE",
            TransportVerb::Connect => "CONNECT",
            TransportVerb::Patch => "PATCH",
        }
    }
}

/// Map a caller-supplied method string onto a host verb.
///
/// Unknown methods become `GET` under `MethodPolicy::FallbackToGet`, which is
/// what existing callers were built against. Under `MethodPolicy::Reject`
/// they fail with `AdapterError::UnsupportedMethod`.
pub fn select_verb(method: &str, policy: MethodPolicy) -> Result<TransportVerb, AdapterError> {
    match method.parse::<HttpMethod>() {
        Ok(m) => Ok(m.verb()),
        Err(err) => match policy {
            MethodPolicy::FallbackToGet => {
                tracing::warn!(
                    target: "engine_http::adapter",
                    "Unrecognized method '{}', sending as GET",
                    method
                );
                Ok(TransportVerb::Get)
            }
            MethodPolicy::Reject => Err(err),
        },
    }
}

/// Build the flat `"Key: Value"` header list handed to the host.
///
/// `Accept: application/json` is always first, followed by the caller's
/// headers in their original order.
pub fn header_lines(headers: &[(String, String)]) -> Vec<String> {
    let mut lines = Vec::with_capacity(headers.len() + 1);
    lines.push(ACCEPT_JSON.to_string());
    lines.extend(headers.iter().map(|(k, v)| format!("{k}: {v}")));
    lines
}

/// A single request as supplied by the caller.
///
/// Built once, then handed by value to `HttpAdapter::send`. Request bodies
/// are expected to be JSON; include a `Content-Type: application/json`
/// header when the receiving end needs it spelled out.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub cancellation: Option<CancellationToken>,
}

impl AdapterRequest {
    pub fn new(method: &str, uri: &str, timeout: Duration) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: Vec::new(),
            body: None,
            timeout,
            cancellation: None,
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The body rendered for log lines; empty when absent.
    pub(crate) fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}
