//! The seam between the adapter and the host's HTTP request object.
//!
//! # Design
//! The host owns the real request machinery (sockets, TLS, its own request
//! node) and the adapter only describes what to send and waits for one
//! completion. `HostTransport` hands out one `TransportHandle` per request.
//! The handle stands for a request object registered in the host's
//! ownership tree and must be released once the call is over.
//!
//! Completion is a single signal. `CompletionSender::complete` consumes the
//! sender, so a handle cannot report twice. Dropping the sender without
//! completing is reported to the caller as a transport failure.
//!
//! Plain data types (`TransportRequest`, `Completion`) are also what the C
//! boundary exchanges, so a host that drives I/O itself never has to touch
//! these traits.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::SubmitError;
use crate::http::TransportVerb;

/// A request ready for the host: verb chosen, header lines built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub verb: TransportVerb,
    pub uri: String,
    /// `"Key: Value"` lines, `Accept: application/json` first.
    pub header_lines: Vec<String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub use_threads: bool,
}

/// Outcome of the transport itself, independent of the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TransportResult {
    Success = 0,
    ChunkedBodySizeMismatch = 1,
    CantConnect = 2,
    CantResolve = 3,
    ConnectionError = 4,
    TlsHandshakeError = 5,
    NoResponse = 6,
    BodySizeLimitExceeded = 7,
    BodyDecompressFailed = 8,
    RequestFailed = 9,
    DownloadFileCantOpen = 10,
    DownloadFileWriteError = 11,
    RedirectLimitReached = 12,
    Timeout = 13,
}

impl TransportResult {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map a host result code back to a variant. Unknown codes are `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        use TransportResult::*;
        let result = match code {
            0 => Success,
            1 => ChunkedBodySizeMismatch,
            2 => CantConnect,
            3 => CantResolve,
            4 => ConnectionError,
            5 => TlsHandshakeError,
            6 => NoResponse,
            7 => BodySizeLimitExceeded,
            8 => BodyDecompressFailed,
            9 => RequestFailed,
            10 => DownloadFileCantOpen,
            11 => DownloadFileWriteError,
            12 => RedirectLimitReached,
            13 => Timeout,
            _ => return None,
        };
        Some(result)
    }

    pub fn is_success(self) -> bool {
        self == TransportResult::Success
    }
}

/// Payload of the host's completion signal.
///
/// Mirrors the host's `(result, status, headers, body)` tuple. The adapter
/// reads `result`, `status` and `body`; `headers` is carried for hosts that
/// report them but is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub result: TransportResult,
    pub status: i64,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl Completion {
    /// A completion that reached the server and got an HTTP answer.
    pub fn new(status: i64, body: impl Into<Vec<u8>>) -> Self {
        Self {
            result: TransportResult::Success,
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A completion where the transport failed before any HTTP status.
    pub fn failed(result: TransportResult) -> Self {
        Self {
            result,
            status: 0,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// Fires the host's completion signal. Consumed on use.
#[derive(Debug)]
pub struct CompletionSender {
    tx: oneshot::Sender<Completion>,
}

impl CompletionSender {
    /// Deliver the completion. A caller that stopped waiting (cancelled)
    /// simply never sees it.
    pub fn complete(self, completion: Completion) {
        let _ = self.tx.send(completion);
    }

    /// Whether the waiting side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub(crate) fn completion_channel() -> (CompletionSender, oneshot::Receiver<Completion>) {
    let (tx, rx) = oneshot::channel();
    (CompletionSender { tx }, rx)
}

/// Factory for per-request host objects.
pub trait HostTransport: Send + Sync {
    type Handle: TransportHandle;

    /// Construct a request object and register it with the host.
    fn acquire(&self) -> Self::Handle;
}

/// One host request object, valid for a single request.
pub trait TransportHandle: Send {
    fn set_timeout(&mut self, timeout: Duration);

    /// Hint that the host may run the request off its main loop.
    fn set_use_threads(&mut self, _enabled: bool) {}

    /// Dispatch the request. On `Ok`, the handle must eventually call
    /// `completion.complete` or drop it.
    fn request(
        &mut self,
        request: &TransportRequest,
        completion: CompletionSender,
    ) -> Result<(), SubmitError>;

    /// Unregister and free the request object. Called exactly once; a
    /// request still in flight must be aborted.
    fn release(&mut self);
}

/// Releases the wrapped handle when dropped, whichever way the call exits.
pub(crate) struct HandleGuard<H: TransportHandle> {
    handle: H,
}

impl<H: TransportHandle> HandleGuard<H> {
    pub(crate) fn new(handle: H) -> Self {
        Self { handle }
    }

    pub(crate) fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

impl<H: TransportHandle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        tracing::debug!(target: "engine_http::transport", "Releasing request handle");
        self.handle.release();
    }
}
