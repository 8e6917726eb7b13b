//! The response-writer boundary.
//!
//! The chain never constructs responses — handlers and wraps write whatever
//! they want, including errors, straight to the writer the host framework
//! hands them. [`ResponseWriter`] is that contract; [`Recorder`] is the
//! in-memory implementation used by tests and by anything that wants to run
//! a chain without a transport underneath.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

/// Where a handler's output goes.
///
/// The mirror of a server framework's response side: mutate headers, set the
/// status once, stream body bytes with [`write`](ResponseWriter::write).
/// There is no error channel — a failing handler reports by writing an error
/// response here, not by returning anything.
pub trait ResponseWriter: Send {
    /// The response headers. Mutations after the first body write may be
    /// ignored by transport-backed implementations.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status. Implementations keep the last value set
    /// before the first body write.
    fn set_status(&mut self, status: StatusCode);

    /// Appends a chunk of body bytes.
    fn write(&mut self, chunk: &[u8]);
}

/// An in-memory [`ResponseWriter`].
///
/// Buffers everything a handler writes so it can be inspected afterwards.
/// Defaults to `200 OK` with empty headers and body, like a fresh response.
pub struct Recorder {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the recorder, yielding the buffered body.
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}
