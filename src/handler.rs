//! Handler traits and type erasure.
//!
//! Two handler shapes live side by side:
//!
//! - [`Handler`] — context-aware. Every stage of a chain speaks this:
//!   `serve(cx, writer, request)`. This is the contract wraps transform.
//! - [`PlainHandler`] — the host framework's shape: `serve(writer, request)`,
//!   no context. A finalized chain is one of these, and legacy middleware
//!   bridged into a chain only ever sees these.
//!
//! Both are stored type-erased (`Arc<dyn …>`) so a chain can hold handlers
//! of different concrete types uniformly; the per-request cost is one `Arc`
//! clone and one virtual call. Futures come back as [`BoxFuture`] — pinned,
//! boxed, borrowing the writer and request for the length of one call.
//!
//! Neither trait returns anything: output, including error responses, goes
//! through the [`ResponseWriter`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::context::Context;
use crate::writer::ResponseWriter;

/// The request threaded through a chain: fully buffered, never inspected or
/// modified by the chain itself.
pub type Request = http::Request<Bytes>;

/// A pinned, heap-allocated future borrowing its call's writer and request.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

// ── Context-aware side ────────────────────────────────────────────────────────

/// A context-aware request handler — the unit a chain composes.
pub trait Handler: Send + Sync {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a>;
}

/// A shared, type-erased [`Handler`].
pub type BoxedHandler = Arc<dyn Handler>;

/// Adapter letting a plain function satisfy [`Handler`].
///
/// Calling the capability simply invokes the stored function. `fn` items
/// with the `serve` signature coerce directly:
///
/// ```rust
/// use weft::{BoxFuture, Context, HandlerFn, Request, ResponseWriter};
///
/// fn hello<'a>(
///     _cx: Context,
///     w: &'a mut dyn ResponseWriter,
///     _req: &'a Request,
/// ) -> BoxFuture<'a> {
///     Box::pin(async move { w.write(b"hello") })
/// }
///
/// let handler = HandlerFn::new(hello);
/// # let _ = handler;
/// ```
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F>
where
    F: for<'a> Fn(Context, &'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(Context, &'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a>
        + Send
        + Sync,
{
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        (self.0)(cx, w, req)
    }
}

// ── Host-framework side ───────────────────────────────────────────────────────

/// The host framework's context-unaware handler shape.
///
/// [`Chain::end`](crate::Chain::end) produces one of these, and
/// [`bridge`](crate::bridge)d legacy middleware transforms them.
pub trait PlainHandler: Send + Sync {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a>;
}

/// A shared, type-erased [`PlainHandler`].
pub type BoxedPlainHandler = Arc<dyn PlainHandler>;

/// Adapter letting a plain function satisfy [`PlainHandler`] — the mirror of
/// [`HandlerFn`] for the host-framework side, handy when writing legacy
/// middleware in tests or demos.
pub struct PlainHandlerFn<F>(F);

impl<F> PlainHandlerFn<F>
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PlainHandler for PlainHandlerFn<F>
where
    F: for<'a> Fn(&'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync,
{
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (self.0)(w, req)
    }
}

// ── Context binding ───────────────────────────────────────────────────────────

/// Binds a context to a context-aware handler, yielding the plain shape.
///
/// This is the seam between the two worlds: the host framework calls
/// `serve(w, req)` and the stored context is supplied to the inner handler.
/// Used by chain finalization (with the chain's fixed context) and rebuilt
/// per request by the bridge (with whatever context is current).
pub(crate) struct ContextAdapter {
    pub(crate) cx: Context,
    pub(crate) handler: BoxedHandler,
}

impl PlainHandler for ContextAdapter {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        self.handler.serve(self.cx.clone(), w, req)
    }
}
