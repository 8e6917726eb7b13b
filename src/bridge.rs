//! Compatibility bridge for context-unaware middleware.
//!
//! Plenty of middleware is written against the host framework's plain
//! handler shape and knows nothing about execution contexts. [`bridge`]
//! lifts such a `PlainHandler → PlainHandler` transformation into a wrap a
//! [`Chain`](crate::Chain) can hold, without the legacy code ever seeing a
//! context and without the handlers inside it losing theirs.

use std::sync::Arc;

use tracing::trace;

use crate::context::Context;
use crate::handler::{
    BoxFuture, BoxedHandler, BoxedPlainHandler, ContextAdapter, Handler, Request,
};
use crate::writer::ResponseWriter;

type LegacyWrap = Arc<dyn Fn(BoxedPlainHandler) -> BoxedPlainHandler + Send + Sync>;

/// A context-aware handler standing in for a legacy middleware stage.
///
/// Each invocation threads the *current* context through: the inner handler
/// is bound to it via a [`ContextAdapter`], that plain adapter is run
/// through the legacy transformation, and the resulting plain handler is
/// served. The legacy code sees only plain handlers; the context rides
/// around it inside the adapter.
struct BridgedHandler {
    legacy: LegacyWrap,
    next: BoxedHandler,
}

impl Handler for BridgedHandler {
    fn serve<'a>(
        &'a self,
        cx: Context,
        w: &'a mut dyn ResponseWriter,
        req: &'a Request,
    ) -> BoxFuture<'a> {
        trace!("threading context around legacy middleware");

        // Rebuilt per request: the adapter must capture whatever context is
        // in effect right now, not the one from setup time.
        let adapter: BoxedPlainHandler = Arc::new(ContextAdapter {
            cx,
            handler: Arc::clone(&self.next),
        });
        let plain = (self.legacy)(adapter);

        Box::pin(async move { plain.serve(w, req).await })
    }
}

/// Lifts a plain-handler middleware into a context-aware wrap.
///
/// The returned wrap can be [`append`](crate::Chain::append)ed like any
/// other:
///
/// ```rust
/// use std::sync::Arc;
///
/// use http::HeaderValue;
/// use weft::{
///     bridge, BoxFuture, BoxedPlainHandler, Chain, Context, PlainHandler, Request,
///     ResponseWriter,
/// };
///
/// // Context-unaware middleware, written against the plain shape.
/// struct ServerHeader(BoxedPlainHandler);
///
/// impl PlainHandler for ServerHeader {
///     fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
///         Box::pin(async move {
///             w.headers_mut().insert("server", HeaderValue::from_static("weft"));
///             self.0.serve(w, req).await
///         })
///     }
/// }
///
/// fn legacy(next: BoxedPlainHandler) -> BoxedPlainHandler {
///     Arc::new(ServerHeader(next))
/// }
///
/// let chain = Chain::new(Context::background()).append(bridge(legacy));
/// # let _ = chain;
/// ```
pub fn bridge<L>(legacy: L) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static
where
    L: Fn(BoxedPlainHandler) -> BoxedPlainHandler + Send + Sync + 'static,
{
    let legacy: LegacyWrap = Arc::new(legacy);
    move |next: BoxedHandler| {
        Arc::new(BridgedHandler { legacy: Arc::clone(&legacy), next }) as BoxedHandler
    }
}
