//! # weft
//!
//! Ordered middleware composition for context-aware HTTP handlers.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! The host framework owns the transport, the routing, and the per-request
//! scheduling. weft owns exactly one thing: assembling an ordered sequence
//! of handler wraps, plus one execution context, into a single handler the
//! host can invoke — with the context threaded through every stage.
//!
//! What the host framework already owns — weft intentionally ignores:
//!
//! - **Listening and connections** — the server that calls the handler
//! - **Routing** — which chain a request reaches
//! - **Concrete middleware** — logging, auth, rate limits are the caller's
//!
//! What's left for weft — the only part that changes between applications:
//!
//! - [`Chain`] — append wraps in declaration order, finalize once, reuse
//!   across requests; first-appended wrap runs outermost
//! - [`Context`] — immutable, value-carrying, cancellable, derived per
//!   request and passed to every stage
//! - [`bridge`] — drop context-unaware middleware into the middle of a
//!   chain without it noticing
//! - [`init_phfc`] / [`get_phfc`] — let post-return code in outer wraps
//!   observe contexts established deeper in the chain
//!
//! ## Quick start
//!
//! ```rust
//! use bytes::Bytes;
//! use weft::{BoxFuture, Chain, Context, Recorder, Request, ResponseWriter};
//!
//! fn hello<'a>(
//!     _cx: Context,
//!     w: &'a mut dyn ResponseWriter,
//!     _req: &'a Request,
//! ) -> BoxFuture<'a> {
//!     Box::pin(async move { w.write(b"hello") })
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let chain = Chain::new(Context::background());
//! let handler = chain.end_fn(Some(hello)).expect("handler supplied");
//!
//! let req = http::Request::builder().body(Bytes::new()).unwrap();
//! let mut rec = Recorder::new();
//! handler.serve(&mut rec, &req).await;
//!
//! assert_eq!(rec.body(), b"hello");
//! # }
//! ```

mod bridge;
mod chain;
mod context;
mod handler;
mod writer;

pub use bridge::bridge;
pub use chain::{get_phfc, init_phfc, Chain, ContextCell, Wrap};
pub use context::Context;
pub use handler::{
    BoxFuture, BoxedHandler, BoxedPlainHandler, Handler, HandlerFn, PlainHandler,
    PlainHandlerFn, Request,
};
pub use writer::{Recorder, ResponseWriter};

// Cancellation is tokio-util's; re-exported so callers of
// `Context::with_cancel` don't need the dependency themselves.
pub use tokio_util::sync::CancellationToken;
