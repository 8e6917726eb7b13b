//! Ordered composition of handler wraps.
//!
//! A [`Chain`] is a value: one execution context plus an ordered sequence of
//! wraps (`Handler → Handler` transformations). Build it once at setup,
//! finalize it with [`Chain::end`] into a single
//! [`PlainHandler`](crate::PlainHandler) the host framework can invoke per
//! request, and reuse that handler across every
//! in-flight request — the chain itself holds no per-request state.
//!
//! # Nesting order
//!
//! Wraps are appended in declaration order and applied in reverse at
//! finalize time, so the *first* appended wrap ends up outermost:
//!
//! ```text
//! Chain::new(cx).append(logging).append(auth).end(Some(handler))
//!
//! request → logging → auth → handler → auth → logging → response
//! ```
//!
//! That matches how people read a middleware stack top to bottom.
//!
//! # Append is copy-on-grow
//!
//! [`Chain::append`] returns a *new* chain over fresh wrap storage. Two
//! chains never share a growable buffer, so appending to one can never leak
//! a wrap into a sibling that was finalized earlier or later.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::context::Context;
use crate::handler::{
    BoxFuture, BoxedHandler, BoxedPlainHandler, ContextAdapter, HandlerFn, Request,
};
use crate::writer::ResponseWriter;

/// A handler-to-handler transformation, stored in a chain.
pub type Wrap = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>;

/// An execution context plus an ordered wrap sequence.
#[derive(Clone)]
pub struct Chain {
    cx: Context,
    wraps: Vec<Wrap>,
}

impl Chain {
    /// A chain with no wraps, bound to `cx`. Add wraps with
    /// [`append`](Chain::append); calls chain naturally.
    pub fn new(cx: Context) -> Self {
        Self { cx, wraps: Vec::new() }
    }

    /// Returns a new chain with `wrap` appended.
    ///
    /// The receiver is unchanged, and the new chain gets its own wrap
    /// storage — no previously returned chain can observe this append.
    pub fn append<W>(&self, wrap: W) -> Self
    where
        W: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        let mut wraps = Vec::with_capacity(self.wraps.len() + 1);
        wraps.extend(self.wraps.iter().cloned());
        wraps.push(Arc::new(wrap));
        Self { cx: self.cx.clone(), wraps }
    }

    /// Finalizes the chain around `handler`.
    ///
    /// `None` propagates: no handler in, no handler out, regardless of how
    /// many wraps have accumulated. Otherwise the stored wraps are applied
    /// innermost-first (reverse append order) and the result is bound to the
    /// chain's context, yielding a handler the host framework can call with
    /// just a writer and a request.
    pub fn end(&self, handler: Option<BoxedHandler>) -> Option<BoxedPlainHandler> {
        let mut handler = handler?;

        for wrap in self.wraps.iter().rev() {
            handler = wrap(handler);
        }

        debug!(wraps = self.wraps.len(), "chain finalized");
        Some(Arc::new(ContextAdapter { cx: self.cx.clone(), handler }))
    }

    /// [`end`](Chain::end) for a bare function.
    ///
    /// `None` delegates straight to `end(None)`; otherwise `f` is adapted
    /// through [`HandlerFn`] first.
    pub fn end_fn<F>(&self, f: Option<F>) -> Option<BoxedPlainHandler>
    where
        F: for<'a> Fn(Context, &'a mut dyn ResponseWriter, &'a Request) -> BoxFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.end(f.map(|f| Arc::new(HandlerFn::new(f)) as BoxedHandler))
    }
}

// ── Post-handler context slot ─────────────────────────────────────────────────

/// A per-request mutable cell holding a [`Context`].
///
/// Context derivation only flows *down* the call stack: a handler that
/// derives a child context cannot hand it back to the wrap that called it.
/// The slot is the documented escape hatch — an outer wrap calls
/// [`init_phfc`] on the way in, an inner stage [`set`](ContextCell::set)s
/// the cell, and the outer wrap's post-return code [`get`](ContextCell::get)s
/// whatever context was established deepest.
///
/// Who writes to the cell is a caller-managed convention; the chain itself
/// never does.
#[derive(Clone)]
pub struct ContextCell(Arc<Mutex<Context>>);

impl ContextCell {
    /// The most recently stored context.
    pub fn get(&self) -> Context {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the stored context.
    pub fn set(&self, cx: Context) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = cx;
    }
}

/// Derives a context carrying a fresh [`ContextCell`], initialized with `cx`
/// itself (the context as of this call, before the derivation).
///
/// Call once per request, near the top of a chain. Each call creates an
/// independent cell, so concurrent requests over the same base chain never
/// share one.
pub fn init_phfc(cx: &Context) -> Context {
    cx.with_value(ContextCell(Arc::new(Mutex::new(cx.clone()))))
}

/// Looks up the cell stored by [`init_phfc`]. `None` means no ancestor of
/// `cx` ever initialized the slot.
pub fn get_phfc(cx: &Context) -> Option<ContextCell> {
    cx.value::<ContextCell>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Route(&'static str);

    #[test]
    fn slot_roundtrips_the_initialization_context() {
        let cx = Context::background().with_value(Route("/users"));
        let cx = init_phfc(&cx);

        let cell = get_phfc(&cx).expect("slot initialized");
        assert_eq!(cell.get().value::<Route>().map(|r| r.0), Some("/users"));
    }

    #[test]
    fn slot_miss_is_none() {
        assert!(get_phfc(&Context::background()).is_none());
    }

    #[test]
    fn inner_writes_are_visible_through_the_outer_context() {
        let outer = init_phfc(&Context::background());

        // An inner stage derives further and publishes through the cell.
        let inner = outer.with_value(Route("/login"));
        get_phfc(&inner).expect("slot inherited").set(inner.clone());

        // The outer stage still holds `outer`, but the cell has moved on.
        let seen = get_phfc(&outer).expect("slot initialized").get();
        assert_eq!(seen.value::<Route>().map(|r| r.0), Some("/login"));
    }
}
