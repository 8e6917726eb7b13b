//! Per-request execution context.
//!
//! A [`Context`] is an immutable derivation chain: every `with_*` call
//! returns a *child* context and leaves the parent untouched. Lookups walk
//! the chain from the newest derivation outward, so the nearest value for a
//! key shadows older ones. Cloning is cheap — one `Arc` bump — which is what
//! lets a context be handed to every stage of a middleware chain without
//! ceremony.
//!
//! Cancellation rides on [`CancellationToken`]: deriving with
//! [`Context::with_cancel`] hands back the token so the caller can cancel,
//! and child tokens are linked to their parents, so cancelling an outer
//! context cancels everything derived from it.
//!
//! Values are keyed by their *type*, the Rust analogue of Go-style private
//! context keys: define a private newtype, store it, and no other crate can
//! collide with (or read) your entry without naming your type.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A per-request, immutable, value-carrying context with cancellation.
///
/// ```rust
/// use weft::Context;
///
/// struct RequestId(u64);
///
/// let cx = Context::background().with_value(RequestId(7));
/// assert_eq!(cx.value::<RequestId>().map(|id| id.0), Some(7));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    node: Option<Arc<Node>>,
}

struct Node {
    parent: Context,
    entry: Entry,
}

enum Entry {
    Value {
        key: TypeId,
        value: Box<dyn Any + Send + Sync>,
    },
    Cancel(CancellationToken),
    Deadline(Instant),
}

impl Context {
    /// The empty root context: no values, no deadline, never cancelled.
    pub fn background() -> Self {
        Self { node: None }
    }

    /// Derives a child context carrying `value`, keyed by its type.
    ///
    /// A later `with_value` of the same type shadows this one for lookups on
    /// the child; this context is unaffected either way.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        self.derive(Entry::Value {
            key: TypeId::of::<T>(),
            value: Box::new(value),
        })
    }

    /// Looks up the nearest value of type `T` in the derivation chain.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        let mut node = self.node.as_deref();
        while let Some(n) = node {
            if let Entry::Value { key, value } = &n.entry {
                if *key == TypeId::of::<T>() {
                    return value.downcast_ref::<T>();
                }
            }
            node = n.parent.node.as_deref();
        }
        None
    }

    /// Derives a cancellable child context.
    ///
    /// The returned token cancels the child (and anything derived from it);
    /// if this context is itself cancellable, cancelling *it* also cancels
    /// the child, because the new token is linked as a child token.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = match self.cancel_token() {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        (self.derive(Entry::Cancel(token.clone())), token)
    }

    /// Derives a child context cancelled automatically at `deadline`.
    ///
    /// If an ancestor already has an earlier (or equal) deadline, no new
    /// timer is armed — the ancestor's timer will fire first and propagate.
    /// Must be called from within a tokio runtime: the timer is a spawned
    /// task that is dropped as soon as the token is cancelled by any path.
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancellationToken) {
        if self.deadline().is_some_and(|d| d <= deadline) {
            return self.with_cancel();
        }

        let (cx, token) = self.with_cancel();
        let cx = cx.derive(Entry::Deadline(deadline));

        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = timer.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => timer.cancel(),
            }
        });

        (cx, token)
    }

    /// [`with_deadline`](Context::with_deadline), relative to now.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancellationToken) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The effective deadline, if any ancestor set one.
    pub fn deadline(&self) -> Option<Instant> {
        let mut node = self.node.as_deref();
        while let Some(n) = node {
            if let Entry::Deadline(at) = n.entry {
                return Some(at);
            }
            node = n.parent.node.as_deref();
        }
        None
    }

    /// Whether this context (or any ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token().is_some_and(CancellationToken::is_cancelled)
    }

    /// Resolves when this context is cancelled. Pends forever on a context
    /// with no cancellation in its chain.
    pub async fn cancelled(&self) {
        match self.cancel_token() {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }

    fn cancel_token(&self) -> Option<&CancellationToken> {
        let mut node = self.node.as_deref();
        while let Some(n) = node {
            if let Entry::Cancel(token) = &n.entry {
                return Some(token);
            }
            node = n.parent.node.as_deref();
        }
        None
    }

    fn derive(&self, entry: Entry) -> Self {
        Self {
            node: Some(Arc::new(Node { parent: self.clone(), entry })),
        }
    }
}
