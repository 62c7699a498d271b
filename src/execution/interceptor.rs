//! # Interceptor Chain
//!
//! Ordered middleware wrapped around the dispatch of a command ("onion" model).
//!
//! ## Overview
//!
//! ```text
//! publish ─► A.before ─► B.before ─► terminal (DispatchCore) ─► B.after ─► A.after
//! ```
//!
//! Each interceptor receives a [`Next`] continuation standing for "the rest of
//! the chain". It may act before or after running it, skip it entirely
//! (short-circuit), run it more than once (fan-out) or wrap its failure.
//!
//! ## Publish context
//!
//! When a publish enters the chain it rents a [`PublishContext`] from the
//! chain's pool and snapshots the live interceptors into it. The snapshot is
//! what the continuations walk, so registrations added or removed mid-publish
//! never disturb a traversal already underway. The context goes back to the
//! pool on every exit path.
//!
//! A `Next` carries its own position: positions only ever increase along a
//! traversal path, and each path reaches the terminal at most once.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::pool::{ContextPool, Poolable};
use crate::command::Command;
use crate::error::BusResult;
use crate::registry::{SlotKey, SlotRegistry};

/// Middleware wrapped around command dispatch.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Observe, transform or short-circuit the dispatch of `command`.
    async fn invoke(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> BusResult<()>;

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once for each bus this interceptor is registered on when that bus
    /// is disposed.
    fn on_bus_disposed(&self) {}
}

/// Terminal stage reached once every interceptor has called onward.
pub trait ChainTerminal: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a dyn Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>>;
}

/// Continuation representing the remainder of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    position: usize,
    terminal: &'a dyn ChainTerminal,
}

impl<'a> Next<'a> {
    /// Continuation starting at the first of `interceptors`.
    pub fn new(interceptors: &'a [Arc<dyn Interceptor>], terminal: &'a dyn ChainTerminal) -> Self {
        Self {
            interceptors,
            position: 0,
            terminal,
        }
    }

    /// Run the rest of the chain, ending in the terminal stage.
    pub fn run<'b>(
        &self,
        command: &'b dyn Command,
        cancel: &'b CancellationToken,
    ) -> BoxFuture<'b, BusResult<()>>
    where
        'a: 'b,
    {
        match self.interceptors.get(self.position) {
            Some(interceptor) => {
                trace!(
                    interceptor = interceptor.name(),
                    position = self.position,
                    command = command.command_name(),
                    "Entering interceptor"
                );
                let next = Next {
                    interceptors: self.interceptors,
                    position: self.position + 1,
                    terminal: self.terminal,
                };
                interceptor.invoke(command, cancel, next)
            }
            None => self.terminal.run(command, cancel),
        }
    }

    /// Interceptors still ahead of this continuation.
    pub fn remaining(&self) -> usize {
        self.interceptors.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Pooled per-publish traversal state.
#[derive(Default)]
pub struct PublishContext {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Poolable for PublishContext {
    fn reset(&mut self) {
        self.interceptors.clear();
    }
}

/// Registered interceptors plus the pool of traversal contexts.
pub struct InterceptorChain {
    interceptors: RwLock<SlotRegistry<Arc<dyn Interceptor>>>,
    contexts: ContextPool<PublishContext>,
}

impl InterceptorChain {
    pub fn new(slot_capacity: usize, pool_capacity: usize) -> Self {
        Self {
            interceptors: RwLock::new(SlotRegistry::with_capacity(slot_capacity)),
            contexts: ContextPool::new(pool_capacity),
        }
    }

    pub fn add(&self, interceptor: Arc<dyn Interceptor>) -> SlotKey {
        self.interceptors.write().add(interceptor)
    }

    /// Remove the first registration of this exact instance.
    pub fn remove(&self, interceptor: &Arc<dyn Interceptor>) -> bool {
        self.interceptors
            .write()
            .remove_first(|registered| same_instance(registered, interceptor))
            .is_some()
    }

    /// Drop every registration, returning what was registered.
    pub fn clear(&self) -> Vec<Arc<dyn Interceptor>> {
        let mut interceptors = self.interceptors.write();
        let removed = interceptors.iter().cloned().collect();
        interceptors.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.interceptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.read().is_empty()
    }

    /// Idle publish contexts waiting in the pool.
    pub fn idle_contexts(&self) -> usize {
        self.contexts.idle()
    }

    /// Traverse the chain for one publish, finishing in `terminal`.
    pub async fn run(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
        terminal: &dyn ChainTerminal,
    ) -> BusResult<()> {
        let mut context = self.contexts.rent();
        context
            .interceptors
            .extend(self.interceptors.read().iter().cloned());

        Next::new(&context.interceptors, terminal)
            .run(command, cancel)
            .await
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.len())
            .field("contexts", &self.contexts)
            .finish()
    }
}

/// Identity comparison for shared capabilities, ignoring vtable pointers.
pub(crate) fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
