//! # Dispatch Core
//!
//! Terminal stage of every publish: hands the command to each registered
//! subscriber.
//!
//! ## Delivery algorithm
//!
//! 1. Synchronous subscribers run in slot order on the caller's task. The first
//!    failure stops the phase; later sync subscribers and every async
//!    subscriber are skipped for that publish.
//! 2. Async subscribers are started together and collected into an
//!    [`Aggregator`], which waits for every one of them before reporting.
//!
//! Subscriber snapshots live in a rented [`DeliveryBuffers`] value that is
//! cleared and returned to the pool on every exit path, so nothing from one
//! delivery leaks into the next and concurrent publishes never share a buffer.

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::aggregator::Aggregator;
use super::interceptor::{same_instance, ChainTerminal};
use super::pool::{ContextPool, Poolable};
use crate::command::Command;
use crate::error::BusResult;
use crate::registry::{SlotKey, SlotRegistry};

/// Synchronous recipient of commands. Must not block the caller indefinitely.
pub trait Subscriber: Send + Sync {
    fn receive(&self, command: &dyn Command) -> BusResult<()>;
}

/// Asynchronous recipient of commands.
///
/// Honouring `cancel` is the subscriber's own responsibility; the bus never
/// interrupts a subscriber that ignores it.
#[async_trait]
pub trait AsyncSubscriber: Send + Sync {
    async fn receive_async(&self, command: &dyn Command, cancel: &CancellationToken)
        -> BusResult<()>;
}

/// Per-delivery subscriber snapshots.
#[derive(Default)]
pub struct DeliveryBuffers {
    subscribers: Vec<Arc<dyn Subscriber>>,
    async_subscribers: Vec<Arc<dyn AsyncSubscriber>>,
}

impl Poolable for DeliveryBuffers {
    fn reset(&mut self) {
        self.subscribers.clear();
        self.async_subscribers.clear();
    }
}

/// Subscriber registries plus the delivery algorithm.
pub struct DispatchCore {
    subscribers: RwLock<SlotRegistry<Arc<dyn Subscriber>>>,
    async_subscribers: RwLock<SlotRegistry<Arc<dyn AsyncSubscriber>>>,
    buffers: ContextPool<DeliveryBuffers>,
}

impl DispatchCore {
    pub fn new(slot_capacity: usize, pool_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(SlotRegistry::with_capacity(slot_capacity)),
            async_subscribers: RwLock::new(SlotRegistry::with_capacity(slot_capacity)),
            buffers: ContextPool::new(pool_capacity),
        }
    }

    pub fn add_subscriber(&self, subscriber: Arc<dyn Subscriber>) -> SlotKey {
        self.subscribers.write().add(subscriber)
    }

    pub fn add_async_subscriber(&self, subscriber: Arc<dyn AsyncSubscriber>) -> SlotKey {
        self.async_subscribers.write().add(subscriber)
    }

    pub fn remove_subscriber(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        self.subscribers
            .write()
            .remove_first(|registered| same_instance(registered, subscriber))
            .is_some()
    }

    pub fn remove_async_subscriber(&self, subscriber: &Arc<dyn AsyncSubscriber>) -> bool {
        self.async_subscribers
            .write()
            .remove_first(|registered| same_instance(registered, subscriber))
            .is_some()
    }

    pub fn remove_subscriber_key(&self, key: SlotKey) -> bool {
        self.subscribers.write().remove_key(key).is_some()
    }

    pub fn remove_async_subscriber_key(&self, key: SlotKey) -> bool {
        self.async_subscribers.write().remove_key(key).is_some()
    }

    pub fn clear(&self) {
        self.subscribers.write().clear();
        self.async_subscribers.write().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn async_subscriber_count(&self) -> usize {
        self.async_subscribers.read().len()
    }

    /// Idle delivery buffers waiting in the pool.
    pub fn idle_buffers(&self) -> usize {
        self.buffers.idle()
    }

    /// Deliver `command` to every live subscriber.
    pub async fn deliver(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
    ) -> BusResult<()> {
        let mut buffers = self.buffers.rent();
        buffers
            .subscribers
            .extend(self.subscribers.read().iter().cloned());
        buffers
            .async_subscribers
            .extend(self.async_subscribers.read().iter().cloned());

        debug!(
            command = command.command_name(),
            subscribers = buffers.subscribers.len(),
            async_subscribers = buffers.async_subscribers.len(),
            "Delivering command"
        );

        for subscriber in &buffers.subscribers {
            subscriber.receive(command)?;
        }

        if buffers.async_subscribers.is_empty() {
            return Ok(());
        }

        let mut aggregator = Aggregator::new();
        aggregator.reset(
            buffers
                .async_subscribers
                .iter()
                .map(|subscriber| subscriber.receive_async(command, cancel)),
        );
        aggregator.wait_all().await
    }
}

impl ChainTerminal for DispatchCore {
    fn run<'a>(
        &'a self,
        command: &'a dyn Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>> {
        Box::pin(self.deliver(command, cancel))
    }
}

impl std::fmt::Debug for DispatchCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCore")
            .field("subscribers", &self.subscriber_count())
            .field("async_subscribers", &self.async_subscriber_count())
            .field("buffers", &self.buffers)
            .finish()
    }
}

/// Already-settled completion, for terminals with nothing left to await.
pub(crate) fn completed<'a>(result: BusResult<()>) -> BoxFuture<'a, BusResult<()>> {
    Box::pin(future::ready(result))
}
