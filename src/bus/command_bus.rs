//! Command bus: the public publish/subscribe/dispose surface.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::subscription::{Registration, Subscription};
use crate::command::Command;
use crate::config::BusConfig;
use crate::error::{BusError, BusResult};
use crate::execution::{
    AsyncSubscriber, CommandOrdering, DispatchCore, FirstInFirstOutOrdering, Interceptor,
    InterceptorChain, Subscriber,
};
use crate::logging::{log_bus_operation, log_error};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);
static GLOBAL_BUS: OnceLock<Bus> = OnceLock::new();

/// In-process command bus.
///
/// Publishers emit commands; an ordered chain of interceptors wraps dispatch;
/// every registered subscriber receives each command. `Bus` is a cheap handle:
/// clones share the same registrations and lifecycle.
///
/// # Examples
///
/// ```rust
/// use command_bus::{Bus, BusResult, Command, Subscriber};
/// use std::sync::Arc;
///
/// struct CharacterEnter;
/// impl Command for CharacterEnter {}
///
/// struct Presenter;
/// impl Subscriber for Presenter {
///     fn receive(&self, command: &dyn Command) -> BusResult<()> {
///         if command.is::<CharacterEnter>() {
///             println!("character entered");
///         }
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> BusResult<()> {
///     let bus = Bus::new();
///     let subscription = bus.subscribe(Arc::new(Presenter));
///
///     bus.publish(&CharacterEnter).await?;
///
///     subscription.dispose();
///     bus.dispose();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Bus {
    shared: Arc<BusShared>,
}

struct BusShared {
    id: u64,
    config: BusConfig,
    chain: InterceptorChain,
    core: DispatchCore,
    disposed: AtomicBool,
    unobserved: broadcast::Sender<UnobservedFailure>,
    uncancelled: CancellationToken,
}

impl Bus {
    /// Bus with default configuration (parallel ordering).
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Bus with the given ordering policy and otherwise default configuration.
    pub fn with_ordering(ordering: CommandOrdering) -> Self {
        Self::with_config(BusConfig {
            ordering,
            ..BusConfig::default()
        })
    }

    pub fn with_config(config: BusConfig) -> Self {
        let (unobserved, _) = broadcast::channel(config.unobserved_channel_capacity.max(1));
        let shared = BusShared {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            chain: InterceptorChain::new(
                config.initial_slot_capacity,
                config.context_pool_capacity,
            ),
            core: DispatchCore::new(config.initial_slot_capacity, config.context_pool_capacity),
            disposed: AtomicBool::new(false),
            unobserved,
            uncancelled: CancellationToken::new(),
            config,
        };
        let bus = Self {
            shared: Arc::new(shared),
        };

        if bus.shared.config.ordering == CommandOrdering::FirstInFirstOut {
            bus.filter(Arc::new(FirstInFirstOutOrdering::new()));
        }

        info!(
            bus_id = bus.id(),
            ordering = %bus.shared.config.ordering,
            "Command bus created"
        );
        bus
    }

    /// Opt-in process-wide bus, created on first use.
    pub fn global() -> &'static Bus {
        GLOBAL_BUS.get_or_init(Bus::new)
    }

    /// Process-unique identifier, used as the `bus_id` log field.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let key = self.shared.core.add_subscriber(subscriber);
        debug!(bus_id = self.id(), slot = key.index(), "Subscriber registered");
        Subscription::new(self.clone(), Registration::Sync(key))
    }

    pub fn subscribe_async(&self, subscriber: Arc<dyn AsyncSubscriber>) -> Subscription {
        let key = self.shared.core.add_async_subscriber(subscriber);
        debug!(
            bus_id = self.id(),
            slot = key.index(),
            "Async subscriber registered"
        );
        Subscription::new(self.clone(), Registration::Async(key))
    }

    /// Remove the first registration of this exact subscriber instance.
    ///
    /// Returns whether anything was removed; an absent subscriber is a no-op.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        self.shared.core.remove_subscriber(subscriber)
    }

    pub fn unsubscribe_async(&self, subscriber: &Arc<dyn AsyncSubscriber>) -> bool {
        self.shared.core.remove_async_subscriber(subscriber)
    }

    /// Clear every subscriber, async subscriber and interceptor.
    pub fn unsubscribe_all(&self) {
        self.shared.core.clear();
        self.shared.chain.clear();
        info!(bus_id = self.id(), "All subscribers and interceptors removed");
    }

    /// Append an interceptor to the end of the chain.
    pub fn filter(&self, interceptor: Arc<dyn Interceptor>) -> &Self {
        let name = interceptor.name();
        let key = self.shared.chain.add(interceptor);
        debug!(
            bus_id = self.id(),
            interceptor = name,
            slot = key.index(),
            "Interceptor registered"
        );
        self
    }

    /// Remove the first registration of this exact interceptor instance.
    pub fn remove_filter(&self, interceptor: &Arc<dyn Interceptor>) -> bool {
        self.shared.chain.remove(interceptor)
    }

    /// Publish with a token that is never cancelled.
    pub async fn publish(&self, command: &dyn Command) -> BusResult<()> {
        self.publish_with_cancellation(command, &self.shared.uncancelled)
            .await
    }

    /// Route `command` through the interceptor chain (if any) to every subscriber.
    ///
    /// Fails with [`BusError::Disposed`] on a disposed bus and with
    /// [`BusError::Cancelled`] if `cancel` has already fired, in both cases
    /// without running any interceptor or subscriber.
    pub async fn publish_with_cancellation(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
    ) -> BusResult<()> {
        if self.is_disposed() {
            warn!(
                bus_id = self.id(),
                command = command.command_name(),
                "Publish rejected: bus disposed"
            );
            return Err(BusError::Disposed);
        }
        if cancel.is_cancelled() {
            return Err(BusError::Cancelled);
        }

        debug!(
            bus_id = self.id(),
            command = command.command_name(),
            "Publishing command"
        );

        let shared = &self.shared;
        if shared.chain.is_empty() {
            shared.core.deliver(command, cancel).await
        } else {
            shared.chain.run(command, cancel, &shared.core).await
        }
    }

    /// Fire-and-forget publish.
    ///
    /// Failures are logged and sent to [`Bus::unobserved_failures`]; a panic in an
    /// interceptor or subscriber arrives there as a `SubscriberFailure`. Requires a
    /// running tokio runtime; without one the command is reported as an
    /// unobserved failure and dropped.
    pub fn enqueue<C: Command>(&self, command: C) {
        self.enqueue_with_cancellation(command, self.shared.uncancelled.clone());
    }

    pub fn enqueue_with_cancellation<C: Command>(&self, command: C, cancel: CancellationToken) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.report_unobserved(
                    command.command_name(),
                    BusError::Configuration(format!("No async runtime for enqueue: {e}")),
                );
                return;
            }
        };

        let bus = self.clone();
        handle.spawn(async move {
            let outcome = AssertUnwindSafe(bus.publish_with_cancellation(&command, &cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(BusError::subscriber(
                        command.command_name(),
                        format!("panicked: {}", panic_message(payload.as_ref())),
                    ))
                });
            if let Err(error) = outcome {
                bus.report_unobserved(command.command_name(), error);
            }
        });
    }

    /// Receiver for failures of fire-and-forget publishes.
    pub fn unobserved_failures(&self) -> broadcast::Receiver<UnobservedFailure> {
        self.shared.unobserved.subscribe()
    }

    /// Reject new publishes and clear every registration. Idempotent.
    ///
    /// Publishes already past the disposed check run to completion; callers
    /// queued on a FIFO gate fail with [`BusError::Disposed`].
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        for interceptor in self.shared.chain.clear() {
            interceptor.on_bus_disposed();
        }
        self.shared.core.clear();

        log_bus_operation("dispose", self.id(), None, "completed", None);
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            bus_id: self.id(),
            subscribers: self.shared.core.subscriber_count(),
            async_subscribers: self.shared.core.async_subscriber_count(),
            interceptors: self.shared.chain.len(),
            disposed: self.is_disposed(),
        }
    }

    pub(crate) fn remove_registration(&self, registration: Registration) -> bool {
        match registration {
            Registration::Sync(key) => self.shared.core.remove_subscriber_key(key),
            Registration::Async(key) => self.shared.core.remove_async_subscriber_key(key),
        }
    }

    fn report_unobserved(&self, command: &'static str, error: BusError) {
        log_error(
            "bus",
            "enqueue",
            &error.to_string(),
            Some(&format!("bus_id={} command={command}", self.id())),
        );
        // No receivers is fine; the failure has already been logged.
        let _ = self.shared.unobserved.send(UnobservedFailure {
            bus_id: self.id(),
            command,
            error,
            occurred_at: Utc::now(),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.shared.id)
            .field("ordering", &self.shared.config.ordering)
            .field("chain", &self.shared.chain)
            .field("core", &self.shared.core)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Failure of a publish nobody awaited.
#[derive(Debug, Clone)]
pub struct UnobservedFailure {
    pub bus_id: u64,
    pub command: &'static str,
    pub error: BusError,
    pub occurred_at: DateTime<Utc>,
}

/// Snapshot of a bus's registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusStats {
    pub bus_id: u64,
    pub subscribers: usize,
    pub async_subscribers: usize,
    pub interceptors: usize,
    pub disposed: bool,
}
