//! Disposal handle for a single registration.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::command_bus::Bus;
use crate::registry::SlotKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    Sync(SlotKey),
    Async(SlotKey),
}

/// Handle owning one (bus, registration) pair.
///
/// [`Subscription::dispose`] removes exactly this registration, even when the
/// same subscriber instance was registered several times. Disposing again is a
/// no-op. Dropping the handle does not unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    bus: Bus,
    registration: Registration,
    disposed: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(bus: Bus, registration: Registration) -> Self {
        Self {
            bus,
            registration,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = self.bus.remove_registration(self.registration);
        debug!(
            bus_id = self.bus.id(),
            removed = removed,
            "Subscription disposed"
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether the subscriber behind this handle is asynchronous.
    pub fn is_async(&self) -> bool {
        matches!(self.registration, Registration::Async(_))
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}
