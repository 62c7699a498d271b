//! # Fan-Out Relay
//!
//! Interceptor that forwards every command to a set of child buses, composing a
//! tree of buses under a single publish call.
//!
//! Forwarding runs concurrently with the rest of the local chain; the relay
//! settles once the local chain and every child publish have settled, and
//! reports all failures together.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::aggregator::Aggregator;
use super::interceptor::{Interceptor, Next};
use crate::bus::Bus;
use crate::command::Command;
use crate::error::BusResult;

#[derive(Debug, Default)]
pub struct FanOutRelay {
    children: RwLock<Vec<Bus>>,
}

impl FanOutRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: impl IntoIterator<Item = Bus>) -> Self {
        Self {
            children: RwLock::new(children.into_iter().collect()),
        }
    }

    /// Append a child bus; forwarding follows insertion order.
    pub fn add(&self, child: Bus) -> &Self {
        self.children.write().push(child);
        self
    }

    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }

    pub fn children(&self) -> Vec<Bus> {
        self.children.read().clone()
    }
}

#[async_trait]
impl Interceptor for FanOutRelay {
    async fn invoke(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> BusResult<()> {
        let children = self.children();
        debug!(
            command = command.command_name(),
            children = children.len(),
            "Fanning out command"
        );

        let mut aggregator = Aggregator::new();
        aggregator.push(next.run(command, cancel));
        for child in &children {
            aggregator.push(Box::pin(child.publish_with_cancellation(command, cancel)));
        }
        aggregator.wait_all().await
    }

    fn name(&self) -> &'static str {
        "fan_out"
    }
}
