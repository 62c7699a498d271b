//! # Ordering Policies
//!
//! - [`CommandOrdering::Parallel`] (default): nothing is installed; independent
//!   publishes on one bus may traverse the chain concurrently.
//! - [`CommandOrdering::FirstInFirstOut`]: a [`FirstInFirstOutOrdering`]
//!   interceptor serialises chain traversal behind a fair gate, so publish
//!   *N+1* starts only after publish *N* has fully settled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::interceptor::{Interceptor, Next};
use crate::command::Command;
use crate::error::{BusError, BusResult};

/// How concurrent publishes on one bus relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOrdering {
    #[default]
    #[serde(alias = "concurrent")]
    Parallel,
    #[serde(alias = "fifo")]
    FirstInFirstOut,
}

impl FromStr for CommandOrdering {
    type Err = BusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parallel" | "concurrent" => Ok(CommandOrdering::Parallel),
            "fifo" | "first_in_first_out" | "firstinfirstout" => {
                Ok(CommandOrdering::FirstInFirstOut)
            }
            other => Err(BusError::Configuration(format!(
                "Unknown command ordering '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for CommandOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOrdering::Parallel => write!(f, "parallel"),
            CommandOrdering::FirstInFirstOut => write!(f, "first_in_first_out"),
        }
    }
}

/// Serialises publishes through a single-permit fair gate.
///
/// Use one instance per bus. Waiters queued on the gate fail with
/// [`BusError::Disposed`] once the bus is disposed, and with
/// [`BusError::Cancelled`] if their own token fires first.
#[derive(Debug)]
pub struct FirstInFirstOutOrdering {
    gate: Semaphore,
}

impl FirstInFirstOutOrdering {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(1),
        }
    }

    /// Whether the gate has been closed by a bus disposal.
    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }
}

impl Default for FirstInFirstOutOrdering {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interceptor for FirstInFirstOutOrdering {
    async fn invoke(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> BusResult<()> {
        let _permit = tokio::select! {
            permit = self.gate.acquire() => permit.map_err(|_| BusError::Disposed)?,
            _ = cancel.cancelled() => return Err(BusError::Cancelled),
        };
        next.run(command, cancel).await
    }

    fn name(&self) -> &'static str {
        "first_in_first_out"
    }

    fn on_bus_disposed(&self) {
        debug!("Closing FIFO ordering gate");
        self.gate.close();
    }
}
