use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::constants::{self, env};
use crate::error::{BusError, BusResult};
use crate::execution::CommandOrdering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub ordering: CommandOrdering,
    pub initial_slot_capacity: usize,
    pub context_pool_capacity: usize,
    pub unobserved_channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            ordering: CommandOrdering::Parallel,
            initial_slot_capacity: constants::DEFAULT_SLOT_CAPACITY,
            context_pool_capacity: constants::DEFAULT_CONTEXT_POOL_CAPACITY,
            unobserved_channel_capacity: constants::DEFAULT_UNOBSERVED_CHANNEL_CAPACITY,
        }
    }
}

impl BusConfig {
    /// Defaults overlaid with `COMMAND_BUS_*` environment variables.
    pub fn from_env() -> BusResult<Self> {
        let mut config = Self::default();

        if let Ok(ordering) = std::env::var(env::ORDERING) {
            config.ordering = ordering.parse()?;
        }

        if let Ok(capacity) = std::env::var(env::INITIAL_SLOT_CAPACITY) {
            config.initial_slot_capacity = capacity.parse().map_err(|e| {
                BusError::Configuration(format!("Invalid initial_slot_capacity: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var(env::CONTEXT_POOL_CAPACITY) {
            config.context_pool_capacity = capacity.parse().map_err(|e| {
                BusError::Configuration(format!("Invalid context_pool_capacity: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var(env::UNOBSERVED_CHANNEL_CAPACITY) {
            config.unobserved_channel_capacity = capacity.parse().map_err(|e| {
                BusError::Configuration(format!("Invalid unobserved_channel_capacity: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Layered load: optional file (format by extension), then environment.
    pub fn load(path: Option<&Path>) -> BusResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!("Loading command bus configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(env::CONFIG_PREFIX).try_parsing(true),
        );

        let config: BusConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| BusError::Configuration(format!("Failed to load configuration: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BusResult<()> {
        let capacities = [
            ("initial_slot_capacity", self.initial_slot_capacity),
            ("context_pool_capacity", self.context_pool_capacity),
            ("unobserved_channel_capacity", self.unobserved_channel_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(BusError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
