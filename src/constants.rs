//! # Constants
//!
//! Defaults and environment variable names shared by configuration, logging and
//! the bus itself.

/// Initial slot count for each subscriber and interceptor registry.
pub const DEFAULT_SLOT_CAPACITY: usize = 8;

/// Maximum number of idle publish contexts / delivery buffers kept per bus.
pub const DEFAULT_CONTEXT_POOL_CAPACITY: usize = 16;

/// Capacity of the broadcast channel carrying unobserved `enqueue` failures.
pub const DEFAULT_UNOBSERVED_CHANNEL_CAPACITY: usize = 64;

pub mod env {
    /// Prefix used by layered configuration loading.
    pub const CONFIG_PREFIX: &str = "COMMAND_BUS";

    pub const ORDERING: &str = "COMMAND_BUS_ORDERING";
    pub const INITIAL_SLOT_CAPACITY: &str = "COMMAND_BUS_INITIAL_SLOT_CAPACITY";
    pub const CONTEXT_POOL_CAPACITY: &str = "COMMAND_BUS_CONTEXT_POOL_CAPACITY";
    pub const UNOBSERVED_CHANNEL_CAPACITY: &str = "COMMAND_BUS_UNOBSERVED_CHANNEL_CAPACITY";

    pub const ENVIRONMENT: &str = "COMMAND_BUS_ENV";
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const LOG_FORMAT: &str = "COMMAND_BUS_LOG_FORMAT";
}
