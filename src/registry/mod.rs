//! # Registry Infrastructure
//!
//! Storage for bus registrations.
//!
//! ## Available Registries
//!
//! - **SlotRegistry**: arena of reusable slots with generation-checked keys,
//!   backing the subscriber, async-subscriber and interceptor lists of every bus

pub mod slot_registry;

pub use slot_registry::{SlotKey, SlotRegistry};
