#![allow(clippy::doc_markdown)] // Allow technical terms like FIFO, TypeId in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Command Bus
//!
//! In-process command bus: publishers hand typed commands to a [`Bus`], which
//! routes them through an interceptor pipeline to every registered subscriber
//! and reports a single combined outcome.
//!
//! ## Overview
//!
//! - **Typed routing**: subscribers receive `&dyn Command` and select the
//!   commands they care about by runtime type.
//! - **Sync and async subscribers**: synchronous subscribers run inline and fail
//!   fast; asynchronous ones run concurrently and are awaited together.
//! - **Interceptor chain**: ordered middleware that can observe, wrap or
//!   short-circuit every publish.
//! - **Ordering policies**: unordered parallel dispatch, or first-in-first-out.
//! - **Fan-out**: relay every publish to a set of child buses.
//! - **Route tables**: bind one handler instance to many command types at once.
//!
//! ## Module Organization
//!
//! - [`bus`] - Bus facade, subscriptions and lifecycle
//! - [`command`] - The `Command` capability and runtime type routing
//! - [`execution`] - Interceptor chain, dispatch core, aggregation and ordering
//! - [`registry`] - Generation-tagged slot registry
//! - [`routing`] - Per-handler route tables
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use command_bus::{Bus, BusResult, Command, Subscriber};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Ping;
//! impl Command for Ping {}
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl Subscriber for Counter {
//!     fn receive(&self, command: &dyn Command) -> BusResult<()> {
//!         if command.is::<Ping>() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> BusResult<()> {
//! let bus = Bus::new();
//! let counter = Arc::new(Counter::default());
//! let subscription = bus.subscribe(counter.clone());
//!
//! bus.publish(&Ping).await?;
//! subscription.dispose();
//! bus.publish(&Ping).await?;
//!
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests live next to each module; end-to-end pipeline, ordering, fan-out
//! and routing scenarios live under `tests/`.

pub mod bus;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod registry;
pub mod routing;

pub use bus::{Bus, BusStats, Subscription, UnobservedFailure};
pub use command::Command;
pub use config::BusConfig;
pub use error::{BusError, BusResult, SharedError};
pub use execution::{
    Aggregator, AsyncSubscriber, ChainTerminal, CommandOrdering, DispatchCore, FanOutRelay,
    FirstInFirstOutOrdering, Interceptor, InterceptorChain, Next, Subscriber,
};
pub use registry::{SlotKey, SlotRegistry};
pub use routing::{MappedRoutes, RouteMap};

// Re-exported so subscribers and interceptors can name the token type without a
// direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
