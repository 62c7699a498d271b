//! # Command Bus
//!
//! The router that composes the slot registries, the interceptor chain and the
//! dispatch core into the end-to-end publish pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Bus (handle)                         │
//! │  subscribe / subscribe_async / unsubscribe / filter          │
//! │  publish / enqueue / dispose                                 │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//! ┌──────────────────────────┐      ┌──────────────────────────────┐
//! │ InterceptorChain         │ ───► │ DispatchCore                  │
//! │ SlotRegistry<Interceptor>│      │ SlotRegistry<Subscriber>      │
//! │ pooled PublishContext    │      │ SlotRegistry<AsyncSubscriber> │
//! └──────────────────────────┘      └──────────────────────────────┘
//! ```

mod command_bus;
mod subscription;

pub use command_bus::{Bus, BusStats, UnobservedFailure};
pub use subscription::Subscription;
