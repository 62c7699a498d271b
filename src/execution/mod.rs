//! # Execution Pipeline
//!
//! Everything a publish passes through between the bus entry point and the
//! subscribers.
//!
//! ```text
//! Bus::publish
//!     │
//!     ├─ no interceptors ──────────────────────────────┐
//!     ▼                                                 ▼
//! InterceptorChain (pooled PublishContext) ──────► DispatchCore
//!   FirstInFirstOutOrdering / FanOutRelay / user      │ sync subscribers (fail fast)
//!                                                     │ async subscribers
//!                                                     ▼
//!                                                 Aggregator (wait for all)
//! ```

pub mod aggregator;
pub mod dispatch;
pub mod fan_out;
pub mod interceptor;
pub mod ordering;
pub mod pool;

pub use aggregator::{Aggregator, Completion};
pub use dispatch::{AsyncSubscriber, DeliveryBuffers, DispatchCore, Subscriber};
pub use fan_out::FanOutRelay;
pub use interceptor::{ChainTerminal, Interceptor, InterceptorChain, Next, PublishContext};
pub use ordering::{CommandOrdering, FirstInFirstOutOrdering};
pub use pool::{ContextPool, Poolable, Pooled};
