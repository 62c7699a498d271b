//! # Routing
//!
//! Explicit per-handler route tables. A [`RouteMap`] lists which command types
//! a handler instance accepts and the function invoked for each; mapping it to
//! a bus yields a [`MappedRoutes`] handle that removes every registration at
//! once.

pub mod route_map;

pub use route_map::{MappedRoutes, RouteMap};
