//! # Route Map
//!
//! Explicit registration table binding one handler instance to the commands it
//! handles.
//!
//! ## Overview
//!
//! Each route is `(command type, handler fn, interceptor stack)`. Type-level
//! default interceptors added with [`RouteMap::filter`] run first, then the
//! route's own interceptors, then the handler function.
//!
//! [`RouteMap::map_to`] turns the table into bus subscriptions:
//!
//! - sync routes without interceptors share one synchronous subscriber;
//! - async routes, and any route with interceptors, share one async subscriber
//!   that runs each matching route through its own chain.
//!
//! Commands without a matching route are ignored by the table.
//!
//! ## Usage
//!
//! ```rust
//! use command_bus::routing::RouteMap;
//! use command_bus::{Bus, BusResult, Command};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! struct Deposit(i32);
//! impl Command for Deposit {}
//!
//! #[derive(Default)]
//! struct Account {
//!     balance: AtomicI32,
//! }
//!
//! impl Account {
//!     fn on_deposit(&self, command: &Deposit) -> BusResult<()> {
//!         self.balance.fetch_add(command.0, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> BusResult<()> {
//! let bus = Bus::new();
//! let account = Arc::new(Account::default());
//! let routes = RouteMap::new(Arc::clone(&account)).on(Account::on_deposit);
//!
//! let mapped = routes.map_to(&bus);
//! bus.publish(&Deposit(5)).await?;
//! mapped.unmap_routes();
//!
//! assert_eq!(account.balance.load(Ordering::SeqCst), 5);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::bus::{Bus, Subscription};
use crate::command::Command;
use crate::error::BusResult;
use crate::execution::dispatch::completed;
use crate::execution::{
    Aggregator, AsyncSubscriber, ChainTerminal, Interceptor, Next, Subscriber,
};

type SyncAction<H> = Arc<dyn Fn(&H, &dyn Command) -> BusResult<()> + Send + Sync>;
type AsyncAction<H> = Arc<dyn AsyncRouteFn<H>>;

/// Type-erased async handler function.
trait AsyncRouteFn<H>: Send + Sync {
    fn call<'a>(
        &'a self,
        target: &'a H,
        command: &'a dyn Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>>;
}

struct TypedAsyncRoute<C, F> {
    handler: F,
    _command: PhantomData<fn(&C)>,
}

impl<H, C, F> AsyncRouteFn<H> for TypedAsyncRoute<C, F>
where
    C: Command,
    F: for<'a> Fn(&'a H, &'a C, &'a CancellationToken) -> BoxFuture<'a, BusResult<()>>
        + Send
        + Sync,
{
    fn call<'a>(
        &'a self,
        target: &'a H,
        command: &'a dyn Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>> {
        match command.downcast_ref::<C>() {
            Some(command) => (self.handler)(target, command, cancel),
            None => completed(Ok(())),
        }
    }
}

enum RouteAction<H> {
    Sync(SyncAction<H>),
    Async(AsyncAction<H>),
}

impl<H> Clone for RouteAction<H> {
    fn clone(&self) -> Self {
        match self {
            RouteAction::Sync(action) => RouteAction::Sync(Arc::clone(action)),
            RouteAction::Async(action) => RouteAction::Async(Arc::clone(action)),
        }
    }
}

struct Route<H> {
    command_type: TypeId,
    command_name: &'static str,
    action: RouteAction<H>,
    filters: Vec<Arc<dyn Interceptor>>,
}

impl<H> Clone for Route<H> {
    fn clone(&self) -> Self {
        Self {
            command_type: self.command_type,
            command_name: self.command_name,
            action: self.action.clone(),
            filters: self.filters.clone(),
        }
    }
}

/// Registration table for one handler instance.
pub struct RouteMap<H> {
    handler: Arc<H>,
    default_filters: Vec<Arc<dyn Interceptor>>,
    routes: Vec<Route<H>>,
}

impl<H: Send + Sync + 'static> RouteMap<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            default_filters: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Type-level interceptor applied to every route, ahead of per-route ones.
    pub fn filter(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.default_filters.push(interceptor);
        self
    }

    /// Synchronous route for commands of type `C`.
    pub fn on<C: Command>(self, handler: fn(&H, &C) -> BusResult<()>) -> Self {
        self.on_with(handler, Vec::new())
    }

    /// Synchronous route wrapped in its own interceptors.
    pub fn on_with<C: Command>(
        mut self,
        handler: fn(&H, &C) -> BusResult<()>,
        filters: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        let action: SyncAction<H> = Arc::new(move |target: &H, command: &dyn Command| {
            match command.downcast_ref::<C>() {
                Some(command) => handler(target, command),
                None => Ok(()),
            }
        });
        self.push_route::<C>(RouteAction::Sync(action), filters);
        self
    }

    /// Asynchronous route for commands of type `C`.
    pub fn on_async<C, F>(self, handler: F) -> Self
    where
        C: Command,
        F: for<'a> Fn(&'a H, &'a C, &'a CancellationToken) -> BoxFuture<'a, BusResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.on_async_with(handler, Vec::new())
    }

    /// Asynchronous route wrapped in its own interceptors.
    pub fn on_async_with<C, F>(mut self, handler: F, filters: Vec<Arc<dyn Interceptor>>) -> Self
    where
        C: Command,
        F: for<'a> Fn(&'a H, &'a C, &'a CancellationToken) -> BoxFuture<'a, BusResult<()>>
            + Send
            + Sync
            + 'static,
    {
        let action: AsyncAction<H> = Arc::new(TypedAsyncRoute {
            handler,
            _command: PhantomData::<fn(&C)>,
        });
        self.push_route::<C>(RouteAction::Async(action), filters);
        self
    }

    fn push_route<C: Command>(
        &mut self,
        action: RouteAction<H>,
        filters: Vec<Arc<dyn Interceptor>>,
    ) {
        self.routes.push(Route {
            command_type: TypeId::of::<C>(),
            command_name: std::any::type_name::<C>(),
            action,
            filters,
        });
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Whether any route handles commands of type `C`.
    pub fn handles<C: Command>(&self) -> bool {
        self.routes
            .iter()
            .any(|route| route.command_type == TypeId::of::<C>())
    }

    /// Subscribe every route to `bus`.
    pub fn map_to(&self, bus: &Bus) -> MappedRoutes {
        let mut sync_routes = Vec::new();
        let mut async_routes = Vec::new();

        for route in &self.routes {
            let mut route = route.clone();
            if !self.default_filters.is_empty() {
                let mut filters = self.default_filters.clone();
                filters.append(&mut route.filters);
                route.filters = filters;
            }

            let plain_sync =
                matches!(route.action, RouteAction::Sync(_)) && route.filters.is_empty();
            if plain_sync {
                sync_routes.push(route);
            } else {
                async_routes.push(route);
            }
        }

        let mut subscriptions = Vec::with_capacity(2);
        if !sync_routes.is_empty() {
            subscriptions.push(bus.subscribe(Arc::new(SyncRoutes {
                handler: Arc::clone(&self.handler),
                routes: sync_routes,
            })));
        }
        if !async_routes.is_empty() {
            subscriptions.push(bus.subscribe_async(Arc::new(AsyncRoutes {
                handler: Arc::clone(&self.handler),
                routes: async_routes,
            })));
        }

        debug!(
            bus_id = bus.id(),
            handler = std::any::type_name::<H>(),
            routes = self.routes.len(),
            subscriptions = subscriptions.len(),
            "Routes mapped"
        );

        MappedRoutes { subscriptions }
    }
}

/// Subscriptions created by [`RouteMap::map_to`].
#[derive(Debug)]
pub struct MappedRoutes {
    subscriptions: Vec<Subscription>,
}

impl MappedRoutes {
    /// Dispose every subscription created for the table. Idempotent.
    pub fn unmap_routes(&self) {
        for subscription in &self.subscriptions {
            subscription.dispose();
        }
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn is_unmapped(&self) -> bool {
        self.subscriptions.iter().all(Subscription::is_disposed)
    }
}

struct SyncRoutes<H> {
    handler: Arc<H>,
    routes: Vec<Route<H>>,
}

impl<H: Send + Sync + 'static> Subscriber for SyncRoutes<H> {
    fn receive(&self, command: &dyn Command) -> BusResult<()> {
        let command_type = command.command_type();
        for route in self.routes.iter().filter(|r| r.command_type == command_type) {
            if let RouteAction::Sync(action) = &route.action {
                action(&self.handler, command)?;
            }
        }
        Ok(())
    }
}

struct AsyncRoutes<H> {
    handler: Arc<H>,
    routes: Vec<Route<H>>,
}

#[async_trait]
impl<H: Send + Sync + 'static> AsyncSubscriber for AsyncRoutes<H> {
    async fn receive_async(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
    ) -> BusResult<()> {
        let command_type = command.command_type();
        let invocations: Vec<RouteInvocation<'_, H>> = self
            .routes
            .iter()
            .filter(|route| route.command_type == command_type)
            .map(|route| RouteInvocation {
                handler: self.handler.as_ref(),
                route,
            })
            .collect();

        let mut aggregator = Aggregator::new();
        for invocation in &invocations {
            aggregator
                .push(Next::new(&invocation.route.filters, invocation).run(command, cancel));
        }
        aggregator.wait_all().await
    }
}

/// Terminal stage of a single route's chain: the handler function itself.
struct RouteInvocation<'h, H> {
    handler: &'h H,
    route: &'h Route<H>,
}

impl<H: Send + Sync + 'static> ChainTerminal for RouteInvocation<'_, H> {
    fn run<'a>(
        &'a self,
        command: &'a dyn Command,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>> {
        trace!(route = self.route.command_name, "Invoking route handler");
        match &self.route.action {
            RouteAction::Sync(action) => completed(action(self.handler, command)),
            RouteAction::Async(action) => action.call(self.handler, command, cancel),
        }
    }
}
