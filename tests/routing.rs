//! Route tables bound to a bus.

mod common;

use command_bus::routing::RouteMap;
use command_bus::{Bus, BusError, BusResult, CancellationToken, CommandOrdering, Interceptor};
use common::*;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Inventory {
    stock: Mutex<Vec<u32>>,
    journal: Journal,
}

impl Inventory {
    fn on_ping(&self, command: &Ping) -> BusResult<()> {
        self.stock.lock().push(command.0);
        Ok(())
    }

    fn on_pong<'a>(
        &'a self,
        _command: &'a Pong,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.journal.record("pong");
            Ok(())
        })
    }

    fn reject_pong<'a>(
        &'a self,
        _command: &'a Pong,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, BusResult<()>> {
        Box::pin(async move { Err(BusError::subscriber("Pong", "out of stock")) })
    }
}

#[tokio::test]
async fn test_routes_receive_only_their_commands() -> anyhow::Result<()> {
    let bus = Bus::new();
    let inventory = Arc::new(Inventory::default());
    let mapped = RouteMap::new(inventory.clone())
        .on(Inventory::on_ping)
        .on_async(Inventory::on_pong)
        .map_to(&bus);

    bus.publish(&Ping(4)).await?;
    bus.publish(&Pong).await?;
    bus.publish(&Ping(5)).await?;

    assert_eq!(*inventory.stock.lock(), vec![4, 5]);
    assert_eq!(inventory.journal.entries(), vec!["pong"]);
    assert_eq!(bus.stats().subscribers, 1);
    assert_eq!(bus.stats().async_subscribers, 1);

    mapped.unmap_routes();
    assert_eq!(bus.stats().subscribers + bus.stats().async_subscribers, 0);
    Ok(())
}

#[tokio::test]
async fn test_bus_interceptors_wrap_route_filters() -> anyhow::Result<()> {
    let bus = Bus::new();
    let journal = Journal::new();
    let inventory = Arc::new(Inventory::default());
    bus.filter(tracer("bus", &journal));

    let _mapped = RouteMap::new(inventory.clone())
        .filter(tracer("handler", &journal))
        .on_with(Inventory::on_ping, vec![tracer("route", &journal) as Arc<dyn Interceptor>])
        .map_to(&bus);

    bus.publish(&Ping(1)).await?;

    assert_eq!(
        journal.entries(),
        vec![
            "bus-before",
            "handler-before",
            "route-before",
            "route-after",
            "handler-after",
            "bus-after",
        ]
    );
    assert_eq!(*inventory.stock.lock(), vec![1]);
    Ok(())
}

#[tokio::test]
async fn test_route_filter_can_short_circuit_handler() -> anyhow::Result<()> {
    let bus = Bus::new();
    let inventory = Arc::new(Inventory::default());
    let _mapped = RouteMap::new(inventory.clone())
        .on_with(Inventory::on_ping, vec![Arc::new(ShortCircuit) as Arc<dyn Interceptor>])
        .map_to(&bus);

    bus.publish(&Ping(1)).await?;

    assert!(inventory.stock.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failing_async_route_surfaces_failure() {
    let bus = Bus::new();
    let inventory = Arc::new(Inventory::default());
    let _mapped = RouteMap::new(inventory.clone())
        .on_async(Inventory::on_pong)
        .on_async(Inventory::reject_pong)
        .map_to(&bus);

    let err = bus.publish(&Pong).await.unwrap_err();

    assert!(matches!(err, BusError::SubscriberFailure { command: "Pong", .. }));
    assert_eq!(inventory.journal.entries(), vec!["pong"]);
}

#[tokio::test]
async fn test_same_table_maps_to_several_buses() -> anyhow::Result<()> {
    let first = Bus::new();
    let second = Bus::with_ordering(CommandOrdering::FirstInFirstOut);
    let inventory = Arc::new(Inventory::default());
    let routes = RouteMap::new(inventory.clone()).on(Inventory::on_ping);

    let on_first = routes.map_to(&first);
    let _on_second = routes.map_to(&second);

    first.publish(&Ping(1)).await?;
    second.publish(&Ping(2)).await?;
    on_first.unmap_routes();
    first.publish(&Ping(3)).await?;

    assert_eq!(*inventory.stock.lock(), vec![1, 2]);
    Ok(())
}
