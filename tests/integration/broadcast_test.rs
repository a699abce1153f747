//! Observer snapshots, fan-out ordering, and periodic re-send.

use std::collections::HashMap;
use std::time::Duration;

use fleetpulse_core::types::DriverId;
use fleetpulse_entity::Position;
use fleetpulse_realtime::ChannelObserver;
use fleetpulse_realtime::message::{MessageStatus, MessageType};

use crate::helpers::{TestFleet, drain, plan};

#[tokio::test]
async fn test_observer_attached_after_push_gets_exact_position() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];

    fleet.engine.connect_driver(tenant, driver, None).await.unwrap();
    fleet.push(tenant, driver, 48.8566, 2.3522).await;

    let (sink, mut rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_tenant_observer(tenant, Some("dispatcher".to_string()), sink)
        .await
        .unwrap();

    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.message_type, MessageType::PositionUpdate);
    let fleet_positions = snapshot.fleet().unwrap();
    assert_eq!(fleet_positions.len(), 1);
    assert_eq!(fleet_positions[0].driver_id, driver);
    assert_eq!(
        (fleet_positions[0].latitude, fleet_positions[0].longitude),
        (48.8566, 2.3522)
    );
}

#[tokio::test]
async fn test_snapshot_matches_last_known_of_every_driver() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 4);
    for (i, driver) in drivers.iter().enumerate().take(3) {
        fleet.push(tenant, *driver, 48.0 + i as f64, 2.0).await;
        fleet.push(tenant, *driver, 49.0 + i as f64, 3.0).await;
    }

    let (sink, mut rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_tenant_observer(tenant, None, sink)
        .await
        .unwrap();
    let snapshot = rx.recv().await.unwrap();

    let got: HashMap<DriverId, Position> = snapshot
        .fleet()
        .unwrap()
        .iter()
        .map(|p| (p.driver_id, p.clone()))
        .collect();
    let mut expected = HashMap::new();
    for driver in &drivers {
        if let Some(p) = fleet.engine.positions.last_known(*driver).await.unwrap() {
            expected.insert(*driver, p);
        }
    }
    assert_eq!(got, expected);
    assert_eq!(got.len(), 3);
}

#[tokio::test]
async fn test_empty_fleet_snapshot_is_no_data() {
    let fleet = TestFleet::new();
    let (tenant, _) = fleet.tenant(plan(10, 10), 2);

    let (sink, mut rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_tenant_observer(tenant, None, sink)
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap().status, MessageStatus::NoData);
}

#[tokio::test]
async fn test_observer_between_updates_sees_them_in_order() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];

    fleet.push(tenant, driver, 48.0, 2.0).await;

    let (sink, mut rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_driver_observer(tenant, driver, None, None, sink)
        .await
        .unwrap();

    fleet.push(tenant, driver, 48.1, 2.1).await;

    let seen: Vec<(f64, f64)> = drain(&mut rx)
        .iter()
        .filter_map(|e| e.position())
        .map(|p| (p.latitude, p.longitude))
        .collect();
    assert_eq!(seen, vec![(48.0, 2.0), (48.1, 2.1)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fanout_never_goes_backwards() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 2);

    let (sink, mut rx) = ChannelObserver::new(4096);
    fleet
        .engine
        .attach_tenant_observer(tenant, None, sink)
        .await
        .unwrap();
    let _ = rx.recv().await;

    let pushers = drivers.iter().map(|driver| {
        let engine = fleet.engine.clone();
        let driver = *driver;
        tokio::spawn(async move {
            for i in 0..50 {
                let raw = format!(
                    r#"{{"type":"POSITION_UPDATE","latitude":{},"longitude":2.0}}"#,
                    40.0 + i as f64 * 0.1
                );
                engine.handle_driver_message(tenant, driver, &raw).await;
                if i % 10 == 0 {
                    engine.broadcast.resend(tenant, driver).await;
                }
            }
        })
    });
    futures::future::join_all(pushers).await;

    let mut newest: HashMap<DriverId, Position> = HashMap::new();
    for envelope in drain(&mut rx) {
        let Some(position) = envelope.position() else {
            continue;
        };
        if let Some(previous) = newest.get(&position.driver_id) {
            assert!(position.captured_at >= previous.captured_at);
        }
        newest.insert(position.driver_id, position.clone());
    }
    assert_eq!(newest.len(), 2);
}

#[tokio::test]
async fn test_detach_twice_is_harmless() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];

    let (sink, mut rx) = ChannelObserver::new(16);
    let session = fleet
        .engine
        .attach_driver_observer(tenant, driver, None, None, sink)
        .await
        .unwrap();
    let (other_sink, mut other_rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_driver_observer(tenant, driver, None, None, other_sink)
        .await
        .unwrap();
    drain(&mut rx);
    drain(&mut other_rx);

    assert!(fleet.engine.detach(tenant, Some(driver), session.id));
    assert!(!fleet.engine.detach(tenant, Some(driver), session.id));

    fleet.push(tenant, driver, 48.0, 2.0).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(drain(&mut other_rx).len(), 1);
    assert_eq!(fleet.engine.metrics().observers_active, 1);
}

#[tokio::test]
async fn test_dead_observer_does_not_block_others() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);

    let (dead, dead_rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_tenant_observer(tenant, None, dead)
        .await
        .unwrap();
    drop(dead_rx);

    let (live, mut live_rx) = ChannelObserver::new(16);
    fleet
        .engine
        .attach_tenant_observer(tenant, None, live)
        .await
        .unwrap();
    drain(&mut live_rx);

    let ack = fleet.push(tenant, drivers[0], 48.0, 2.0).await;
    assert_eq!(ack.status, MessageStatus::Success);
    assert_eq!(drain(&mut live_rx).len(), 1);
    assert!(fleet.engine.metrics().delivery_failures >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_unobserved_driver_timer_is_silent() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];

    fleet.engine.connect_driver(tenant, driver, Some(5)).await.unwrap();
    fleet.push(tenant, driver, 48.0, 2.0).await;

    tokio::time::advance(Duration::from_secs(60)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let metrics = fleet.engine.metrics();
    assert_eq!(metrics.resends, 0);
    assert_eq!(metrics.messages_sent, 0);
    assert_eq!(metrics.resend_timers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_observer_receives_periodic_resend() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 2);
    let (watched, other) = (drivers[0], drivers[1]);

    fleet.engine.connect_driver(tenant, watched, None).await.unwrap();
    fleet.engine.connect_driver(tenant, other, Some(5)).await.unwrap();
    fleet.push(tenant, watched, 48.0, 2.0).await;

    let (sink, mut rx) = ChannelObserver::new(64);
    fleet
        .engine
        .attach_driver_observer(tenant, watched, None, Some(6), sink)
        .await
        .unwrap();
    drain(&mut rx);

    // Rescheduling the watched driver leaves the other driver's period alone.
    assert_eq!(
        fleet.engine.resend.period(other),
        Some(Duration::from_secs(5))
    );

    tokio::time::advance(Duration::from_secs(6)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let resent = drain(&mut rx);
    assert_eq!(resent.len(), 1);
    assert_eq!(resent[0].position().map(|p| p.latitude), Some(48.0));
}

#[tokio::test(start_paused = true)]
async fn test_driver_observer_without_position_gets_no_data() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);

    let (sink, mut rx) = ChannelObserver::new(64);
    fleet
        .engine
        .attach_driver_observer(tenant, drivers[0], None, None, sink)
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap().status, MessageStatus::NoData);

    tokio::time::advance(Duration::from_secs(10)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let ticks = drain(&mut rx);
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].status, MessageStatus::NoData);
}
