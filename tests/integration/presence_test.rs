//! Position recording, last-known reads, and availability.

use std::collections::HashSet;

use fleetpulse_core::error::ErrorKind;
use fleetpulse_core::types::DriverId;
use fleetpulse_database::PositionStore;
use fleetpulse_realtime::message::MessageStatus;

use crate::helpers::{TestFleet, plan};

#[tokio::test]
async fn test_last_known_is_exactly_the_latest_position() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];

    let points = [(48.0, 2.0), (48.1, 2.1), (-33.8688, 151.2093)];
    for (lat, lon) in points {
        let ack = fleet.push(tenant, driver, lat, lon).await;
        assert_eq!(ack.status, MessageStatus::Success);

        let last = fleet
            .engine
            .positions
            .last_known(driver)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((last.latitude, last.longitude), (lat, lon));

        let stored = fleet.store.find_by_driver(driver).await.unwrap().unwrap();
        assert_eq!((stored.latitude, stored.longitude), (lat, lon));
    }

    // One row per driver, never a history.
    assert_eq!(fleet.store.find_by_tenant(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_positions_leave_state_untouched() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 1);
    let driver = drivers[0];
    fleet.push(tenant, driver, 48.0, 2.0).await;

    for raw in [
        r#"{"type":"POSITION_UPDATE","latitude":95.0,"longitude":2.0}"#,
        r#"{"type":"POSITION_UPDATE","latitude":48.0}"#,
        r#"{"type":"SOMETHING_ELSE"}"#,
        "not json",
    ] {
        let ack = fleet.engine.handle_driver_message(tenant, driver, raw).await;
        assert_eq!(ack.status, MessageStatus::Error, "{raw}");
    }

    let last = fleet.engine.positions.last_known(driver).await.unwrap().unwrap();
    assert_eq!((last.latitude, last.longitude), (48.0, 2.0));
}

#[tokio::test]
async fn test_driver_without_tenant_cannot_record() {
    let fleet = TestFleet::new();
    let orphan = fleet.directory.add_unassigned_driver();

    let err = fleet
        .engine
        .positions
        .record_position(orphan, 48.0, 2.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTenant);
    assert!(fleet.store.is_empty());
}

#[tokio::test]
async fn test_last_known_of_unknown_driver_is_empty() {
    let fleet = TestFleet::new();
    let last = fleet
        .engine
        .positions
        .last_known(DriverId::new())
        .await
        .unwrap();
    assert!(last.is_none());
}

#[tokio::test]
async fn test_fleet_snapshot_is_tenant_scoped() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 3);
    let (other, others) = fleet.tenant(plan(10, 10), 1);
    for driver in &drivers {
        fleet.push(tenant, *driver, 48.0, 2.0).await;
    }
    fleet.push(other, others[0], 45.0, 4.0).await;

    let ids: HashSet<DriverId> = fleet
        .engine
        .positions
        .all_last_known(tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.driver_id)
        .collect();
    assert_eq!(ids, drivers.into_iter().collect());
}

#[tokio::test]
async fn test_nearest_available_ranks_by_distance() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 10), 3);
    fleet.push(tenant, drivers[0], 48.90, 2.35).await;
    fleet.push(tenant, drivers[1], 48.857, 2.352).await;
    fleet.push(tenant, drivers[2], 43.2965, 5.3698).await;

    let found = fleet
        .engine
        .nearest_available(tenant, "Place de l'Hôtel de Ville, Paris", None, None)
        .await
        .unwrap();
    let ids: Vec<DriverId> = found.iter().map(|d| d.driver_id).collect();
    assert_eq!(ids, vec![drivers[1], drivers[0]]);

    let err = fleet
        .engine
        .nearest_available(tenant, "", None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
