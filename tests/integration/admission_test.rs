//! Quota enforcement and alert throttling through the engine.

use chrono::{TimeDelta, Utc};

use fleetpulse_core::error::ErrorKind;
use fleetpulse_entity::AlertKind;

use crate::helpers::{TestFleet, plan};

#[tokio::test]
async fn test_sixth_driver_denied_by_driver_quota() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(5, 10), 5);

    for driver in &drivers {
        fleet.engine.connect_driver(tenant, *driver, None).await.unwrap();
    }

    let sixth = fleet.directory.add_driver(tenant);
    let err = fleet
        .engine
        .connect_driver(tenant, sixth, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DriverQuotaExceeded);
    assert!(!fleet.engine.is_driver_online(sixth));
    assert!(
        fleet
            .alerts
            .recent()
            .iter()
            .any(|a| a.kind == AlertKind::DriverLimit && a.tenant_id == tenant)
    );
}

#[tokio::test]
async fn test_fourth_connection_waits_for_a_release() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 3), 4);

    for driver in &drivers[..3] {
        fleet.engine.connect_driver(tenant, *driver, None).await.unwrap();
    }

    let err = fleet
        .engine
        .connect_driver(tenant, drivers[3], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionQuotaExceeded);

    fleet.engine.disconnect_driver(tenant, drivers[0]);
    fleet
        .engine
        .connect_driver(tenant, drivers[3], None)
        .await
        .unwrap();
    assert_eq!(fleet.engine.admission.open_connections(tenant), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_connects_never_exceed_quota() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(20, 4), 12);

    let attempts = drivers.iter().map(|driver| {
        let engine = fleet.engine.clone();
        let driver = *driver;
        tokio::spawn(async move { engine.connect_driver(tenant, driver, None).await })
    });
    let results = futures::future::join_all(attempts).await;

    let admitted = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(admitted, 4);
    assert_eq!(fleet.engine.admission.open_connections(tenant), 4);
}

#[tokio::test]
async fn test_stale_records_free_their_slot() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 1), 2);
    let admission = &fleet.engine.admission;
    let start = Utc::now();

    admission
        .authorize_at(Some(tenant), drivers[0], start)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    let denied = admission
        .authorize_at(Some(tenant), drivers[1], start + TimeDelta::minutes(30))
        .await
        .unwrap();
    assert!(!denied.is_granted());

    // No activity for over an hour: the first record is abandoned.
    let later = start + TimeDelta::minutes(61);
    admission
        .authorize_at(Some(tenant), drivers[1], later)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(admission.table().open_count(tenant, later), 1);
}

#[tokio::test]
async fn test_position_traffic_keeps_connection_fresh() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 1), 1);
    let admission = &fleet.engine.admission;
    let now = Utc::now();

    admission
        .authorize_at(Some(tenant), drivers[0], now - TimeDelta::minutes(50))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let ack = fleet.push(tenant, drivers[0], 48.0, 2.0).await;
    assert_eq!(ack.status, fleetpulse_realtime::message::MessageStatus::Success);

    // 80 minutes after opening, 30 after the last position.
    assert!(
        admission
            .table()
            .is_open(tenant, drivers[0], now + TimeDelta::minutes(30))
    );
}

#[tokio::test]
async fn test_repeated_denials_alert_once_per_window() {
    let fleet = TestFleet::new();
    let (tenant, drivers) = fleet.tenant(plan(10, 1), 3);
    let admission = &fleet.engine.admission;
    let start = Utc::now();

    admission
        .authorize_at(Some(tenant), drivers[0], start)
        .await
        .unwrap();
    for minutes in [1, 5, 60, 23 * 60] {
        let at = start + TimeDelta::minutes(minutes);
        // keep the first record fresh so the slot stays taken
        admission.table().touch(tenant, drivers[0], at);
        let decision = admission
            .authorize_at(Some(tenant), drivers[1], at)
            .await
            .unwrap();
        assert!(!decision.is_granted());
    }

    let connection_alerts: Vec<_> = fleet
        .alerts
        .recent()
        .into_iter()
        .filter(|a| a.kind == AlertKind::ConnectionLimit)
        .collect();
    assert_eq!(connection_alerts.len(), 1);

    admission
        .table()
        .touch(tenant, drivers[0], start + TimeDelta::hours(25));
    admission
        .authorize_at(Some(tenant), drivers[2], start + TimeDelta::hours(25))
        .await
        .unwrap();
    let alerts: Vec<_> = fleet
        .alerts
        .recent()
        .into_iter()
        .filter(|a| a.kind == AlertKind::ConnectionLimit)
        .collect();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[1].raised_at - alerts[0].raised_at >= TimeDelta::hours(24));
}

#[tokio::test]
async fn test_driver_of_other_tenant_is_refused() {
    let fleet = TestFleet::new();
    let (tenant, _) = fleet.tenant(plan(10, 10), 0);
    let (_, foreign) = fleet.tenant(plan(10, 10), 1);

    let err = fleet
        .engine
        .connect_driver(tenant, foreign[0], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTenant);
}
