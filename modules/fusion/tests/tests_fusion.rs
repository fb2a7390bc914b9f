// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fix::{Constellation, Fix, SatelliteStatus};
use fusion::Fusion;
use fusion::source::{SerialSource, SourceUpdate};
use module_core::{
    EventBus, EventKind, EventKindType, Module, ModuleCtx,
    test_helper::{stop_module, wait_for_event},
};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::sync::mpsc;

const CYCLE_MS: u64 = 20;
const TIMEOUT_MS: u64 = 500;

fn start_module(
    ctx: ModuleCtx,
) -> (
    mpsc::Sender<SourceUpdate>,
    mpsc::Sender<SourceUpdate>,
    tokio::task::JoinHandle<Result<(), ()>>,
) {
    let (tx_a, rx_a) = mpsc::channel(16);
    let (tx_b, rx_b) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        let mut fusion = Fusion::new_with_interval(
            ctx,
            "test-device",
            SerialSource::from_updates(rx_a),
            SerialSource::from_updates(rx_b),
            Duration::from_millis(CYCLE_MS),
        );
        fusion.run().await
    });
    (tx_a, tx_b, handle)
}

fn constellations(entries: &[Constellation]) -> SatelliteStatus {
    SatelliteStatus::new(entries.iter().copied().collect::<BTreeSet<_>>())
}

#[tokio::test]
#[test_log::test]
async fn fuses_two_fixes_into_snapshot() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let (tx_a, tx_b, mut handle) = start_module(eb.context());

    let fix_a = Fix::new(10.0, 20.0, 8, Some(0.9), false);
    let fix_b = Fix::new(10.0, 20.1, 6, Some(1.4), true);
    tx_a.send(SourceUpdate::Fix(fix_a)).await.unwrap();
    tx_b.send(SourceUpdate::Fix(fix_b)).await.unwrap();

    let event = wait_for_event(
        &mut rx,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::FusedStateEvent,
    )
    .await;
    let EventKind::FusedStateEvent(state) = event.kind else {
        panic!("Expected a fused state event");
    };
    assert_eq!(state.device_id, "test-device");
    // Fused position is receiver A's.
    assert_eq!(state.latitude, 10.0);
    assert_eq!(state.longitude, 20.0);
    // Receiver B sits east of receiver A, so B -> A points west.
    assert!((0.0..360.0).contains(&state.heading));
    assert!((state.heading - 270.0).abs() < 1.0);
    assert_eq!(state.satellites, 8);
    assert_eq!(state.hdop, Some(0.9));
    assert!(state.sbas);

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn skips_cycle_until_both_sources_have_a_fix() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let (tx_a, tx_b, mut handle) = start_module(eb.context());

    tx_a.send(SourceUpdate::Fix(Fix::new(10.0, 20.0, 8, None, false)))
        .await
        .unwrap();
    // Several cycles pass with only one fix present; nothing is published.
    tokio::time::sleep(Duration::from_millis(CYCLE_MS * 4)).await;
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    tx_b.send(SourceUpdate::Fix(Fix::new(10.001, 20.0, 7, None, false)))
        .await
        .unwrap();
    let event = wait_for_event(
        &mut rx,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::FusedStateEvent,
    )
    .await;
    assert_eq!(event.event_type(), EventKindType::FusedStateEvent);

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn merges_satellite_status_from_both_sources() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let (tx_a, tx_b, mut handle) = start_module(eb.context());

    tx_a.send(SourceUpdate::Satellites(constellations(&[Constellation::Gps])))
        .await
        .unwrap();
    tx_b.send(SourceUpdate::Satellites(constellations(&[
        Constellation::Glonass,
        Constellation::Galileo,
    ])))
    .await
    .unwrap();
    tx_a.send(SourceUpdate::Fix(Fix::new(54.1, 12.1, 9, None, false)))
        .await
        .unwrap();
    tx_b.send(SourceUpdate::Fix(Fix::new(54.1, 12.1001, 9, Some(1.1), false)))
        .await
        .unwrap();

    let event = wait_for_event(
        &mut rx,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::FusedStateEvent,
    )
    .await;
    let EventKind::FusedStateEvent(state) = event.kind else {
        panic!("Expected a fused state event");
    };
    let expected: BTreeSet<Constellation> = [
        Constellation::Gps,
        Constellation::Glonass,
        Constellation::Galileo,
    ]
    .into_iter()
    .collect();
    assert_eq!(state.constellations, expected);
    // Only receiver B reported an HDOP, its value carries over.
    assert_eq!(state.hdop, Some(1.1));

    stop_module(&eb, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn satellite_status_persists_across_cycles() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let (tx_a, tx_b, mut handle) = start_module(eb.context());

    // Status arrives once; fixes keep coming every cycle afterwards.
    tx_a.send(SourceUpdate::Satellites(constellations(&[Constellation::BeiDou])))
        .await
        .unwrap();
    tx_a.send(SourceUpdate::Fix(Fix::new(54.1, 12.1, 9, None, false)))
        .await
        .unwrap();
    tx_b.send(SourceUpdate::Fix(Fix::new(54.1, 12.1001, 9, None, false)))
        .await
        .unwrap();

    for _ in 0..2 {
        let event = wait_for_event(
            &mut rx,
            Duration::from_millis(TIMEOUT_MS),
            EventKindType::FusedStateEvent,
        )
        .await;
        let EventKind::FusedStateEvent(state) = event.kind else {
            panic!("Expected a fused state event");
        };
        assert!(state.constellations.contains(&Constellation::BeiDou));
    }

    stop_module(&eb, &mut handle).await;
}
