// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fused_state::FusedState;
use module_core::{Event, EventBus, EventKind, Module, ModuleCtx, test_helper::stop_module};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uplink::{Reading, RetryQueue, Uplink};

fn retry_file(test_name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("navbox_uplink_tests");
    std::fs::create_dir_all(&dir)
        .unwrap_or_else(|e| panic!("Failed to create test folder: {e}"));
    let path = dir.join(format!("{test_name}.json"));
    if std::fs::exists(&path).unwrap_or(false) {
        std::fs::remove_file(&path)
            .unwrap_or_else(|e| panic!("Failed to clean up retry file: {e}"));
    }
    path
}

fn reading(heading: f64) -> Reading {
    Reading {
        device_id: "test-device".to_string(),
        lat: 54.17,
        lon: 12.08,
        heading,
    }
}

fn fused_state() -> FusedState {
    FusedState {
        device_id: "test-device".to_string(),
        latitude: 54.17,
        longitude: 12.08,
        heading: 271.5,
        satellites: 9,
        hdop: Some(0.8),
        sbas: false,
        constellations: BTreeSet::new(),
    }
}

fn start_module(ctx: ModuleCtx, endpoint: &str, path: &PathBuf) -> tokio::task::JoinHandle<Result<(), ()>> {
    let mut uplink = Uplink::new(ctx, endpoint, path).expect("Failed to create uplink module");
    tokio::spawn(async move { uplink.run().await })
}

#[tokio::test]
#[test_log::test]
async fn push_appends_to_queue_file_in_order() {
    let path = retry_file("push_appends");
    let queue = RetryQueue::new(&path);
    queue.push(reading(10.0)).await.unwrap();
    queue.push(reading(20.0)).await.unwrap();
    assert!(std::fs::exists(&path).unwrap());
    let items = queue.load().await.unwrap();
    assert_eq!(items, vec![reading(10.0), reading(20.0)]);
}

#[tokio::test]
#[test_log::test]
async fn drain_removes_file_when_all_items_succeed() {
    let path = retry_file("drain_all_succeed");
    let queue = RetryQueue::new(&path);
    queue.push(reading(10.0)).await.unwrap();
    queue.push(reading(20.0)).await.unwrap();

    queue.drain(|_| async { true }).await.unwrap();
    assert!(!std::fs::exists(&path).unwrap());
    assert!(queue.load().await.unwrap().is_empty());
}

#[tokio::test]
#[test_log::test]
async fn drain_attempts_every_item_and_keeps_failing_subset() {
    let path = retry_file("drain_partial");
    let queue = RetryQueue::new(&path);
    for heading in [10.0, 20.0, 30.0] {
        queue.push(reading(heading)).await.unwrap();
    }

    // The first item fails; later items are still attempted in the pass.
    let attempts = AtomicUsize::new(0);
    queue
        .drain(|item| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { item.heading != 10.0 }
        })
        .await
        .unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(queue.load().await.unwrap(), vec![reading(10.0)]);
}

#[tokio::test]
#[test_log::test]
async fn drain_aborts_without_touching_a_corrupt_file() {
    let path = retry_file("drain_corrupt");
    std::fs::write(&path, "{ not json").unwrap();

    let queue = RetryQueue::new(&path);
    let result = queue.drain(|_| async { true }).await;
    assert!(result.is_err());
    // The potentially salvageable file is preserved for the next attempt.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[tokio::test]
#[test_log::test]
async fn drain_on_absent_file_is_a_no_op() {
    let path = retry_file("drain_absent");
    let queue = RetryQueue::new(&path);
    queue.drain(|_| async { true }).await.unwrap();
    assert!(!std::fs::exists(&path).unwrap());
}

#[tokio::test]
#[test_log::test]
async fn failed_delivery_lands_in_the_retry_file() {
    let path = retry_file("failed_delivery");
    let eb = EventBus::default();
    // Nothing listens on this port, every request fails fast.
    let mut handle = start_module(eb.context(), "http://127.0.0.1:1/api/position", &path);

    eb.publish(&Event {
        kind: EventKind::FusedStateEvent(Arc::new(fused_state())),
    });

    let queue = RetryQueue::new(&path);
    let mut queued = Vec::new();
    for _ in 0..50 {
        queued = queue.load().await.unwrap();
        if !queued.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(queued, vec![Reading::from(&fused_state())]);

    stop_module(&eb, &mut handle).await;
}
