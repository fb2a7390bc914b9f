// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fused_state::FusedState;
use module_core::{Event, EventBus, EventKind, Module, ModuleCtx, test_helper::stop_module};
use recorder::Recorder;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn log_dir(test_name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("navbox_recorder_tests");
    dir.push(test_name);
    if std::fs::exists(&dir).unwrap_or(false) {
        std::fs::remove_dir_all(&dir)
            .unwrap_or_else(|e| panic!("Failed to clean up log folder: {e}"));
    }
    dir
}

fn todays_file(dir: &PathBuf) -> PathBuf {
    dir.join(format!(
        "gps_{}.csv",
        chrono::Local::now().format("%Y-%m-%d")
    ))
}

fn fused_state(heading: f64) -> FusedState {
    FusedState {
        device_id: "test-device".to_string(),
        latitude: 54.17,
        longitude: 12.08,
        heading,
        satellites: 9,
        hdop: None,
        sbas: false,
        constellations: BTreeSet::new(),
    }
}

fn create_module(ctx: ModuleCtx, dir: &PathBuf) -> tokio::task::JoinHandle<Result<(), ()>> {
    let mut recorder = Recorder::new(ctx, dir);
    tokio::spawn(async move { recorder.run().await })
}

async fn wait_for_lines(path: &PathBuf, expected: usize) -> Vec<String> {
    for _ in 0..50 {
        if let Ok(content) = std::fs::read_to_string(path) {
            let lines: Vec<String> = content.lines().map(str::to_owned).collect();
            if lines.len() >= expected {
                return lines;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Log file never reached {expected} lines");
}

#[tokio::test]
#[test_log::test]
async fn writes_header_and_one_record_per_snapshot() {
    let dir = log_dir("header_and_records");
    let eb = EventBus::default();
    let mut recorder = create_module(eb.context(), &dir);

    eb.publish(&Event {
        kind: EventKind::FusedStateEvent(Arc::new(fused_state(90.0))),
    });
    eb.publish(&Event {
        kind: EventKind::FusedStateEvent(Arc::new(fused_state(91.5))),
    });

    let lines = wait_for_lines(&todays_file(&dir), 3).await;
    assert_eq!(
        lines[0],
        "timestamp,lat,lon,heading,satellites,hdop,sbas"
    );
    assert!(lines[1].contains(",54.17,12.08,90,"));
    assert!(lines[2].contains(",54.17,12.08,91.5,"));

    stop_module(&eb, &mut recorder).await;
}

#[tokio::test]
#[test_log::test]
async fn header_is_not_repeated_on_append() {
    let dir = log_dir("single_header");
    let eb = EventBus::default();
    let mut recorder = create_module(eb.context(), &dir);

    for heading in [10.0, 20.0, 30.0] {
        eb.publish(&Event {
            kind: EventKind::FusedStateEvent(Arc::new(fused_state(heading))),
        });
    }

    let lines = wait_for_lines(&todays_file(&dir), 4).await;
    let headers = lines
        .iter()
        .filter(|line| line.starts_with("timestamp,"))
        .count();
    assert_eq!(headers, 1);

    stop_module(&eb, &mut recorder).await;
}
