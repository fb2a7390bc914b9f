// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Fusion module for the navbox daemon
//!
//! Drives the poll/fuse cycle: it consumes decoded sentence updates from
//! both receiver sources, keeps a small per-source cache, and on a fixed
//! interval fuses the two current fixes into a [`FusedState`] snapshot
//! that is published on the event bus. The uplink, push and recorder
//! modules are independent consumers of that snapshot; nothing feeds back
//! into fusion.

use algorithm::{HeadingWindow, initial_bearing};
use common::fix::{Fix, SatelliteStatus};
use common::fused_state::FusedState;
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod source;
use source::{SerialSource, SourceUpdate};

/// Fixed length of one poll/fuse cycle.
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(5);

/// Cached sentence state of one receiver.
///
/// GSA sentences arrive less frequently than GGA sentences, so decoded
/// values persist here across cycles until the receiver re-sends that
/// sentence type. The cache is only as fresh as the receiver keeps it; a
/// silent receiver leaves its last values in place.
#[derive(Debug, Default)]
struct SourceCache {
    fix: Option<Fix>,
    satellites: SatelliteStatus,
}

impl SourceCache {
    fn apply(&mut self, update: SourceUpdate) {
        match update {
            SourceUpdate::Fix(fix) => self.fix = Some(fix),
            SourceUpdate::Satellites(satellites) => self.satellites = satellites,
        }
    }
}

/// The orchestrating module of the daemon.
///
/// One instance owns both receiver sources, the heading window and the
/// fusion cadence. It runs until a quit event arrives; any error inside a
/// cycle is logged and the loop continues with the next tick.
pub struct Fusion {
    ctx: ModuleCtx,
    device_id: String,
    cycle_interval: Duration,
    window: HeadingWindow,
    source_a: SerialSource,
    source_b: SerialSource,
    cache_a: SourceCache,
    cache_b: SourceCache,
}

impl Fusion {
    /// Creates a fusion module with the fixed production cycle interval.
    pub fn new(ctx: ModuleCtx, device_id: &str, source_a: SerialSource, source_b: SerialSource) -> Self {
        Fusion::new_with_interval(ctx, device_id, source_a, source_b, CYCLE_INTERVAL)
    }

    /// Creates a fusion module with a custom cycle interval. Used by tests.
    pub fn new_with_interval(
        ctx: ModuleCtx,
        device_id: &str,
        source_a: SerialSource,
        source_b: SerialSource,
        cycle_interval: Duration,
    ) -> Self {
        Fusion {
            ctx,
            device_id: device_id.to_owned(),
            cycle_interval,
            window: HeadingWindow::new(),
            source_a,
            source_b,
            cache_a: SourceCache::default(),
            cache_b: SourceCache::default(),
        }
    }
}

/// Fuses the current fixes of both receivers into one snapshot.
///
/// The heading is the smoothed initial bearing from receiver B's fix to
/// receiver A's fix; the fused position is receiver A's. Quality data is
/// merged conservatively: the larger satellite count, the smaller of the
/// present HDOP values, the OR of the SBAS flags and the union of the
/// constellation sets.
fn fuse(
    device_id: &str,
    window: &mut HeadingWindow,
    cache_a: &SourceCache,
    cache_b: &SourceCache,
) -> Option<FusedState> {
    let fix_a = cache_a.fix?;
    let fix_b = cache_b.fix?;
    let heading = window.smooth(initial_bearing(&fix_b, &fix_a));
    let hdop = match (fix_a.hdop(), fix_b.hdop()) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };
    Some(FusedState {
        device_id: device_id.to_owned(),
        latitude: fix_a.latitude(),
        longitude: fix_a.longitude(),
        heading,
        satellites: fix_a.satellites().max(fix_b.satellites()),
        hdop,
        sbas: fix_a.sbas() || fix_b.sbas(),
        constellations: cache_a
            .satellites
            .union(&cache_b.satellites)
            .constellations()
            .clone(),
    })
}

#[async_trait::async_trait]
impl Module for Fusion {
    async fn run(&mut self) -> Result<(), ()> {
        let Fusion {
            ctx,
            device_id,
            cycle_interval,
            window,
            source_a,
            source_b,
            cache_a,
            cache_b,
        } = self;
        let mut interval = tokio::time::interval(*cycle_interval);
        // Consume the immediate first tick so the first real cycle runs a
        // full interval after start, once the sources had a chance to read.
        interval.tick().await;
        // A closed source stays disabled so the loop does not spin on it.
        let mut source_a_open = true;
        let mut source_b_open = true;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match fuse(device_id, window, cache_a, cache_b) {
                        Some(state) => {
                            info!(
                                "Position: ({:.6}, {:.6}) / Heading: {:.2}°",
                                state.latitude, state.longitude, state.heading
                            );
                            let _ = ctx.sender.send(Event {
                                kind: EventKind::FusedStateEvent(Arc::new(state)),
                            });
                        }
                        None => warn!("Insufficient GNSS data, skipping fusion cycle"),
                    }
                }
                update = source_a.recv(), if source_a_open => {
                    match update {
                        Some(update) => cache_a.apply(update),
                        None => {
                            warn!("Receiver source A closed its update channel");
                            source_a_open = false;
                        }
                    }
                }
                update = source_b.recv(), if source_b_open => {
                    match update {
                        Some(update) => cache_b.apply(update),
                        None => {
                            warn!("Receiver source B closed its update channel");
                            source_b_open = false;
                        }
                    }
                }
                event = ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                return Ok(());
                            }
                        }
                        Err(e) => error!("Error receiving event: {}", e),
                    }
                }
            }
        }
    }
}
