// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Recorder module for the navbox daemon
//!
//! Appends one CSV record per fused cycle to a log file that rotates
//! daily by name (`gps_YYYY-MM-DD.csv`). Glue around the fusion output,
//! nothing here feeds back into the daemon.

use common::fused_state::FusedState;
use module_core::{EventKind, Module, ModuleCtx};
use std::fs::{DirBuilder, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// File-system backed CSV recorder for fused snapshots.
///
/// One record is appended per snapshot; the header row is written when a
/// new daily file is created.
pub struct Recorder {
    log_dir: PathBuf,
    ctx: ModuleCtx,
}

impl Recorder {
    pub fn new(ctx: ModuleCtx, log_dir: &Path) -> Self {
        if let Err(e) = DirBuilder::new().recursive(true).create(log_dir) {
            error!(
                "Failed to create log folder {}. Error: {}",
                log_dir.to_string_lossy(),
                e
            );
        }
        info!("Using log folder: {}", log_dir.to_string_lossy());
        Recorder {
            log_dir: log_dir.to_path_buf(),
            ctx,
        }
    }

    /// Path of the log file for the given local date.
    fn log_file_path(&self, date: chrono::NaiveDate) -> PathBuf {
        self.log_dir.join(format!("gps_{}.csv", date.format("%Y-%m-%d")))
    }

    /// Appends one snapshot to today's log file, creating it with a
    /// header row when it does not exist yet.
    fn append_record(&self, state: &FusedState) -> csv::Result<()> {
        let now = chrono::Local::now();
        let path = self.log_file_path(now.date_naive());
        let write_header = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            info!("Created new log file: {}", path.to_string_lossy());
            writer.write_record([
                "timestamp",
                "lat",
                "lon",
                "heading",
                "satellites",
                "hdop",
                "sbas",
            ])?;
        }
        writer.write_record([
            now.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
            state.latitude.to_string(),
            state.longitude.to_string(),
            state.heading.to_string(),
            state.satellites.to_string(),
            state.hdop.map(|h| h.to_string()).unwrap_or_default(),
            state.sbas.to_string(),
        ])?;
        writer.flush()?;
        debug!(
            "Logged fused state: {}, {}, {}",
            state.latitude, state.longitude, state.heading
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Module for Recorder {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => return Ok(()),
                                EventKind::FusedStateEvent(state) => {
                                    if let Err(e) = self.append_record(&state) {
                                        error!("Failed to append log record: {}", e);
                                    }
                                }
                            }
                        }
                        Err(e) => error!("Error receiving event: {}", e),
                    }
                }
            }
        }
    }
}
