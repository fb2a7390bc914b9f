// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Uplink module for the navbox daemon
//!
//! Forwards every fused snapshot to the remote collector and owns the
//! crash-tolerant retry queue for snapshots that failed to get through.
//! Delivery is at-least-once; deduplication is left to the collector.

use common::fused_state::FusedState;
use module_core::{EventKind, Module, ModuleCtx};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Bounded timeout for one collector request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The collector payload: one delivered reading per fused cycle.
///
/// The same JSON shape is used on the wire and in the retry-queue file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub lat: f64,
    pub lon: f64,
    pub heading: f64,
}

impl From<&FusedState> for Reading {
    fn from(state: &FusedState) -> Self {
        Reading {
            device_id: state.device_id.clone(),
            lat: state.latitude,
            lon: state.longitude,
            heading: state.heading,
        }
    }
}

/// Durable store of readings that failed to reach the collector.
///
/// The queue is an ordered JSON array in a single file: file presence
/// signals pending items, file absence signals an empty queue. Every
/// mutation rewrites the whole file through a temp-file-and-rename, so a
/// concurrent reader can never observe a partial write.
///
/// ## Important
///
/// `RetryQueue` does not lock the file. The uplink module owns the only
/// instance and touches it exclusively from its event loop, which is what
/// serializes push against drain.
pub struct RetryQueue {
    path: PathBuf,
}

impl RetryQueue {
    pub fn new(path: &Path) -> Self {
        RetryQueue {
            path: path.to_path_buf(),
        }
    }

    /// Loads the queued readings, oldest first.
    ///
    /// An absent file is an empty queue. A file that exists but fails to
    /// read or parse is an error; callers leave it in place so a later
    /// pass (or an operator) can still salvage it.
    pub async fn load(&self) -> io::Result<Vec<Reading>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        serde_json::from_str(&json).map_err(io::Error::from)
    }

    /// Appends a reading to the queue.
    ///
    /// The whole sequence is read, extended and rewritten; the queue file
    /// is created when absent.
    pub async fn push(&self, reading: Reading) -> io::Result<()> {
        let mut items = self.load().await?;
        items.push(reading);
        self.replace(&items).await
    }

    /// Redrives every queued reading through `send` in order.
    ///
    /// All items are attempted in one pass; one item's failure does not
    /// stop the pass. Items acknowledged by `send` are removed. When all
    /// succeed the file is deleted, otherwise it is rewritten with exactly
    /// the still-failing items in their original order.
    pub async fn drain<F, Fut>(&self, send: F) -> io::Result<()>
    where
        F: Fn(Reading) -> Fut,
        Fut: Future<Output = bool>,
    {
        let items = self.load().await?;
        if items.is_empty() {
            return Ok(());
        }
        let total = items.len();
        let mut failing = Vec::new();
        for item in items {
            if !send(item.clone()).await {
                failing.push(item);
            }
        }
        info!("Retry queue processed: {} of {} succeeded", total - failing.len(), total);
        self.replace(&failing).await
    }

    /// Atomically replaces the queue file, removing it for an empty queue.
    async fn replace(&self, items: &[Reading]) -> io::Result<()> {
        if items.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            };
        }
        let json = serde_json::to_string(items)?;
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, &self.path).await
    }
}

/// Module that posts fused snapshots to the collector endpoint.
///
/// On every [`FusedStateEvent`](EventKind::FusedStateEvent) it attempts
/// one delivery, enqueues the reading on failure and then redrives the
/// retry queue. Collector trouble never surfaces past a log line.
pub struct Uplink {
    ctx: ModuleCtx,
    endpoint: String,
    client: reqwest::Client,
    queue: RetryQueue,
}

impl Uplink {
    pub fn new(ctx: ModuleCtx, endpoint: &str, retry_file: &Path) -> io::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(io::Error::other)?;
        Ok(Uplink {
            ctx,
            endpoint: endpoint.to_owned(),
            client,
            queue: RetryQueue::new(retry_file),
        })
    }

    /// Posts one reading to the collector. Success is a 2xx response;
    /// everything else, including transport failure, counts as a failed
    /// delivery. No inline retry.
    async fn deliver(&self, reading: &Reading) -> bool {
        match self
            .client
            .post(&self.endpoint)
            .json(reading)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("Collector accepted reading: {}", response.status());
                true
            }
            Ok(response) => {
                warn!("Collector rejected reading: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Collector request failed: {}", e);
                false
            }
        }
    }

    async fn handle_state(&self, state: &FusedState) {
        let reading = Reading::from(state);
        if !self.deliver(&reading).await {
            if let Err(e) = self.queue.push(reading).await {
                error!("Failed to enqueue reading for retry: {}", e);
            }
        }
        // The drain aborts without touching the file when it cannot be
        // read, preserving a potentially salvageable queue.
        if let Err(e) = self
            .queue
            .drain(|reading| async move { self.deliver(&reading).await })
            .await
        {
            error!("Failed to process retry queue: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl Module for Uplink {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => return Ok(()),
                                EventKind::FusedStateEvent(state) => {
                                    self.handle_state(&state).await;
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
