// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Push module for the navbox daemon
//!
//! Serves the live WebSocket channel on `/api/position`. Every subscriber
//! receives the latest fused snapshot immediately on connect and again on
//! a fixed tick while connected, whether or not a new fusion cycle ran in
//! between. Each connection is its own stream, so one broken subscriber
//! never affects the others.

use module_core::{EventKind, FusedStatePtr, Module, ModuleCtx};
use rocket::State;
use rocket::futures::{StreamExt, TryStreamExt};
use rocket_ws::Message;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{error, info};

/// Fixed interval between pushes to a connected subscriber.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// State shared between the module loop and the WebSocket handlers.
pub struct PushCtx {
    /// The latest fused snapshot, `None` until the first fusion succeeds.
    latest: RwLock<Option<FusedStatePtr>>,
    /// Bus access for per-connection quit signaling.
    sender: tokio::sync::broadcast::Sender<module_core::Event>,
}

impl PushCtx {
    /// Serializes the current snapshot, or `None` when no fusion has
    /// succeeded yet.
    fn current_message(&self) -> Option<String> {
        let latest = self.latest.read().unwrap_or_else(|e| e.into_inner());
        let state = latest.as_ref()?;
        match state.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Failed to serialize fused state: {}", e);
                Some("{}".to_string())
            }
        }
    }
}

/// WebSocket handler that streams fused snapshots to one subscriber.
///
/// Route: GET /api/position
/// Sends the current snapshot immediately if one exists, then the current
/// snapshot on every tick. Terminates on QuitEvent, client close, or
/// errors; termination of one stream never touches other subscribers.
#[rocket::get("/api/position")]
fn ws_position_handler(
    ws: rocket_ws::WebSocket,
    ctx: &State<Arc<PushCtx>>,
) -> rocket_ws::Stream!['static] {
    let ctx = ctx.inner().clone();
    rocket_ws::Stream! { ws =>
        let mut stream_ws = ws.into_stream();
        let mut events = ctx.sender.subscribe();
        info!("WebSocket subscriber connected to /api/position");

        if let Some(json) = ctx.current_message() {
            yield Message::Text(json);
        }

        let mut tick = tokio::time::interval(TICK_INTERVAL);
        // The immediate first tick duplicates the connect-time send.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Some(json) = ctx.current_message() {
                        yield Message::Text(json);
                    }
                }
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                info!("Shutting down WebSocket position handler due to QuitEvent");
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Error receiving event in WebSocket position handler: {}", e);
                            break;
                        }
                    }
                }
                Some(msg) = stream_ws.next() => {
                    match msg {
                        Ok(Message::Close(_)) => {
                            info!("WebSocket subscriber disconnected from /api/position");
                            break;
                        }
                        Ok(_) => {
                        }
                        Err(e) => {
                            error!("WebSocket error: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Module hosting the WebSocket push server.
pub struct Push {
    ctx: ModuleCtx,
    port: u16,
    push_ctx: Arc<PushCtx>,
}

impl Push {
    pub fn new(ctx: ModuleCtx, port: u16) -> Self {
        let push_ctx = Arc::new(PushCtx {
            latest: RwLock::new(None),
            sender: ctx.sender.clone(),
        });
        Push {
            ctx,
            port,
            push_ctx,
        }
    }
}

#[async_trait::async_trait]
impl Module for Push {
    async fn run(&mut self) -> Result<(), ()> {
        let figment = rocket::Config::figment()
            .merge(("port", self.port))
            .merge(("address", "0.0.0.0"))
            .merge(("cli_colors", false));
        let rocket = rocket::custom(figment)
            .mount("/", rocket::routes![ws_position_handler])
            .manage(self.push_ctx.clone())
            .ignite()
            .await
            .map_err(|e| {
                error!("Failed to ignite the push server: {}", e);
            })?;
        let shutdown = rocket.shutdown();
        let server = tokio::spawn(rocket.launch());
        info!("Started WebSocket push server on port {}", self.port);

        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => {
                                    shutdown.notify();
                                    break;
                                }
                                EventKind::FusedStateEvent(state) => {
                                    *self
                                        .push_ctx
                                        .latest
                                        .write()
                                        .unwrap_or_else(|e| e.into_inner()) = Some(state);
                                }
                            }
                        }
                        Err(e) => error!("Error receiving event: {}", e),
                    }
                }
            }
        }
        server.abort();
        Ok(())
    }
}
