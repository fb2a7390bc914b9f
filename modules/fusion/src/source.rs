// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fix::{Fix, SatelliteStatus};
use nmea::Sentence;
use serialport::SerialPort;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Fixed backoff between attempts to open a receiver port.
const OPEN_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Read timeout on the serial port. A cycle without a qualifying sentence
/// within this timeout simply yields nothing for that source.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on buffered bytes without a newline before the accumulated
/// garbage is discarded.
const MAX_PENDING_BYTES: usize = 4096;

/// A decoded update from one receiver.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceUpdate {
    /// A new position fix decoded from a GGA sentence.
    Fix(Fix),
    /// A new satellite status decoded from a GSA sentence.
    Satellites(SatelliteStatus),
}

/// One receiver source feeding decoded sentence updates to the fusion loop.
///
/// `open` spawns a dedicated reader thread that owns the serial port:
/// blocking serial reads must not run on the async runtime. The thread
/// retries failed port opens indefinitely with a fixed backoff instead of
/// aborting startup, accumulates newline-terminated ASCII sentences, and
/// forwards every decoded update over a channel. It exits when the fusion
/// side drops the source.
pub struct SerialSource {
    updates: mpsc::Receiver<SourceUpdate>,
}

impl SerialSource {
    /// Opens the receiver on `port_path` and starts its reader thread.
    ///
    /// `label` names the receiver ("A" or "B") in log output.
    pub fn open(label: &str, port_path: &str, baudrate: u32) -> SerialSource {
        let (tx, rx) = mpsc::channel(16);
        let label = label.to_owned();
        let port_path = port_path.to_owned();
        std::thread::spawn(move || reader_loop(&label, &port_path, baudrate, &tx));
        SerialSource { updates: rx }
    }

    /// Creates a source fed from an external channel instead of a serial
    /// port. Used by tests and replay tooling.
    pub fn from_updates(updates: mpsc::Receiver<SourceUpdate>) -> SerialSource {
        SerialSource { updates }
    }

    /// Receives the next decoded update, or `None` once the reader is gone.
    pub async fn recv(&mut self) -> Option<SourceUpdate> {
        self.updates.recv().await
    }
}

/// Outermost loop of the reader thread: open with backoff, pump until a
/// hard read error, reopen.
fn reader_loop(label: &str, port_path: &str, baudrate: u32, tx: &mpsc::Sender<SourceUpdate>) {
    loop {
        let port = match serialport::new(port_path, baudrate)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(port) => port,
            Err(e) => {
                error!("Failed to open receiver {} on {}: {}", label, port_path, e);
                std::thread::sleep(OPEN_RETRY_BACKOFF);
                continue;
            }
        };
        info!("Opened receiver {} on {}", label, port_path);
        if !pump_sentences(label, port, tx) {
            return;
        }
        warn!(
            "Receiver {} on {} dropped, reopening in {:?}",
            label, port_path, OPEN_RETRY_BACKOFF
        );
        std::thread::sleep(OPEN_RETRY_BACKOFF);
    }
}

/// Reads sentences from the open port until a hard error or until the
/// fusion side is gone. Returns true when the port should be reopened.
fn pump_sentences(
    label: &str,
    mut port: Box<dyn SerialPort>,
    tx: &mpsc::Sender<SourceUpdate>,
) -> bool {
    let mut pending = String::new();
    let mut chunk = [0u8; 256];
    loop {
        if tx.is_closed() {
            return false;
        }
        match port.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => {
                pending.push_str(&String::from_utf8_lossy(&chunk[..n]));
                while let Some(pos) = pending.find('\n') {
                    let line: String = pending.drain(..=pos).collect();
                    if let Some(update) = decode_line(label, line.trim())
                        && tx.blocking_send(update).is_err()
                    {
                        return false;
                    }
                }
                if pending.len() > MAX_PENDING_BYTES {
                    debug!("Discarding {} unterminated bytes from receiver {}", pending.len(), label);
                    pending.clear();
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => {
                error!("Read from receiver {} failed: {}", label, e);
                return true;
            }
        }
    }
}

/// Routes one line through the sentence decoder. Sentence types outside
/// the consumed subset and malformed sentences yield nothing.
fn decode_line(label: &str, line: &str) -> Option<SourceUpdate> {
    match nmea::classify(line)? {
        Sentence::Gga => {
            let fix = nmea::decode_gga(line)?;
            debug!(
                "Receiver {}: fix ({:.6}, {:.6}), {} sats",
                label,
                fix.latitude(),
                fix.longitude(),
                fix.satellites()
            );
            Some(SourceUpdate::Fix(fix))
        }
        Sentence::Gsa => Some(SourceUpdate::Satellites(nmea::decode_gsa(line))),
    }
}
