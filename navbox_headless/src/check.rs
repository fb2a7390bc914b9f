// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Read-only receiver diagnostic.
//!
//! Opens each configured port and waits for any recognized sentence within
//! a bounded timeout. Reuses the sentence classifier directly; nothing is
//! fused or forwarded.

use crate::config::Config;
use std::io;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// How long to wait per port for a recognized sentence.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Checks both receivers. `Ok` only when every port responded.
pub fn run(config: &Config) -> Result<(), ()> {
    let mut all_ports_ok = true;
    for (label, port) in [("A", &config.gps_port_a), ("B", &config.gps_port_b)] {
        if !check_port(label, port, config.baudrate) {
            all_ports_ok = false;
        }
    }
    if all_ports_ok {
        info!("All receivers are connected and responding.");
        Ok(())
    } else {
        error!("One or more receivers failed to respond. Check connections and power.");
        Err(())
    }
}

fn check_port(label: &str, port_path: &str, baudrate: u32) -> bool {
    let mut port = match serialport::new(port_path, baudrate)
        .timeout(Duration::from_secs(1))
        .open()
    {
        Ok(port) => port,
        Err(e) => {
            error!("Failed to open {}: {}", port_path, e);
            return false;
        }
    };
    info!("Checking receiver {} on {}...", label, port_path);

    let deadline = Instant::now() + RESPONSE_TIMEOUT;
    let mut pending = String::new();
    let mut chunk = [0u8; 256];
    while Instant::now() < deadline {
        match port.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => {
                pending.push_str(&String::from_utf8_lossy(&chunk[..n]));
                while let Some(pos) = pending.find('\n') {
                    let line: String = pending.drain(..=pos).collect();
                    let line = line.trim();
                    if nmea::classify(line).is_some() {
                        info!("Receiver {} on {} responded with: {}", label, port_path, line);
                        return true;
                    }
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => {
                error!("Error reading from {}: {}", port_path, e);
                return false;
            }
        }
    }
    error!("No recognized sentence received from {}", port_path);
    false
}
