// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::Deserialize;
use std::io;

/// Validated process configuration.
///
/// Every key is required; a configuration file missing any of them fails
/// deserialization and aborts startup.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub gps_port_a: String,
    pub gps_port_b: String,
    pub baudrate: u32,
    pub server_url: String,
    pub websocket_port: u16,
}

impl Config {
    pub fn load(path: &str) -> io::Result<Config> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(io::Error::from)
    }
}
