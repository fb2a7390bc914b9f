// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::fix::Constellation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The authoritative heading-and-position snapshot of one fusion cycle.
///
/// Exactly one snapshot is authoritative at a time. The fusion module
/// publishes a new one on every successful cycle and all consumers (uplink,
/// push, recorder) read it as an immutable shared value. Snapshots are not
/// versioned or diffed.
///
/// The serialized form of this struct is the message sent on the push
/// channel to WebSocket subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusedState {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub satellites: u32,
    pub hdop: Option<f64>,
    pub sbas: bool,
    pub constellations: BTreeSet<Constellation>,
}

impl FusedState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
