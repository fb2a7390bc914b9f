// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Decoder for the NMEA sentence subset emitted by the vessel receivers.
//!
//! Only fix sentences (GGA, two talker-id variants) and satellite-status
//! sentences (GSA) are consumed. The decoder never fails past its boundary:
//! malformed or "no fix" sentences are expected on a live serial line and
//! yield `None`/empty results instead of errors. Checksums are not verified.

use common::fix::{Constellation, Fix, SatelliteStatus};
use std::collections::BTreeSet;
use tracing::debug;

/// GGA fix-quality code for an SBAS (DGPS) augmented fix.
const SBAS_FIX_QUALITY: u32 = 2;

/// The sentence types the daemon consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentence {
    /// Position fix sentence (`$GPGGA` / `$GNGGA`).
    Gga,
    /// Active-satellite status sentence (`$GPGSA` / `$GNGSA`).
    Gsa,
}

/// Classifies a raw line by its sentence prefix.
///
/// Returns `None` for every sentence type outside the consumed subset, so
/// callers can skip them without treating them as errors.
pub fn classify(line: &str) -> Option<Sentence> {
    if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
        Some(Sentence::Gga)
    } else if line.starts_with("$GPGSA") || line.starts_with("$GNGSA") {
        Some(Sentence::Gsa)
    } else {
        None
    }
}

/// Decodes a GGA fix sentence into a [`Fix`].
///
/// Requires at least 9 comma-separated fields with non-empty latitude and
/// longitude fields, otherwise returns `None`. A "no fix" sentence with
/// empty position fields is a normal receiver condition, not an error.
///
/// Latitude and longitude are encoded as `ddmm.mmmm`; the conversion to
/// decimal degrees is `trunc(v / 100) + (v mod 100) / 60`, with the sign
/// flipped for the `S` and `W` hemisphere letters. The satellite count
/// defaults to 0 and the HDOP to absent when their fields are empty or
/// unparsable.
pub fn decode_gga(line: &str) -> Option<Fix> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 9 || parts[2].is_empty() || parts[4].is_empty() {
        debug!("Skipping GGA sentence without position: {}", line);
        return None;
    }
    let latitude = decode_coordinate(parts[2], parts[3] == "S")?;
    let longitude = decode_coordinate(parts[4], parts[5] == "W")?;
    let sbas = parts[6].parse::<u32>() == Ok(SBAS_FIX_QUALITY);
    let satellites = parts[7].parse::<u32>().unwrap_or(0);
    let hdop = parts[8].parse::<f64>().ok();
    Some(Fix::new(latitude, longitude, satellites, hdop, sbas))
}

/// Decodes a GSA satellite-status sentence into a [`SatelliteStatus`].
///
/// The PRN list occupies fields 4 to 15 inclusive. Empty PRN fields are
/// skipped and PRNs outside the known constellation bands are ignored.
/// A sentence with too few fields or no recognized PRN yields an empty set.
pub fn decode_gsa(line: &str) -> SatelliteStatus {
    let constellations: BTreeSet<Constellation> = line
        .split(',')
        .skip(3)
        .take(12)
        .filter(|field| !field.is_empty())
        .filter_map(|field| field.parse::<u32>().ok())
        .filter_map(Constellation::from_prn)
        .collect();
    SatelliteStatus::new(constellations)
}

/// Converts a `ddmm.mmmm` encoded coordinate field to decimal degrees.
fn decode_coordinate(field: &str, southern_or_western: bool) -> Option<f64> {
    let raw = match field.parse::<f64>() {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Failed to parse coordinate field {:?}: {}", field, e);
            return None;
        }
    };
    let degrees = (raw / 100.0).trunc() + (raw % 100.0) / 60.0;
    if southern_or_western {
        Some(-degrees)
    } else {
        Some(degrees)
    }
}
