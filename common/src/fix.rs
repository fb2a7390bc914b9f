// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Represents a decoded position reading from one receiver at one instant.
///
/// A `Fix` is an immutable value type. It is produced by decoding a GGA
/// sentence and discarded at the end of the poll cycle that consumed it.
/// Latitude values range from -90.0 to 90.0, longitude values from
/// -180.0 to 180.0 (positive for north/east).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    latitude: f64,
    longitude: f64,
    satellites: u32,
    hdop: Option<f64>,
    sbas: bool,
}

impl Fix {
    /// Creates a new [`Fix`] with the given position and quality data.
    ///
    /// # Arguments
    ///
    /// * `latitude` – Latitude in decimal degrees. Positive for northern hemisphere.
    /// * `longitude` – Longitude in decimal degrees. Positive for eastern hemisphere.
    /// * `satellites` – Number of satellites used for the fix.
    /// * `hdop` – Horizontal dilution of precision, if the receiver reported one.
    /// * `sbas` – Whether the fix quality indicates SBAS augmentation.
    pub fn new(latitude: f64, longitude: f64, satellites: u32, hdop: Option<f64>, sbas: bool) -> Fix {
        Fix {
            latitude,
            longitude,
            satellites,
            hdop,
            sbas,
        }
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the number of satellites used for this fix.
    pub fn satellites(&self) -> u32 {
        self.satellites
    }

    /// Returns the horizontal dilution of precision, if reported.
    pub fn hdop(&self) -> Option<f64> {
        self.hdop
    }

    /// Returns true when the fix quality field carried the SBAS code.
    pub fn sbas(&self) -> bool {
        self.sbas
    }
}

/// The GNSS constellations a receiver can track, identified by PRN bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Constellation {
    Gps,
    Glonass,
    BeiDou,
    Galileo,
}

impl Constellation {
    /// Maps a satellite PRN to its constellation band.
    ///
    /// Bands: GPS 1-32, GLONASS 65-88, BeiDou 201-235, Galileo 301-336.
    /// PRNs outside these bands return `None` and are ignored by callers,
    /// they are not an error.
    pub fn from_prn(prn: u32) -> Option<Constellation> {
        match prn {
            1..=32 => Some(Constellation::Gps),
            65..=88 => Some(Constellation::Glonass),
            201..=235 => Some(Constellation::BeiDou),
            301..=336 => Some(Constellation::Galileo),
            _ => None,
        }
    }
}

/// The set of constellations currently active on one receiver.
///
/// Derived from the PRN list of a GSA sentence. GSA sentences arrive less
/// frequently than GGA sentences, so a `SatelliteStatus` stays valid until
/// the next one is decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteStatus {
    constellations: BTreeSet<Constellation>,
}

impl SatelliteStatus {
    /// Creates a new [`SatelliteStatus`] from a set of constellations.
    pub fn new(constellations: BTreeSet<Constellation>) -> SatelliteStatus {
        SatelliteStatus { constellations }
    }

    /// Returns the active constellations.
    pub fn constellations(&self) -> &BTreeSet<Constellation> {
        &self.constellations
    }

    /// Returns the union of this status with another one.
    pub fn union(&self, other: &SatelliteStatus) -> SatelliteStatus {
        SatelliteStatus {
            constellations: self
                .constellations
                .union(&other.constellations)
                .copied()
                .collect(),
        }
    }
}
