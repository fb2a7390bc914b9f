// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Heading estimation math for the dual-receiver fusion.

use common::fix::Fix;
use std::collections::VecDeque;

/// Calculates the initial great-circle bearing from one fix to another.
///
/// Uses the standard spherical bearing formula
/// `atan2(sin Δλ · cos φ₂, cos φ₁ · sin φ₂ − sin φ₁ · cos φ₂ · cos Δλ)`
/// on the latitudes and longitudes in radians.
///
/// # Parameters
/// - `from`: The fix the bearing is measured at (receiver B on the vessel).
/// - `to`: The fix the bearing points towards (receiver A on the vessel).
///
/// # Returns
/// The compass bearing in degrees, normalized to the range [0, 360).
pub fn initial_bearing(from: &Fix, to: &Fix) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// A fixed-capacity FIFO window over the most recent raw bearings.
///
/// The window holds the last [`HeadingWindow::CAPACITY`] bearings; pushing
/// onto a full window evicts the oldest sample. There is no reset operation,
/// so after a receiver dropout the average stays biased towards stale
/// headings until the window has turned over.
///
/// The smoothed value is the plain arithmetic mean of the degree values,
/// not a circular (vector) mean. Bearing sequences that cross the 0°/360°
/// boundary (e.g. 359°, 1°) therefore average incorrectly. This matches the
/// deployed behavior and stays until a signed-off redesign changes it.
#[derive(Debug, Default)]
pub struct HeadingWindow {
    bearings: VecDeque<f64>,
}

impl HeadingWindow {
    /// Number of raw bearings kept in the window.
    pub const CAPACITY: usize = 5;

    /// Creates an empty [`HeadingWindow`].
    pub fn new() -> Self {
        HeadingWindow {
            bearings: VecDeque::with_capacity(HeadingWindow::CAPACITY),
        }
    }

    /// Pushes a raw bearing onto the window and returns the smoothed heading.
    ///
    /// The oldest sample is evicted when the window is full. The returned
    /// value is the arithmetic mean of all bearings currently in the window,
    /// rounded to two decimal places.
    pub fn smooth(&mut self, raw_bearing: f64) -> f64 {
        if self.bearings.len() == HeadingWindow::CAPACITY {
            self.bearings.pop_front();
        }
        self.bearings.push_back(raw_bearing);
        let mean = self.bearings.iter().sum::<f64>() / self.bearings.len() as f64;
        (mean * 100.0).round() / 100.0
    }
}
