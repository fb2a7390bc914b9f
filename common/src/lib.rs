// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common crate for the navbox daemon
//!
//! Provides the data types that are shared across every module.

pub mod fix;
pub mod fused_state;
