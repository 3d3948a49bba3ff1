// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Formats a 512-byte-block count as a human-readable capacity string.
///
/// Firmware reports drive and span sizes in blocks; reports show them in
/// binary units (KiB/MiB/GiB/TiB) with one decimal place.
pub fn format_capacity(blocks: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = (blocks as f64) * 512.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
