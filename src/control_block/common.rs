// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared helpers for SCSI reply parsing.

/// Decodes a fixed-width, space-padded ASCII field into a trimmed String.
/// Non-ASCII and NUL bytes collapse into the surrounding padding.
pub fn trim_fixed(bytes: &[u8]) -> String {
    let s: String = bytes
        .iter()
        .map(|&b| if b.is_ascii() && b != 0 { b as char } else { ' ' })
        .collect();
    s.trim().to_string()
}

/// Peripheral qualifier values from INQUIRY byte 0 (bits 7..5).
pub const QUALIFIER_CONNECTED: u8 = 0x0;

/// Peripheral device type values from INQUIRY byte 0 (bits 4..0).
pub const DEVICE_TYPE_DISK: u8 = 0x00;
