// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Legacy disk-array configuration blob (v2 and v34 firmware).
//!
//! The blob is a one-byte logical-drive count followed by a fixed array of
//! per-LD records (8 slots on v2, 40 on v34). Each record nests up to eight
//! span records; each span names its member disks by channel/target byte
//! pairs. Device ids are small dense integers: `channel * 16 + target`
//! indexes the physical-drive slot array directly.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    little_endian::U32,
};

use crate::wire::product::{LEGACY_MAX_LD_V2, LEGACY_MAX_LD_V34};

/// Span slots per logical-drive record.
pub const LEGACY_MAX_SPANS_PER_LD: usize = 8;
/// Disk slots per span record.
pub const LEGACY_MAX_ROW: usize = 8;

/// One channel/target reference inside a span record.
///
/// Both fields carry 4 significant bits; firmware pads unused slots with
/// 0xFF in both bytes.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
pub struct DeviceRef {
    pub channel: u8,
    pub target: u8,
}

impl DeviceRef {
    pub const UNUSED: u8 = 0xFF;

    pub fn is_unused(&self) -> bool {
        self.channel == Self::UNUSED && self.target == Self::UNUSED
    }
}

/// One span record: block range plus member disks.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SpanConf {
    pub start_block: U32,                    // 0..4
    pub num_blocks: U32,                     // 4..8   per-disk blocks
    pub device: [DeviceRef; LEGACY_MAX_ROW], // 8..24
}

/// One logical-drive record.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct LogDrvConf {
    pub span_depth: u8,                            // 0
    pub raid_level: u8,                            // 1
    pub read_ahead: u8,                            // 2
    pub stripe_size: u8,                           // 3
    pub status: u8,                                // 4
    pub row_size: u8,                              // 5   disks per span
    _pad: [u8; 2],                                 // 6..8
    pub spans: [SpanConf; LEGACY_MAX_SPANS_PER_LD], // 8..200
}

/// Size of one logical-drive record.
pub const LOGDRV_CONF_LEN: usize = 8 + 24 * LEGACY_MAX_SPANS_PER_LD;

/// Blob header: the logical-drive count, range-checked by the parser.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DiskArrayHeader {
    pub numldrv: u8,
    _pad: [u8; 3],
}

/// Full v2 configuration blob, used to build test fixtures.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DiskArrayConfV2 {
    pub header: DiskArrayHeader,
    pub ldrv: [LogDrvConf; LEGACY_MAX_LD_V2],
}

/// Full v34 configuration blob, used to build test fixtures.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DiskArrayConfV34 {
    pub header: DiskArrayHeader,
    pub ldrv: [LogDrvConf; LEGACY_MAX_LD_V34],
}

/// Size of the v2 configuration reply buffer.
pub const DISK_ARRAY_V2_LEN: usize = 4 + LOGDRV_CONF_LEN * LEGACY_MAX_LD_V2;
/// Size of the v34 configuration reply buffer.
pub const DISK_ARRAY_V34_LEN: usize = 4 + LOGDRV_CONF_LEN * LEGACY_MAX_LD_V34;
