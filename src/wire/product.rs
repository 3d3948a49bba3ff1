// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Legacy product-info and adapter-enquiry reply layouts.
//!
//! `ProductInfo.data_size` doubles as the firmware-generation heuristic:
//! v2 firmware leaves it zero, v34 firmware fills in the reply size. There
//! is no second signal and no fallback; a misdetected adapter parses wrong.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    little_endian::{U16, U32},
};

/// Dense legacy device addressing: 4-bit channel, 4-bit target.
pub const LEGACY_MAX_CHANNELS: usize = 16;
/// Targets per legacy channel.
pub const TARGETS_PER_CHANNEL: usize = 16;
/// Fixed physical-device slot count for legacy adapters.
pub const LEGACY_MAX_PHYSICALS: usize = LEGACY_MAX_CHANNELS * TARGETS_PER_CHANNEL;

/// Logical-drive slots in the v2 (8-LD) enquiry and config layouts.
pub const LEGACY_MAX_LD_V2: usize = 8;
/// Logical-drive slots in the v34 (40-LD) enquiry and config layouts.
pub const LEGACY_MAX_LD_V34: usize = 40;

// Legacy per-target drive states reported in the enquiry pdrv_state table.
pub const LEGACY_PD_UNCONFIGURED: u8 = 0x00;
pub const LEGACY_PD_UNCONFIGURED_BAD: u8 = 0x01;
pub const LEGACY_PD_ONLINE: u8 = 0x03;
pub const LEGACY_PD_FAILED: u8 = 0x04;
pub const LEGACY_PD_REBUILDING: u8 = 0x05;
pub const LEGACY_PD_HOTSPARE: u8 = 0x06;

// Legacy logical-drive states.
pub const LEGACY_LD_OFFLINE: u8 = 0x00;
pub const LEGACY_LD_DEGRADED: u8 = 0x01;
pub const LEGACY_LD_OPTIMAL: u8 = 0x02;
pub const LEGACY_LD_DELETED: u8 = 0x03;

/// Product-info reply (`FC_NEW_CONFIG` / `NC_SUBOP_PRODUCT_INFO`).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ProductInfo {
    pub data_size: U32,            // 0..4    0 on v2 firmware
    pub config_signature: U32,     // 4..8
    pub fw_version: [u8; 16],      // 8..24   space-padded ASCII
    pub bios_version: [u8; 16],    // 24..40
    pub product_name: [u8; 80],    // 40..120
    pub max_commands: u8,          // 120
    pub nchannels: u8,             // 121
    pub fc_loop_present: u8,       // 122
    pub mem_type: u8,              // 123
    pub signature: U32,            // 124..128
    pub dram_size: U16,            // 128..130 megabytes
    pub subsys_id: U16,            // 130..132
    pub subsys_vendor_id: U16,     // 132..134
    pub notify_counters: u8,       // 134
    _pad: u8,                      // 135
}

/// Size of the product-info reply buffer.
pub const PRODUCT_INFO_LEN: usize = 136;

/// 8-LD adapter enquiry reply (v2 firmware, `MBOX_CMD_ADAPTER_ENQUIRY`).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Enquiry {
    pub num_ldrv: u8,
    pub rebuild_rate: u8,
    pub battery_status: u8,
    _pad: u8,
    pub ldrv_size: [U32; LEGACY_MAX_LD_V2],
    pub ldrv_prop: [u8; LEGACY_MAX_LD_V2],
    pub ldrv_state: [u8; LEGACY_MAX_LD_V2],
    pub pdrv_state: [u8; LEGACY_MAX_PHYSICALS],
}

/// Size of the 8-LD enquiry reply buffer.
pub const ENQUIRY_LEN: usize = 4 + 4 * LEGACY_MAX_LD_V2 + 2 * LEGACY_MAX_LD_V2 + LEGACY_MAX_PHYSICALS;

/// Extended enquiry reply (v34 firmware, `NC_SUBOP_ENQUIRY3`).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Enquiry3 {
    pub data_size: U32,
    pub rebuild_rate: u8,
    pub cache_flush_interval: u8,
    pub sense_alert: u8,
    pub drive_insert_count: u8,
    pub battery_status: u8,
    pub num_ldrv: u8,
    _pad: [u8; 2],
    pub ldrv_size: [U32; LEGACY_MAX_LD_V34],
    pub ldrv_prop: [u8; LEGACY_MAX_LD_V34],
    pub ldrv_state: [u8; LEGACY_MAX_LD_V34],
    pub pdrv_state: [u8; LEGACY_MAX_PHYSICALS],
}

/// Size of the extended enquiry reply buffer.
pub const ENQUIRY3_LEN: usize = 12 + 4 * LEGACY_MAX_LD_V34 + 2 * LEGACY_MAX_LD_V34 + LEGACY_MAX_PHYSICALS;

/// Per-target error counters (`MBOX_CMD_PRED_FAIL` reply entry).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
pub struct DriveErrors {
    pub media_errors: U16,
    pub other_errors: U16,
    pub predictive_failures: U16,
}

/// Predictive-failure reply: one counter record per dense target index.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PredictiveFailure {
    pub counters: [DriveErrors; LEGACY_MAX_PHYSICALS],
}

/// Size of the predictive-failure reply buffer.
pub const PRED_FAIL_LEN: usize = 6 * LEGACY_MAX_PHYSICALS;
