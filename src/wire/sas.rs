// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SAS reply layouts: controller info, physical-device list, per-device
//! info, and the RAID configuration blob (`MR_CONF`).

use bitflags::bitflags;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    little_endian::{U16, U32, U64},
};

/// Span slots per SAS logical-drive record.
pub const SAS_MAX_SPANS_PER_LD: usize = 8;
/// Disk slots per SAS array record.
pub const SAS_MAX_ROW: usize = 32;
/// Device-id value marking an unused array slot.
pub const SAS_DEVICE_ID_UNUSED: u16 = 0xFFFF;

// SAS logical-drive states.
pub const SAS_LD_OFFLINE: u8 = 0x00;
pub const SAS_LD_PARTIALLY_DEGRADED: u8 = 0x01;
pub const SAS_LD_DEGRADED: u8 = 0x02;
pub const SAS_LD_OPTIMAL: u8 = 0x03;

bitflags! {
    /// Firmware physical-drive state bits from the PD-info reply.
    ///
    /// `CONFIGURED` qualifies the online/rebuild/failed bits; the remaining
    /// bits only apply to unconfigured devices.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RawPdState: u16 {
        const CONFIGURED      = 0x0001;
        const ONLINE          = 0x0002;
        const REBUILD         = 0x0004;
        const FAILED          = 0x0008;
        const HOTSPARE        = 0x0010;
        const UNCONFIG_BAD    = 0x0020;
    }
}

/// Controller-info reply (`MR_DCMD_CTRL_GET_INFO`).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SasCtrlInfo {
    pub product_name: [u8; 80],      // 0..80   space-padded ASCII
    pub serial_no: [u8; 32],         // 80..112
    pub fw_version: [u8; 32],        // 112..144
    pub bios_version: [u8; 32],      // 144..176
    pub pd_present_count: U16,       // 176..178
    pub pd_disk_present_count: U16,  // 178..180
    pub ld_present_count: U16,       // 180..182
    pub ld_degraded_count: U16,      // 182..184
    pub ld_offline_count: U16,       // 184..186
    pub max_enclosures: u8,          // 186
    pub rebuild_rate: u8,            // 187
    pub max_commands: U16,           // 188..190
    pub memory_size_mb: U16,         // 190..192
    pub battery_status: u8,          // 192
    _pad: [u8; 3],                   // 193..196
}

/// Size of the controller-info reply buffer.
pub const SAS_CTRL_INFO_LEN: usize = 196;

/// Device-list reply header (`MR_DCMD_PD_GET_LIST`).
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PdListHeader {
    pub size: U32,  // total reply bytes including this header
    pub count: U32, // PdAddress records that follow
}

/// One device-list entry.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
pub struct PdAddress {
    pub device_id: U16,          // 0..2
    pub encl_device_id: U16,     // 2..4
    pub encl_index: u8,          // 4
    pub slot_number: u8,         // 5
    pub scsi_dev_type: u8,       // 6   SCSI peripheral device type
    pub connect_port_bitmap: u8, // 7
    pub sas_addr: [U64; 2],      // 8..24
}

/// Size of one device-list entry.
pub const PD_ADDRESS_LEN: usize = 24;

/// Per-device info reply (`MR_DCMD_PD_GET_INFO`).
///
/// `inquiry_data` is the raw 96-byte SCSI INQUIRY block the firmware
/// gathered from the device, identity strings and peripheral byte included.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SasPdInfo {
    pub device_id: U16,          // 0..2
    pub seq_num: U16,            // 2..4
    pub inquiry_data: [u8; 96],  // 4..100
    pub serial: [u8; 32],        // 100..132 space-padded ASCII
    pub fw_state: U16,           // 132..134 RawPdState bits
    pub encl_device_id: U16,     // 134..136
    pub encl_index: u8,          // 136
    pub slot_number: u8,         // 137
    _pad: [u8; 2],               // 138..140
    pub media_err_count: U32,    // 140..144
    pub other_err_count: U32,    // 144..148
    pub pred_fail_count: U32,    // 148..152
    pub raw_size: U64,           // 152..160 blocks
    pub non_coerced_size: U64,   // 160..168
    pub coerced_size: U64,       // 168..176
}

/// Size of the per-device info reply buffer.
pub const SAS_PD_INFO_LEN: usize = 176;

/// `MR_CONF` header. Record strides come from the header so newer firmware
/// can grow records without breaking older tools.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MrConfHeader {
    pub size: U32,        // total blob bytes
    pub array_count: U16, // array records following the header
    pub array_size: U16,  // bytes per array record
    pub ld_count: U16,    // LD records following the arrays
    pub ld_size: U16,     // bytes per LD record
}

/// Size of the `MR_CONF` header.
pub const MR_CONF_HEADER_LEN: usize = 12;

/// One disk reference inside an array record.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
pub struct MrArrayPd {
    pub device_id: U16,
    pub encl_index: u8,
    pub slot: u8,
}

/// One array record: a stripe set of physical disks.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MrArray {
    pub size: U64,                     // 0..8   blocks contributed per disk
    pub num_rows: u8,                  // 8      populated pd slots
    _pad: [u8; 3],                     // 9..12
    pub pd: [MrArrayPd; SAS_MAX_ROW],  // 12..140
}

/// Size of one array record.
pub const MR_ARRAY_LEN: usize = 12 + 4 * SAS_MAX_ROW;

/// One span entry inside an LD record: a block range carved out of an array.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone, Copy)]
pub struct MrSpan {
    pub start_block: U64, // 0..8
    pub num_blocks: U64,  // 8..16
    pub array_ref: U16,   // 16..18
    _pad: [u8; 6],        // 18..24
}

/// One logical-drive record.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MrLd {
    pub target_id: u8,                       // 0
    pub raid_level: u8,                      // 1
    pub state: u8,                           // 2
    pub span_depth: u8,                      // 3
    pub row_size: u8,                        // 4   disks per span
    _pad: [u8; 3],                           // 5..8
    pub span: [MrSpan; SAS_MAX_SPANS_PER_LD], // 8..200
}

/// Size of one logical-drive record.
pub const MR_LD_LEN: usize = 8 + 24 * SAS_MAX_SPANS_PER_LD;
