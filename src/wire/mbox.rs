// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Legacy mailbox command constants and the uioctl framing structure.
//!
//! Legacy adapters (PERC2/3/4 families) take a 16-byte mailbox embedded in a
//! `uioctl` request. The first mailbox byte is the command, the second a
//! subopcode for the `FC_NEW_CONFIG` command family introduced with 40-LD
//! firmware. The reply is written into a caller-supplied buffer addressed by
//! the framing structure.

/// Mailbox length in bytes.
pub const MBOX_LEN: usize = 16;

/// 40-LD "new config" command; the subopcode selects the query.
pub const FC_NEW_CONFIG: u8 = 0xA1;
/// Subopcode: product info (identity, channel count, `data_size` heuristic).
pub const NC_SUBOP_PRODUCT_INFO: u8 = 0x0E;
/// Subopcode: extended enquiry (LD states, PD states, battery).
pub const NC_SUBOP_ENQUIRY3: u8 = 0x0F;
/// Subopcode: read disk-array configuration (40-LD layout).
pub const NC_SUBOP_READ_CONFIG: u8 = 0x07;

/// 8-LD adapter enquiry (v2 firmware).
pub const MBOX_CMD_ADAPTER_ENQUIRY: u8 = 0x05;
/// 8-LD read disk-array configuration (v2 firmware).
pub const MBOX_CMD_READ_CONFIG_8LD: u8 = 0x04;
/// Per-target media/other/predictive-failure error counters.
pub const MBOX_CMD_PRED_FAIL: u8 = 0x0A;
/// SCSI passthrough through the adapter to one channel/target.
pub const MBOX_CMD_PASSTHRU: u8 = 0x03;

/// Minimum legacy driver interface version this tool understands.
pub const MEGA_MIN_VERSION: u32 = 0x0002_0000;

/// Userspace ioctl framing for legacy mailbox commands.
///
/// Vendor-defined; the kernel driver copies `mbox` into the adapter mailbox,
/// DMAs the reply into `buffer`, and writes the firmware status byte back
/// into `status`.
#[repr(C)]
pub struct Uioctl {
    pub inlen: u32,
    pub outlen: u32,
    pub opcode: u8,
    pub subopcode: u8,
    pub adapno: u8,
    pub status: u8,
    pub mbox: [u8; MBOX_LEN],
    pub buffer: *mut u8,
    pub length: u32,
    _pad: u32,
}

impl Uioctl {
    pub fn new(adapno: u8, mbox: [u8; MBOX_LEN], buffer: *mut u8, length: u32) -> Self {
        Self {
            inlen: 0,
            outlen: length,
            opcode: mbox[0],
            subopcode: mbox[1],
            adapno,
            status: 0,
            mbox,
            buffer,
            length,
            _pad: 0,
        }
    }
}

/// Legacy SCSI passthrough record embedded after the mailbox.
///
/// `timeout` is in seconds and is enforced by the kernel driver, not by this
/// layer.
#[repr(C)]
pub struct Passthru {
    pub timeout: u8,
    pub ars: u8,
    pub channel: u8,
    pub target: u8,
    pub islogical: u8,
    pub logdrv: u8,
    pub cdb_len: u8,
    _pad: u8,
    pub cdb: [u8; 16],
    pub dataxferaddr: u64,
    pub dataxferlen: u32,
    pub scsistatus: u8,
    _pad2: [u8; 3],
}

impl Passthru {
    pub fn new(channel: u8, target: u8, cdb: &[u8], timeout: u8) -> Self {
        let mut fixed = [0u8; 16];
        let n = cdb.len().min(16);
        fixed[..n].copy_from_slice(&cdb[..n]);
        Self {
            timeout,
            ars: 1,
            channel,
            target,
            islogical: 0,
            logdrv: 0,
            cdb_len: n as u8,
            _pad: 0,
            cdb: fixed,
            dataxferaddr: 0,
            dataxferlen: 0,
            scsistatus: 0,
            _pad2: [0; 3],
        }
    }
}
