// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SAS DCMD frame layout and opcode constants.
//!
//! SAS adapters (PERC5 family) take a 128-byte MFI frame embedded in a
//! `megasas_iocpacket`; DCMD queries carry a 32-bit opcode plus a 12-byte
//! argument mailbox at fixed offsets inside the frame.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    little_endian::{U16, U32},
};

/// MFI frame length.
pub const MFI_FRAME_LEN: usize = 128;
/// Argument-mailbox length inside a DCMD frame.
pub const DCMD_MBOX_LEN: usize = 12;

/// Frame command byte: direct command.
pub const MFI_CMD_DCMD: u8 = 0x05;
/// Frame command byte: SCSI passthrough to a physical device.
pub const MFI_CMD_PD_SCSI_IO: u8 = 0x04;
/// Firmware completion status: success.
pub const MFI_STAT_OK: u8 = 0x00;

/// Frame flags: data transfer from firmware to host.
pub const MFI_FRAME_DIR_READ: u16 = 0x0010;

// DCMD opcodes consumed by topology discovery.
pub const MR_DCMD_CTRL_GET_INFO: u32 = 0x0101_0000;
pub const MR_DCMD_PD_GET_LIST: u32 = 0x0201_0000;
pub const MR_DCMD_PD_GET_INFO: u32 = 0x0202_0000;
pub const MR_DCMD_LD_GET_LIST: u32 = 0x0301_0000;
pub const MR_DCMD_CFG_READ: u32 = 0x0401_0000;

/// Leading portion of a DCMD frame; the remainder of the 128 bytes holds the
/// scatter-gather list filled in by the transport.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DcmdFrameHeader {
    pub cmd: u8,                 // 0
    _reserved: u8,               // 1
    pub cmd_status: u8,          // 2
    pub sge_count: u8,           // 3
    pub context: U32,            // 4..8
    _pad: [u8; 4],               // 8..12
    pub flags: U16,              // 12..14
    pub timeout: U16,            // 14..16  seconds, enforced by the driver
    pub data_xfer_len: U32,      // 16..20
    pub opcode: U32,             // 20..24
    pub mbox: [u8; DCMD_MBOX_LEN], // 24..36
}

/// Offset of the DCMD header inside the frame (it leads the frame).
pub const DCMD_HEADER_LEN: usize = 36;

/// Scatter-gather entry appended after the frame header.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct MegasasSge {
    pub phys_addr: u64,
    pub length: u32,
    _pad: u32,
}

impl MegasasSge {
    pub fn new(phys_addr: u64, length: u32) -> Self {
        Self {
            phys_addr,
            length,
            _pad: 0,
        }
    }
}

/// Scatter-gather entries per ioctl packet.
pub const MAX_IOCTL_SGE: usize = 16;

/// Userspace ioctl packet wrapping one MFI frame.
#[repr(C)]
pub struct MegasasIocPacket {
    pub host_no: u16,
    _pad: u16,
    pub sgl_off: u32,
    pub sge_count: u32,
    pub sense_off: u32,
    pub sense_len: u32,
    pub frame: [u8; MFI_FRAME_LEN],
    pub sgl: [MegasasSge; MAX_IOCTL_SGE],
}

impl MegasasIocPacket {
    pub fn new(host_no: u16, frame: [u8; MFI_FRAME_LEN]) -> Self {
        Self {
            host_no,
            _pad: 0,
            sgl_off: DCMD_HEADER_LEN as u32,
            sge_count: 0,
            sense_off: 0,
            sense_len: 0,
            frame,
            sgl: [MegasasSge::new(0, 0); MAX_IOCTL_SGE],
        }
    }
}
