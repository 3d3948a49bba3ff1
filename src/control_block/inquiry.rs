// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! INQUIRY (6): CDB fillers that write into a provided 16-byte buffer,
//! plus parsers for the standard reply and the unit-serial EVPD page.
//!
//! CDB layout (SPC):
//!   [0] = 0x12 (INQUIRY)
//!   [1] = EVPD (bit 0)
//!   [2] = Page Code (only when EVPD=1; else 0)
//!   [3] = reserved
//!   [4] = Allocation Length (u8)
//!   [5] = Control

use anyhow::{Result, bail};

use crate::control_block::common::{
    DEVICE_TYPE_DISK, QUALIFIER_CONNECTED, trim_fixed,
};

pub const INQUIRY_OPCODE: u8 = 0x12;
/// EVPD page: unit serial number.
pub const VPD_UNIT_SERIAL: u8 = 0x80;

/// Fill a **Standard INQUIRY (EVPD=0)** CDB.
#[inline]
pub fn fill_inquiry_standard(cdb: &mut [u8; 16], allocation_len: u8) {
    cdb.fill(0);
    cdb[0] = INQUIRY_OPCODE;
    cdb[4] = allocation_len;
}

/// Fill a **VPD INQUIRY (EVPD=1)** CDB for the given page.
#[inline]
pub fn fill_inquiry_vpd(cdb: &mut [u8; 16], page_code: u8, allocation_len: u8) {
    cdb.fill(0);
    cdb[0] = INQUIRY_OPCODE;
    cdb[1] = 0x01; // EVPD=1
    cdb[2] = page_code;
    cdb[4] = allocation_len;
}

/// Parsed Standard INQUIRY reply.
#[derive(Debug, Clone)]
pub struct InquiryStandard {
    pub peripheral_qualifier: u8, // bits 7..5 of byte0
    pub device_type: u8,          // bits 4..0 of byte0
    pub removable: bool,          // byte1 bit7
    pub version: u8,              // byte2
    pub vendor_id: String,        // bytes 8..16
    pub product_id: String,       // bytes 16..32
    pub product_rev: String,      // bytes 32..36
}

impl InquiryStandard {
    /// Presence rule: only a connected, direct-access device counts as a
    /// present disk. Anything else is an empty slot, an enclosure processor,
    /// or a device this tool does not manage.
    pub fn is_present_disk(&self) -> bool {
        self.peripheral_qualifier == QUALIFIER_CONNECTED
            && self.device_type == DEVICE_TYPE_DISK
    }
}

/// Parse a Standard INQUIRY (EVPD=0) reply (minimum 36 bytes).
pub fn parse_inquiry_standard(buf: &[u8]) -> Result<InquiryStandard> {
    if buf.len() < 36 {
        bail!("INQUIRY buffer too short: {}", buf.len());
    }
    let b0 = buf[0];

    Ok(InquiryStandard {
        peripheral_qualifier: (b0 >> 5) & 0x07,
        device_type: b0 & 0x1F,
        removable: (buf[1] & 0x80) != 0,
        version: buf[2],
        vendor_id: trim_fixed(&buf[8..16]),
        product_id: trim_fixed(&buf[16..32]),
        product_rev: trim_fixed(&buf[32..36]),
    })
}

/// Parse a VPD 0x80 (Unit Serial Number) reply: ASCII, space-padded.
pub fn parse_unit_serial(buf: &[u8]) -> Result<String> {
    if buf.len() < 4 {
        bail!("VPD buffer too short: {}", buf.len());
    }
    if buf[1] != VPD_UNIT_SERIAL {
        bail!("expected VPD page 0x80, got 0x{:02X}", buf[1]);
    }
    let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < 4 + len {
        bail!(
            "VPD truncated: header says {} bytes, have {}",
            len,
            buf.len().saturating_sub(4)
        );
    }
    Ok(trim_fixed(&buf[4..4 + len]))
}
