// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LOG SENSE (10): CDB filler plus the log-page parser.
//!
//! Reply layout (SPC):
//!   [0] = page code (bits 5..0)
//!   [1] = subpage code
//!   [2..4] = page length (BE), then a list of parameters:
//!     {param code u16 BE, control u8, length u8, value bytes}
//!
//! Counter values are big-endian and variable-width (1..8 bytes).

use anyhow::{Result, bail, ensure};

pub const LOG_SENSE_OPCODE: u8 = 0x4D;

/// Page codes this tool knows how to interpret.
pub const PAGE_SUPPORTED: u8 = 0x00;
pub const PAGE_WRITE_ERRORS: u8 = 0x02;
pub const PAGE_READ_ERRORS: u8 = 0x03;
pub const PAGE_VERIFY_ERRORS: u8 = 0x05;
pub const PAGE_TEMPERATURE: u8 = 0x0D;
pub const PAGE_SELF_TEST: u8 = 0x10;

/// Fill a LOG SENSE(10) CDB: PC=cumulative, subpage=0, no paramptr.
#[inline]
pub fn fill_log_sense(cdb: &mut [u8; 16], page_code: u8, allocation_len: u16) {
    cdb.fill(0);
    cdb[0] = LOG_SENSE_OPCODE;
    cdb[2] = (0b01 << 6) | (page_code & 0x3F); // PC=1: cumulative values
    let [msb, lsb] = allocation_len.to_be_bytes();
    cdb[7] = msb;
    cdb[8] = lsb;
}

/// Error-counter page (read/write/verify), reduced to the counters the
/// report shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCounters {
    pub corrected: u64,
    pub uncorrected: u64,
    pub bytes_processed: u64,
}

/// Temperature page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Temperature {
    pub current_c: u8,
    pub reference_c: Option<u8>,
}

/// One self-test results entry (page 0x10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestResult {
    pub test_code: u8,       // byte0 bits 7..5
    pub result: u8,          // byte0 bits 3..0, 0 = completed without error
    pub test_number: u8,     // byte1
    pub power_on_hours: u16, // bytes 2..4
    pub failing_lba: u64,    // bytes 4..12
    pub sense_key: u8,       // byte12 bits 3..0
    pub asc: u8,             // byte13
    pub ascq: u8,            // byte14
}

/// Parsed content of one log page, keyed by page code in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogPageData {
    SupportedPages(Vec<u8>),
    Counters(ErrorCounters),
    Temperature(Temperature),
    SelfTest(Vec<SelfTestResult>),
    Raw(Vec<u8>),
}

/// A parsed log-sense page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPage {
    pub code: u8,
    pub data: LogPageData,
}

impl LogPage {
    /// For the supported-pages bitmap: whether `page` is advertised.
    pub fn supports(&self, page: u8) -> bool {
        match &self.data {
            LogPageData::SupportedPages(codes) => codes.contains(&page),
            _ => false,
        }
    }
}

/// Generic page header view: returns (page_code, payload).
fn page_payload(buf: &[u8]) -> Result<(u8, &[u8])> {
    if buf.len() < 4 {
        bail!("log page too short: {}", buf.len());
    }
    let page_code = buf[0] & 0x3F;
    let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < 4 + len {
        bail!(
            "log page truncated: header says {} bytes, have {}",
            len,
            buf.len().saturating_sub(4)
        );
    }
    Ok((page_code, &buf[4..4 + len]))
}

/// Iterates log parameters as (code, value) pairs, stopping at the first
/// truncated descriptor.
fn parameters(payload: &[u8]) -> Vec<(u16, &[u8])> {
    let mut out = Vec::new();
    let mut off = 0usize;
    while off + 4 <= payload.len() {
        let code = u16::from_be_bytes([payload[off], payload[off + 1]]);
        let len = payload[off + 3] as usize;
        let start = off + 4;
        let end = start.saturating_add(len);
        if end > payload.len() {
            break;
        }
        out.push((code, &payload[start..end]));
        off = end;
    }
    out
}

/// Big-endian variable-width counter value.
fn be_counter(value: &[u8]) -> u64 {
    let mut v = 0u64;
    for &b in value.iter().take(8) {
        v = (v << 8) | b as u64;
    }
    v
}

/// Parse a raw LOG SENSE reply into a [`LogPage`].
///
/// Unknown page codes come back as `Raw` so the `-l<page>` flag can dump
/// pages this tool has no structured view for.
pub fn parse_log_page(buf: &[u8]) -> Result<LogPage> {
    let (code, payload) = page_payload(buf)?;

    let data = match code {
        PAGE_SUPPORTED => LogPageData::SupportedPages(payload.to_vec()),
        PAGE_WRITE_ERRORS | PAGE_READ_ERRORS | PAGE_VERIFY_ERRORS => {
            let mut counters = ErrorCounters::default();
            for (param, value) in parameters(payload) {
                match param {
                    0x0003 => counters.corrected = be_counter(value),
                    0x0005 => counters.bytes_processed = be_counter(value),
                    0x0006 => counters.uncorrected = be_counter(value),
                    _ => {},
                }
            }
            LogPageData::Counters(counters)
        },
        PAGE_TEMPERATURE => {
            let mut temp = Temperature::default();
            for (param, value) in parameters(payload) {
                match (param, value.len()) {
                    (0x0000, 2..) => temp.current_c = value[1],
                    (0x0001, 2..) => temp.reference_c = Some(value[1]),
                    _ => {},
                }
            }
            LogPageData::Temperature(temp)
        },
        PAGE_SELF_TEST => {
            let mut entries = Vec::new();
            for (_, value) in parameters(payload) {
                ensure!(
                    value.len() >= 16,
                    "self-test parameter too short: {}",
                    value.len()
                );
                // Unused entries have an all-zero timestamp and result.
                if value.iter().all(|&b| b == 0) {
                    continue;
                }
                entries.push(SelfTestResult {
                    test_code: (value[0] >> 5) & 0x07,
                    result: value[0] & 0x0F,
                    test_number: value[1],
                    power_on_hours: u16::from_be_bytes([value[2], value[3]]),
                    failing_lba: be_counter(&value[4..12]),
                    sense_key: value[12] & 0x0F,
                    asc: value[13],
                    ascq: value[14],
                });
            }
            LogPageData::SelfTest(entries)
        },
        _ => LogPageData::Raw(payload.to_vec()),
    };

    Ok(LogPage { code, data })
}
