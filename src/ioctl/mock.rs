// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Canned-reply transport.
//!
//! Replies are programmed per command key; every call is counted, so tests
//! can assert how many round-trips an operation really issued. Cache-hit
//! and bitmap-gating behavior shows up directly as ioctl counts.

use std::collections::HashMap;

use crate::{
    ioctl::transport::{MegaTransport, TransportError},
    wire::mbox::MBOX_LEN,
};

/// One programmable command slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockKey {
    Mailbox {
        adapter: u8,
        cmd: u8,
        subop: u8,
    },
    /// `page` is the CDB page byte: EVPD page for INQUIRY, page code for
    /// LOG SENSE, zero otherwise.
    Passthrough {
        adapter: u8,
        channel: u8,
        target: u8,
        opcode: u8,
        page: u8,
    },
    Dcmd {
        adapter: u8,
        opcode: u32,
        device_id: u16,
    },
    SasPassthrough {
        adapter: u8,
        device_id: u16,
        opcode: u8,
        page: u8,
    },
}

#[derive(Debug, Clone)]
enum MockReply {
    Data(Vec<u8>),
    Fail(u8),
}

/// In-memory transport with per-key call counters.
#[derive(Debug, Default)]
pub struct MockTransport {
    adapters: u8,
    replies: HashMap<MockKey, MockReply>,
    counts: HashMap<MockKey, u32>,
}

fn cdb_page(cdb: &[u8]) -> u8 {
    match cdb.first().copied().unwrap_or(0) {
        0x12 => cdb.get(2).copied().unwrap_or(0),        // INQUIRY EVPD page
        0x4D => cdb.get(2).copied().unwrap_or(0) & 0x3F, // LOG SENSE page
        _ => 0,
    }
}

impl MockTransport {
    pub fn new(adapters: u8) -> Self {
        Self {
            adapters,
            ..Self::default()
        }
    }

    /// Programs a successful reply for `key`.
    pub fn program(&mut self, key: MockKey, data: Vec<u8>) -> &mut Self {
        self.replies.insert(key, MockReply::Data(data));
        self
    }

    /// Programs a firmware failure status for `key`.
    pub fn program_failure(&mut self, key: MockKey, status: u8) -> &mut Self {
        self.replies.insert(key, MockReply::Fail(status));
        self
    }

    /// How many times `key` was issued.
    pub fn count(&self, key: &MockKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Total calls across all keys.
    pub fn total_calls(&self) -> u32 {
        self.counts.values().sum()
    }

    fn answer(&mut self, key: MockKey, out: &mut [u8]) -> Result<usize, TransportError> {
        *self.counts.entry(key.clone()).or_insert(0) += 1;
        match self.replies.get(&key) {
            Some(MockReply::Data(data)) => {
                let n = data.len().min(out.len());
                out[..n].copy_from_slice(&data[..n]);
                Ok(n)
            },
            Some(MockReply::Fail(status)) => {
                Err(crate::ioctl::transport::firmware_error(*status))
            },
            None => Err(TransportError::Unsupported("no reply programmed")),
        }
    }
}

impl MegaTransport for MockTransport {
    fn adapter_count(&mut self) -> Result<u8, TransportError> {
        Ok(self.adapters)
    }

    fn mailbox(
        &mut self,
        adapter: u8,
        mbox: [u8; MBOX_LEN],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.answer(
            MockKey::Mailbox {
                adapter,
                cmd: mbox[0],
                subop: mbox[1],
            },
            out,
        )
    }

    fn passthrough(
        &mut self,
        adapter: u8,
        channel: u8,
        target: u8,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.answer(
            MockKey::Passthrough {
                adapter,
                channel,
                target,
                opcode: cdb.first().copied().unwrap_or(0),
                page: cdb_page(cdb),
            },
            out,
        )
    }

    fn dcmd(
        &mut self,
        adapter: u8,
        opcode: u32,
        mbox: [u8; 12],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.answer(
            MockKey::Dcmd {
                adapter,
                opcode,
                device_id: u16::from_le_bytes([mbox[0], mbox[1]]),
            },
            out,
        )
    }

    fn sas_passthrough(
        &mut self,
        adapter: u8,
        device_id: u16,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.answer(
            MockKey::SasPassthrough {
                adapter,
                device_id,
                opcode: cdb.first().copied().unwrap_or(0),
                page: cdb_page(cdb),
            },
            out,
        )
    }
}
