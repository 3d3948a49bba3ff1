// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The vendor ioctl boundary.
//!
//! Everything above this trait works on raw reply buffers; everything below
//! it is an opaque, blocking syscall into the kernel driver. Three request
//! shapes exist: legacy 16-byte mailbox commands, legacy SCSI passthrough to
//! one channel/target, and SAS DCMD frames (with their own passthrough
//! addressed by firmware device id).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::wire::mbox::MBOX_LEN;

/// Errors crossing the transport boundary. All of them are fatal for their
/// scope: the adapter (mailbox/DCMD failures) or the drive (passthrough
/// failures); callers decide which.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("ioctl failed: {0}")]
    Ioctl(#[from] nix::errno::Errno),

    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("driver version {found:#010x} is older than required {required:#010x}")]
    DriverVersion { found: u32, required: u32 },

    #[error("firmware status {status:#04x}: {message}")]
    Firmware { status: u8, message: &'static str },

    #[error("short reply: got {got} bytes, expected at least {want}")]
    ShortReply { got: usize, want: usize },

    #[error("{0}")]
    Unsupported(&'static str),
}

impl TransportError {
    /// A process-lifetime message for recording on a drive slot. Drives keep
    /// the cause of their first failed probe for the rest of the run.
    pub fn static_message(&self) -> &'static str {
        match self {
            TransportError::Ioctl(errno) => errno.desc(),
            TransportError::Firmware { message, .. } => message,
            TransportError::Open { .. } => "cannot open device node",
            TransportError::DriverVersion { .. } => "driver too old",
            TransportError::ShortReply { .. } => "short reply from driver",
            TransportError::Unsupported(msg) => msg,
        }
    }
}

/// Firmware mailbox/frame status byte to message table.
static FIRMWARE_STATUS: Lazy<HashMap<u8, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0x00u8, "success"),
        (0x01, "invalid command"),
        (0x02, "invalid parameter"),
        (0x03, "device not found"),
        (0x04, "adapter busy"),
        (0x05, "adapter timeout"),
        (0x06, "flash in progress"),
        (0x08, "target aborted command"),
        (0x0E, "selection timeout"),
        (0x0F, "command timeout"),
        (0xFF, "command not completed"),
    ])
});

/// Resolves a firmware status byte to a human-readable message.
pub fn firmware_status_message(status: u8) -> &'static str {
    FIRMWARE_STATUS
        .get(&status)
        .copied()
        .unwrap_or("unknown firmware status")
}

/// Builds the per-scope firmware error for a non-zero status byte.
pub fn firmware_error(status: u8) -> TransportError {
    TransportError::Firmware {
        status,
        message: firmware_status_message(status),
    }
}

/// Blocking request/reply transport to one driver node.
///
/// Replies are copied into `out`; implementations return the number of bytes
/// written. Every call blocks until the kernel driver completes or its baked
/// per-command timeout fires; there is no cancellation at this layer.
pub trait MegaTransport {
    /// Number of adapters the driver exposes.
    fn adapter_count(&mut self) -> Result<u8, TransportError>;

    /// Issue a legacy mailbox command (`mbox[0]` = command, `mbox[1]` =
    /// subopcode).
    fn mailbox(
        &mut self,
        adapter: u8,
        mbox: [u8; MBOX_LEN],
        out: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Issue a SCSI CDB to one legacy channel/target through the adapter.
    fn passthrough(
        &mut self,
        adapter: u8,
        channel: u8,
        target: u8,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Issue a SAS DCMD query with a 12-byte argument mailbox.
    fn dcmd(
        &mut self,
        adapter: u8,
        opcode: u32,
        mbox: [u8; 12],
        out: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Issue a SCSI CDB to one SAS device by firmware device id.
    fn sas_passthrough(
        &mut self,
        adapter: u8,
        device_id: u16,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError>;
}

/// Convenience for mailbox commands: builds the 16-byte mailbox from a
/// command/subopcode pair.
pub fn make_mbox(cmd: u8, subop: u8) -> [u8; MBOX_LEN] {
    let mut mbox = [0u8; MBOX_LEN];
    mbox[0] = cmd;
    mbox[1] = subop;
    mbox
}
