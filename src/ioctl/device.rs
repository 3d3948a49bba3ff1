// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Real device-node transport.
//!
//! Legacy adapters are reached through the shared `/dev/megadev0` control
//! node; SAS adapters through `/dev/megaraid_sas_ioctl_node`. Both are
//! blocking ioctl interfaces. The legacy node carries a driver interface
//! version that is checked once at open (`MEGA_MIN_VERSION`).

use std::{fs::File, os::fd::AsRawFd};

use nix::{ioctl_read, ioctl_readwrite};
use tracing::debug;
use zerocopy::{FromZeros, IntoBytes};

use crate::{
    ioctl::transport::{MegaTransport, TransportError, firmware_error},
    wire::{
        dcmd::{
            DCMD_HEADER_LEN, DcmdFrameHeader, MFI_CMD_DCMD, MFI_CMD_PD_SCSI_IO,
            MFI_FRAME_DIR_READ, MFI_FRAME_LEN, MFI_STAT_OK, MegasasIocPacket,
            MegasasSge,
        },
        mbox::{
            MBOX_CMD_PASSTHRU, MBOX_LEN, MEGA_MIN_VERSION, Passthru, Uioctl,
        },
    },
};

/// Legacy control node.
pub const LEGACY_NODE: &str = "/dev/megadev0";
/// SAS control node.
pub const SAS_NODE: &str = "/dev/megaraid_sas_ioctl_node";

/// Fixed passthrough timeout in seconds, baked into every request structure
/// and enforced by the kernel driver, not by this layer.
pub const COMMAND_TIMEOUT_SECS: u16 = 3;

ioctl_readwrite!(mega_legacy_command, b'M', 0, Uioctl);
ioctl_read!(mega_driver_version, b'M', 1, u32);
ioctl_read!(mega_num_adapters, b'M', 2, u8);
ioctl_readwrite!(megasas_firmware_command, b'M', 1, MegasasIocPacket);

/// Which driver family a [`DeviceTransport`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Legacy,
    Sas,
}

/// Transport over one open control node.
pub struct DeviceTransport {
    file: File,
    kind: DriverKind,
    timeout_secs: u16,
}

impl DeviceTransport {
    /// Opens the default control node for a driver family.
    pub fn open(kind: DriverKind) -> Result<Self, TransportError> {
        let path = match kind {
            DriverKind::Legacy => LEGACY_NODE,
            DriverKind::Sas => SAS_NODE,
        };
        Self::open_at(kind, path)
    }

    /// Opens a control node at an explicit path and, for the legacy driver,
    /// verifies the driver interface version.
    pub fn open_at(kind: DriverKind, path: &str) -> Result<Self, TransportError> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source,
            })?;

        let transport = Self {
            file,
            kind,
            timeout_secs: COMMAND_TIMEOUT_SECS,
        };

        if kind == DriverKind::Legacy {
            let mut version = 0u32;
            unsafe { mega_driver_version(transport.file.as_raw_fd(), &mut version) }?;
            if version < MEGA_MIN_VERSION {
                return Err(TransportError::DriverVersion {
                    found: version,
                    required: MEGA_MIN_VERSION,
                });
            }
            debug!(version = format_args!("{version:#010x}"), "legacy driver ok");
        }

        Ok(transport)
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Overrides the per-command timeout (seconds).
    pub fn set_timeout_secs(&mut self, secs: u16) {
        self.timeout_secs = secs;
    }

    fn require(&self, kind: DriverKind) -> Result<(), TransportError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(TransportError::Unsupported(
                "command family not supported by this driver node",
            ))
        }
    }

    fn run_frame(
        &mut self,
        adapter: u8,
        frame: [u8; MFI_FRAME_LEN],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        let mut packet = MegasasIocPacket::new(adapter as u16, frame);
        packet.sge_count = 1;
        packet.sgl[0] = MegasasSge::new(out.as_mut_ptr() as u64, out.len() as u32);

        unsafe { megasas_firmware_command(self.file.as_raw_fd(), &mut packet) }?;

        let status = packet.frame[2];
        if status != MFI_STAT_OK {
            return Err(firmware_error(status));
        }
        Ok(out.len())
    }
}

impl MegaTransport for DeviceTransport {
    fn adapter_count(&mut self) -> Result<u8, TransportError> {
        match self.kind {
            DriverKind::Legacy => {
                let mut count = 0u8;
                unsafe { mega_num_adapters(self.file.as_raw_fd(), &mut count) }?;
                Ok(count)
            },
            DriverKind::Sas => {
                // The SAS node has no count query; hosts are numbered from
                // zero and probing past the last one fails with ENODEV.
                let mut count = 0u8;
                let mut info = vec![0u8; crate::wire::sas::SAS_CTRL_INFO_LEN];
                while count < 16 {
                    let probe = self.dcmd(
                        count,
                        crate::wire::dcmd::MR_DCMD_CTRL_GET_INFO,
                        [0u8; 12],
                        &mut info,
                    );
                    if probe.is_err() {
                        break;
                    }
                    count += 1;
                }
                Ok(count)
            },
        }
    }

    fn mailbox(
        &mut self,
        adapter: u8,
        mbox: [u8; MBOX_LEN],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.require(DriverKind::Legacy)?;

        let mut request =
            Uioctl::new(adapter, mbox, out.as_mut_ptr(), out.len() as u32);
        unsafe { mega_legacy_command(self.file.as_raw_fd(), &mut request) }?;
        if request.status != 0 {
            return Err(firmware_error(request.status));
        }
        Ok(out.len())
    }

    fn passthrough(
        &mut self,
        adapter: u8,
        channel: u8,
        target: u8,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.require(DriverKind::Legacy)?;

        let mut pthru = Passthru::new(channel, target, cdb, self.timeout_secs as u8);
        pthru.dataxferaddr = out.as_mut_ptr() as u64;
        pthru.dataxferlen = out.len() as u32;

        let mut mbox = [0u8; MBOX_LEN];
        mbox[0] = MBOX_CMD_PASSTHRU;
        let mut request = Uioctl::new(
            adapter,
            mbox,
            (&mut pthru as *mut Passthru).cast(),
            size_of::<Passthru>() as u32,
        );
        unsafe { mega_legacy_command(self.file.as_raw_fd(), &mut request) }?;
        if request.status != 0 {
            return Err(firmware_error(request.status));
        }
        if pthru.scsistatus != 0 {
            return Err(TransportError::Firmware {
                status: pthru.scsistatus,
                message: "scsi check condition",
            });
        }
        Ok(out.len())
    }

    fn dcmd(
        &mut self,
        adapter: u8,
        opcode: u32,
        mbox: [u8; 12],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.require(DriverKind::Sas)?;

        let mut header = DcmdFrameHeader::new_zeroed();
        header.cmd = MFI_CMD_DCMD;
        header.sge_count = 1;
        header.flags.set(MFI_FRAME_DIR_READ);
        header.timeout.set(self.timeout_secs);
        header.data_xfer_len.set(out.len() as u32);
        header.opcode.set(opcode);
        header.mbox = mbox;

        let mut frame = [0u8; MFI_FRAME_LEN];
        frame[..DCMD_HEADER_LEN].copy_from_slice(header.as_bytes());
        self.run_frame(adapter, frame, out)
    }

    fn sas_passthrough(
        &mut self,
        adapter: u8,
        device_id: u16,
        cdb: &[u8],
        out: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.require(DriverKind::Sas)?;

        // PD SCSI IO frame: device id in the header context area, CDB at
        // the fixed offset the firmware expects.
        let mut frame = [0u8; MFI_FRAME_LEN];
        frame[0] = MFI_CMD_PD_SCSI_IO;
        frame[3] = 1; // sge_count
        frame[4..6].copy_from_slice(&device_id.to_le_bytes());
        frame[12..14].copy_from_slice(&MFI_FRAME_DIR_READ.to_le_bytes());
        frame[14..16].copy_from_slice(&self.timeout_secs.to_le_bytes());
        frame[16..20].copy_from_slice(&(out.len() as u32).to_le_bytes());
        frame[20] = cdb.len().min(16) as u8;
        let n = cdb.len().min(16);
        frame[24..24 + n].copy_from_slice(&cdb[..n]);
        self.run_frame(adapter, frame, out)
    }
}
