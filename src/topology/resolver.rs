// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Lazy physical-drive resolution.
//!
//! A drive slot is probed at most once per run. The first request fills in
//! presence, identity strings, state, and error counters; a failed probe
//! marks the slot absent with the failure message and is never retried.
//! Present drives are inserted into the sorted drive index as a side effect.

use tracing::debug;
use zerocopy::FromBytes;

use crate::{
    control_block::{
        common::trim_fixed,
        inquiry::{
            VPD_UNIT_SERIAL, fill_inquiry_standard, fill_inquiry_vpd,
            parse_inquiry_standard, parse_unit_serial,
        },
    },
    ioctl::transport::MegaTransport,
    topology::{
        model::{AdapterConfig, DriveAddr, PdIx, PdState, Probe},
        registry::PdKey,
    },
    wire::{
        dcmd::MR_DCMD_PD_GET_INFO,
        product::LEGACY_PD_UNCONFIGURED,
        sas::{RawPdState, SAS_PD_INFO_LEN, SasPdInfo},
    },
};

const INQUIRY_ALLOC: u8 = 96;
const SERIAL_ALLOC: u8 = 64;

/// Returns the resolved slot for `addr`, probing the device on first
/// request when `fetch` is set.
///
/// With `fetch` false this is a pure lookup: it answers only from slots
/// already probed present, never claims a slot and never touches the
/// transport. With `fetch` set, `None` means the address holds no present
/// disk: the slot table is full, the device is not a connected
/// direct-access device, or the probe failed (in which case the cause is
/// recorded on the slot). Whatever the outcome, it is permanent for the
/// run.
pub fn physical_drive_info<T: MegaTransport>(
    t: &mut T,
    cfg: &mut AdapterConfig,
    list: &mut Vec<PdKey>,
    addr: DriveAddr,
    fetch: bool,
) -> Option<PdIx> {
    let ix = match cfg.find_slot(addr) {
        Some(ix) => ix,
        None if fetch => cfg.claim_slot(addr)?,
        None => return None,
    };

    match cfg.physicals[ix.0].probe {
        Probe::Present => return Some(ix),
        Probe::Absent => return None,
        Probe::Unprobed if !fetch => return None,
        Probe::Unprobed => {}
    }

    let outcome = if cfg.variant.is_sas() {
        probe_sas(t, cfg, ix)
    } else {
        probe_legacy(t, cfg, ix)
    };

    match outcome {
        Ok(true) => {
            cfg.physicals[ix.0].probe = Probe::Present;
            debug!(
                adapter = cfg.adapter,
                addr = %addr,
                model = %cfg.physicals[ix.0].model,
                "drive probed"
            );
            list.push(PdKey {
                adapter: cfg.adapter,
                addr,
                pd: ix,
            });
            // Full re-sort on every insert; the index stays small.
            list.sort_unstable();
            Some(ix)
        }
        Ok(false) => {
            cfg.physicals[ix.0].probe = Probe::Absent;
            None
        }
        Err(msg) => {
            let pd = &mut cfg.physicals[ix.0];
            pd.probe = Probe::Absent;
            pd.errmsg = Some(msg);
            debug!(adapter = cfg.adapter, addr = %addr, error = msg, "drive probe failed");
            None
        }
    }
}

/// Legacy probe: INQUIRY through the adapter passthrough, then the
/// unit-serial EVPD page. A missing serial page is not an error.
fn probe_legacy<T: MegaTransport>(
    t: &mut T,
    cfg: &mut AdapterConfig,
    ix: PdIx,
) -> Result<bool, &'static str> {
    let adapter = cfg.adapter;
    let addr = cfg.physicals[ix.0].addr;

    let mut cdb = [0u8; 16];
    fill_inquiry_standard(&mut cdb, INQUIRY_ALLOC);
    let mut buf = [0u8; INQUIRY_ALLOC as usize];
    let n = t
        .passthrough(adapter, addr.channel, addr.id, &cdb[..6], &mut buf)
        .map_err(|e| e.static_message())?;
    let inq = parse_inquiry_standard(&buf[..n]).map_err(|_| "malformed INQUIRY reply")?;
    if !inq.is_present_disk() {
        return Ok(false);
    }

    fill_inquiry_vpd(&mut cdb, VPD_UNIT_SERIAL, SERIAL_ALLOC);
    let mut sbuf = [0u8; SERIAL_ALLOC as usize];
    let serial = match t.passthrough(adapter, addr.channel, addr.id, &cdb[..6], &mut sbuf) {
        Ok(n) => parse_unit_serial(&sbuf[..n]).unwrap_or_default(),
        Err(_) => String::new(),
    };

    let pd = &mut cfg.physicals[ix.0];
    pd.vendor = inq.vendor_id;
    pd.model = inq.product_id;
    pd.revision = inq.product_rev;
    pd.serial = serial;
    // State and error counters for configured drives were already filled
    // from the adapter-wide enquiry tables during the configuration walk.
    // A slot the walk never bound carries state 0 in the enquiry table.
    if pd.state == PdState::Unknown {
        pd.state = PdState::from_legacy(LEGACY_PD_UNCONFIGURED);
    }
    Ok(true)
}

/// SAS probe: one PD-info DCMD carries the firmware-gathered INQUIRY block,
/// state bits, error counters, and coerced capacity.
fn probe_sas<T: MegaTransport>(
    t: &mut T,
    cfg: &mut AdapterConfig,
    ix: PdIx,
) -> Result<bool, &'static str> {
    let adapter = cfg.adapter;
    let device_id = cfg.physicals[ix.0].device_id;

    let mut mbox = [0u8; 12];
    mbox[0..2].copy_from_slice(&device_id.to_le_bytes());
    let mut buf = [0u8; SAS_PD_INFO_LEN];
    let n = t
        .dcmd(adapter, MR_DCMD_PD_GET_INFO, mbox, &mut buf)
        .map_err(|e| e.static_message())?;
    let info = SasPdInfo::read_from_bytes(&buf[..n.min(SAS_PD_INFO_LEN)])
        .map_err(|_| "short device info reply")?;

    let inq =
        parse_inquiry_standard(&info.inquiry_data).map_err(|_| "malformed INQUIRY data")?;
    if !inq.is_present_disk() {
        return Ok(false);
    }

    let pd = &mut cfg.physicals[ix.0];
    pd.vendor = inq.vendor_id;
    pd.model = inq.product_id;
    pd.revision = inq.product_rev;
    pd.serial = trim_fixed(&info.serial);
    pd.state = PdState::from_firmware(RawPdState::from_bits_truncate(info.fw_state.get()));
    pd.blocks = info.coerced_size.get();
    pd.media_errors = info.media_err_count.get();
    pd.other_errors = info.other_err_count.get();
    pd.predictive_failures = info.pred_fail_count.get();
    Ok(true)
}
