// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Topology normalization: three incompatible vendor wire formats parsed
//! into the common [`AdapterConfig`] model.
//!
//! Each variant pairs a fetch step (two to four fixed-shape queries) with a
//! pure parse step over the returned blobs. Any query failure is fatal for that
//! adapter; the caller reports it and continues with the next target.
//! Counts inside the blobs are firmware-controlled and trusted, with one
//! exception: the legacy logical-drive count is range-checked against the
//! layout's slot count.

use anyhow::{Context, Result, anyhow, ensure};
use tracing::{debug, warn};
use zerocopy::FromBytes;

use crate::{
    control_block::common::trim_fixed,
    ioctl::transport::{MegaTransport, make_mbox},
    topology::model::{
        AdapterConfig, AdapterVariant, Channel, DriveAddr, LdIx, LdState,
        LogicalDrive, PdIx, PdState, PhysicalDrive, RaidLevel, Span, SpanIx,
        SpanRef,
    },
    wire::{
        dcmd::{MR_DCMD_CFG_READ, MR_DCMD_CTRL_GET_INFO, MR_DCMD_PD_GET_LIST},
        legacy::{
            DISK_ARRAY_V2_LEN, DISK_ARRAY_V34_LEN, DiskArrayHeader,
            LEGACY_MAX_ROW, LEGACY_MAX_SPANS_PER_LD, LogDrvConf,
        },
        mbox::{
            FC_NEW_CONFIG, MBOX_CMD_ADAPTER_ENQUIRY, MBOX_CMD_PRED_FAIL,
            MBOX_CMD_READ_CONFIG_8LD, NC_SUBOP_ENQUIRY3, NC_SUBOP_PRODUCT_INFO,
            NC_SUBOP_READ_CONFIG,
        },
        product::{
            ENQUIRY_LEN, ENQUIRY3_LEN, Enquiry, Enquiry3, LEGACY_MAX_CHANNELS,
            LEGACY_MAX_LD_V2, LEGACY_MAX_LD_V34, LEGACY_MAX_PHYSICALS,
            PRED_FAIL_LEN, PRODUCT_INFO_LEN, PredictiveFailure, ProductInfo,
            TARGETS_PER_CHANNEL,
        },
        sas::{
            MR_ARRAY_LEN, MR_CONF_HEADER_LEN, MR_LD_LEN, MrArray, MrConfHeader,
            MrLd, PD_ADDRESS_LEN, PdAddress, PdListHeader, SAS_CTRL_INFO_LEN,
            SAS_DEVICE_ID_UNUSED, SAS_MAX_ROW, SAS_MAX_SPANS_PER_LD,
            SasCtrlInfo,
        },
    },
};

/// Buffer size for the SAS device-list reply: header plus the largest
/// device list the firmware can report.
const PD_LIST_BUF: usize = 8 + 256 * PD_ADDRESS_LEN;
/// Buffer size for the SAS configuration blob.
const MR_CONF_BUF: usize = 32 * 1024;

/// One-shot legacy firmware-generation heuristic: v2 firmware leaves
/// `data_size` zero in the product-info reply. There is no validation and
/// no fallback; a wrong answer here silently misparses everything after it.
pub fn adapter_variant(pinfo: &ProductInfo) -> AdapterVariant {
    if pinfo.data_size.get() == 0 {
        AdapterVariant::V2
    } else {
        AdapterVariant::V34
    }
}

/// Builds the configuration of one legacy adapter, dispatching on the
/// product-info heuristic.
pub fn build_legacy<T: MegaTransport>(t: &mut T, adapter: u8) -> Result<AdapterConfig> {
    let pinfo = fetch_product_info(t, adapter)?;
    match adapter_variant(&pinfo) {
        AdapterVariant::V2 => build_v2(t, adapter, &pinfo),
        _ => build_v34(t, adapter, &pinfo),
    }
}

/// Builds the configuration of one v2 (8-LD) adapter.
pub fn build_v2<T: MegaTransport>(
    t: &mut T,
    adapter: u8,
    pinfo: &ProductInfo,
) -> Result<AdapterConfig> {
    let enq = fetch_enquiry(t, adapter)?;
    let pred = fetch_predictive(t, adapter)?;

    let mut blob = vec![0u8; DISK_ARRAY_V2_LEN];
    let n = t
        .mailbox(adapter, make_mbox(MBOX_CMD_READ_CONFIG_8LD, 0), &mut blob)
        .with_context(|| format!("adapter {adapter}: configuration read failed"))?;

    let cfg = parse_v2(adapter, pinfo, &enq, &pred, &blob[..n])?;
    log_built(&cfg);
    Ok(cfg)
}

/// Builds the configuration of one v34 (40-LD) adapter.
pub fn build_v34<T: MegaTransport>(
    t: &mut T,
    adapter: u8,
    pinfo: &ProductInfo,
) -> Result<AdapterConfig> {
    let enq = fetch_enquiry3(t, adapter)?;
    let pred = fetch_predictive(t, adapter)?;

    let mut blob = vec![0u8; DISK_ARRAY_V34_LEN];
    let n = t
        .mailbox(
            adapter,
            make_mbox(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
            &mut blob,
        )
        .with_context(|| format!("adapter {adapter}: configuration read failed"))?;

    let cfg = parse_v34(adapter, pinfo, &enq, &pred, &blob[..n])?;
    log_built(&cfg);
    Ok(cfg)
}

/// Builds the topology skeleton of one SAS adapter. Drive slots are bound
/// from the device list but left unprobed; the registry resolves every
/// listed device eagerly right after this returns.
pub fn build_v5<T: MegaTransport>(t: &mut T, adapter: u8) -> Result<AdapterConfig> {
    let mut info_buf = vec![0u8; SAS_CTRL_INFO_LEN];
    let n = t
        .dcmd(adapter, MR_DCMD_CTRL_GET_INFO, [0u8; 12], &mut info_buf)
        .with_context(|| format!("adapter {adapter}: controller info query failed"))?;
    let info = SasCtrlInfo::read_from_bytes(&info_buf[..n.min(SAS_CTRL_INFO_LEN)])
        .map_err(|_| anyhow!("adapter {adapter}: short controller info reply ({n} bytes)"))?;

    let mut list_buf = vec![0u8; PD_LIST_BUF];
    let n = t
        .dcmd(adapter, MR_DCMD_PD_GET_LIST, [0u8; 12], &mut list_buf)
        .with_context(|| format!("adapter {adapter}: device list query failed"))?;
    let pd_list = &list_buf[..n];

    let mut conf_buf = vec![0u8; MR_CONF_BUF];
    let n = t
        .dcmd(adapter, MR_DCMD_CFG_READ, [0u8; 12], &mut conf_buf)
        .with_context(|| format!("adapter {adapter}: configuration read failed"))?;

    let cfg = parse_v5(adapter, &info, pd_list, &conf_buf[..n])?;
    log_built(&cfg);
    Ok(cfg)
}

fn log_built(cfg: &AdapterConfig) {
    debug!(
        adapter = cfg.adapter,
        variant = %cfg.variant,
        logicals = cfg.logicals.len(),
        spans = cfg.spans.len(),
        slots = cfg.physicals.len(),
        "normalized adapter configuration"
    );
}

/// Fetches and casts the product-info reply.
pub fn fetch_product_info<T: MegaTransport>(
    t: &mut T,
    adapter: u8,
) -> Result<ProductInfo> {
    let mut buf = vec![0u8; PRODUCT_INFO_LEN];
    let n = t
        .mailbox(
            adapter,
            make_mbox(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
            &mut buf,
        )
        .with_context(|| format!("adapter {adapter}: product info query failed"))?;
    ProductInfo::read_from_bytes(&buf[..n.min(PRODUCT_INFO_LEN)])
        .map_err(|_| anyhow!("adapter {adapter}: short product info reply ({n} bytes)"))
}

fn fetch_enquiry<T: MegaTransport>(t: &mut T, adapter: u8) -> Result<Enquiry> {
    let mut buf = vec![0u8; ENQUIRY_LEN];
    let n = t
        .mailbox(adapter, make_mbox(MBOX_CMD_ADAPTER_ENQUIRY, 0), &mut buf)
        .with_context(|| format!("adapter {adapter}: enquiry failed"))?;
    Enquiry::read_from_bytes(&buf[..n.min(ENQUIRY_LEN)])
        .map_err(|_| anyhow!("adapter {adapter}: short enquiry reply ({n} bytes)"))
}

fn fetch_enquiry3<T: MegaTransport>(t: &mut T, adapter: u8) -> Result<Enquiry3> {
    let mut buf = vec![0u8; ENQUIRY3_LEN];
    let n = t
        .mailbox(adapter, make_mbox(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3), &mut buf)
        .with_context(|| format!("adapter {adapter}: extended enquiry failed"))?;
    Enquiry3::read_from_bytes(&buf[..n.min(ENQUIRY3_LEN)])
        .map_err(|_| anyhow!("adapter {adapter}: short extended enquiry reply ({n} bytes)"))
}

fn fetch_predictive<T: MegaTransport>(
    t: &mut T,
    adapter: u8,
) -> Result<PredictiveFailure> {
    let mut buf = vec![0u8; PRED_FAIL_LEN];
    let n = t
        .mailbox(adapter, make_mbox(MBOX_CMD_PRED_FAIL, 0), &mut buf)
        .with_context(|| format!("adapter {adapter}: predictive failure query failed"))?;
    PredictiveFailure::read_from_bytes(&buf[..n.min(PRED_FAIL_LEN)])
        .map_err(|_| anyhow!("adapter {adapter}: short predictive failure reply ({n} bytes)"))
}

/// Parses a v2 configuration: 8-LD enquiry plus the 8-slot disk-array blob.
pub fn parse_v2(
    adapter: u8,
    pinfo: &ProductInfo,
    enq: &Enquiry,
    pred: &PredictiveFailure,
    blob: &[u8],
) -> Result<AdapterConfig> {
    parse_legacy(LegacyParse {
        adapter,
        variant: AdapterVariant::V2,
        pinfo,
        rebuild_rate: enq.rebuild_rate,
        battery_status: enq.battery_status,
        ld_states: &enq.ldrv_state,
        pdrv_state: &enq.pdrv_state,
        pred,
        max_ld: LEGACY_MAX_LD_V2,
        blob,
    })
}

/// Parses a v34 configuration: extended enquiry plus the 40-slot blob.
pub fn parse_v34(
    adapter: u8,
    pinfo: &ProductInfo,
    enq: &Enquiry3,
    pred: &PredictiveFailure,
    blob: &[u8],
) -> Result<AdapterConfig> {
    parse_legacy(LegacyParse {
        adapter,
        variant: AdapterVariant::V34,
        pinfo,
        rebuild_rate: enq.rebuild_rate,
        battery_status: enq.battery_status,
        ld_states: &enq.ldrv_state,
        pdrv_state: &enq.pdrv_state,
        pred,
        max_ld: LEGACY_MAX_LD_V34,
        blob,
    })
}

/// Inputs for the shared legacy walk; v2 and v34 differ only in slot counts
/// and which enquiry layout supplied the state tables.
struct LegacyParse<'a> {
    adapter: u8,
    variant: AdapterVariant,
    pinfo: &'a ProductInfo,
    rebuild_rate: u8,
    battery_status: u8,
    ld_states: &'a [u8],
    pdrv_state: &'a [u8],
    pred: &'a PredictiveFailure,
    max_ld: usize,
    blob: &'a [u8],
}

fn parse_legacy(input: LegacyParse<'_>) -> Result<AdapterConfig> {
    let LegacyParse {
        adapter,
        variant,
        pinfo,
        rebuild_rate,
        battery_status,
        ld_states,
        pdrv_state,
        pred,
        max_ld,
        blob,
    } = input;

    let (hdr, mut rest) = DiskArrayHeader::ref_from_prefix(blob)
        .map_err(|_| anyhow!("adapter {adapter}: disk-array blob too short ({} bytes)", blob.len()))?;

    // The only count validation on the legacy path.
    let numldrv = hdr.numldrv as usize;
    ensure!(
        numldrv <= max_ld,
        "adapter {adapter}: firmware reports {numldrv} logical drives, layout holds {max_ld}"
    );

    let mut records: Vec<&LogDrvConf> = Vec::with_capacity(numldrv);
    for i in 0..numldrv {
        let (ld, tail) = LogDrvConf::ref_from_prefix(rest).map_err(|_| {
            anyhow!("adapter {adapter}: disk-array blob truncated at logical drive {i}")
        })?;
        records.push(ld);
        rest = tail;
    }

    let mut cfg = AdapterConfig::new(adapter, variant);
    cfg.product_name = trim_fixed(&pinfo.product_name);
    cfg.firmware_version = trim_fixed(&pinfo.fw_version);
    cfg.bios_version = trim_fixed(&pinfo.bios_version);
    cfg.memory_mb = pinfo.dram_size.get();
    cfg.max_commands = pinfo.max_commands as u16;
    cfg.rebuild_rate = rebuild_rate;
    cfg.battery_status = Some(battery_status);

    let nchannels = (pinfo.nchannels.max(1) as usize).min(LEGACY_MAX_CHANNELS);
    cfg.channels = (0..nchannels)
        .map(|id| Channel {
            id: id as u8,
            is_enclosure: false,
            slots: TARGETS_PER_CHANNEL as u8,
        })
        .collect();

    // All slots allocated up front; populated lazily by the resolver.
    cfg.physicals = vec![PhysicalDrive::default(); LEGACY_MAX_PHYSICALS];

    // The global span array is sized by the depth summed over all LDs.
    let total_spans: usize = records.iter().map(|ld| ld.span_depth as usize).sum();
    cfg.spans.reserve(total_spans);

    for (li, ld) in records.iter().enumerate() {
        let depth = ld.span_depth as usize;
        if depth > LEGACY_MAX_SPANS_PER_LD {
            warn!(
                adapter,
                logical = li,
                span_depth = depth,
                "span depth exceeds record layout, clamping"
            );
        }
        let depth = depth.min(LEGACY_MAX_SPANS_PER_LD);
        let row = (ld.row_size as usize).min(LEGACY_MAX_ROW);

        let state = ld_states
            .get(li)
            .copied()
            .map(LdState::from_legacy)
            .unwrap_or_default();
        let ld_ix = LdIx(cfg.logicals.len());
        let mut logical = LogicalDrive {
            target: li as u8,
            raid_level: RaidLevel::from_raw(ld.raid_level),
            state,
            num_spans: depth as u8,
            span_size: row as u8,
            spans: Vec::with_capacity(depth),
        };

        for sc in ld.spans.iter().take(depth) {
            let span_ix = SpanIx(cfg.spans.len());
            let mut span = Span {
                num_disks: row as u8,
                disks: vec![None; row],
                blocks_per_disk: sc.num_blocks.get() as u64,
                // A legacy span feeds exactly one logical drive.
                logicals: vec![ld_ix],
            };

            for (d, dev) in sc.device.iter().enumerate().take(row) {
                if dev.is_unused() {
                    continue;
                }
                // Dense 4-bit channel / 4-bit target addressing indexes the
                // slot array directly.
                let ch = dev.channel & 0x0F;
                let tg = dev.target & 0x0F;
                let slot = (ch as usize) * TARGETS_PER_CHANNEL + tg as usize;

                let pd = &mut cfg.physicals[slot];
                pd.bound = true;
                pd.addr = DriveAddr { channel: ch, id: tg };
                pd.device_id = slot as u16;
                pd.state =
                    PdState::from_legacy(pdrv_state.get(slot).copied().unwrap_or(0));
                let errs = &pred.counters[slot];
                pd.media_errors = errs.media_errors.get() as u32;
                pd.other_errors = errs.other_errors.get() as u32;
                pd.predictive_failures = errs.predictive_failures.get() as u32;
                pd.span = Some(span_ix);

                span.disks[d] = Some(PdIx(slot));
            }

            // Legacy spans always map whole: offset 0, full span.
            logical.spans.push(SpanRef {
                span: span_ix,
                start_block: sc.start_block.get() as u64,
                num_blocks: sc.num_blocks.get() as u64,
            });
            cfg.spans.push(span);
        }
        cfg.logicals.push(logical);
    }

    // Hotspares, failed and unconfigured-bad targets sit outside every span;
    // bind their dense slots so reports and the health check can see them.
    for (slot, &st) in pdrv_state.iter().enumerate().take(LEGACY_MAX_PHYSICALS) {
        if st == 0 || cfg.physicals[slot].bound {
            continue;
        }
        let pd = &mut cfg.physicals[slot];
        pd.bound = true;
        pd.addr = DriveAddr {
            channel: (slot / TARGETS_PER_CHANNEL) as u8,
            id: (slot % TARGETS_PER_CHANNEL) as u8,
        };
        pd.device_id = slot as u16;
        pd.state = PdState::from_legacy(st);
        let errs = &pred.counters[slot];
        pd.media_errors = errs.media_errors.get() as u32;
        pd.other_errors = errs.other_errors.get() as u32;
        pd.predictive_failures = errs.predictive_failures.get() as u32;
    }

    Ok(cfg)
}

/// Parses a SAS configuration: controller info, device list, and `MR_CONF`.
pub fn parse_v5(
    adapter: u8,
    info: &SasCtrlInfo,
    pd_list: &[u8],
    conf: &[u8],
) -> Result<AdapterConfig> {
    let mut cfg = AdapterConfig::new(adapter, AdapterVariant::V5);
    cfg.product_name = trim_fixed(&info.product_name);
    cfg.firmware_version = trim_fixed(&info.fw_version);
    cfg.bios_version = trim_fixed(&info.bios_version);
    cfg.memory_mb = info.memory_size_mb.get();
    cfg.max_commands = info.max_commands.get();
    cfg.rebuild_rate = info.rebuild_rate;
    cfg.battery_status = Some(info.battery_status);

    // Device list.
    let (lh, mut rest) = PdListHeader::ref_from_prefix(pd_list)
        .map_err(|_| anyhow!("adapter {adapter}: device list reply too short"))?;
    let count = lh.count.get() as usize;
    let mut addrs: Vec<PdAddress> = Vec::with_capacity(count);
    for i in 0..count {
        let (pa, tail) = PdAddress::ref_from_prefix(rest).map_err(|_| {
            anyhow!("adapter {adapter}: device list truncated at entry {i}")
        })?;
        addrs.push(*pa);
        rest = tail;
    }

    // Slot count comes from the controller's reported PD present count, but
    // never below what the device list actually returned.
    let slots = (info.pd_present_count.get() as usize).max(addrs.len());
    cfg.physicals = vec![PhysicalDrive::default(); slots];

    // The enclosure map grows as new enclosure indexes appear.
    for pa in &addrs {
        // Firmware-reported slot numbers go up to 255; keep the count from
        // wrapping.
        let slots = pa.slot_number.saturating_add(1);
        match cfg.channels.iter_mut().find(|c| c.id == pa.encl_index) {
            Some(chan) => chan.slots = chan.slots.max(slots),
            None => cfg.channels.push(Channel {
                id: pa.encl_index,
                is_enclosure: true,
                slots,
            }),
        }
    }

    // Bind one slot per listed device; probing happens right after build.
    for (i, pa) in addrs.iter().enumerate() {
        let pd = &mut cfg.physicals[i];
        pd.bound = true;
        pd.addr = DriveAddr {
            channel: pa.encl_index,
            id: pa.slot_number,
        };
        pd.device_id = pa.device_id.get();
    }

    // Configuration blob: arrays become spans, then LD records reference
    // them by index, possibly sharing one array between several volumes.
    let (ch, _) = MrConfHeader::ref_from_prefix(conf)
        .map_err(|_| anyhow!("adapter {adapter}: configuration blob too short"))?;
    let array_count = ch.array_count.get() as usize;
    let array_size = ch.array_size.get() as usize;
    let ld_count = ch.ld_count.get() as usize;
    let ld_size = ch.ld_size.get() as usize;
    ensure!(
        array_size >= MR_ARRAY_LEN && ld_size >= MR_LD_LEN,
        "adapter {adapter}: configuration record strides too small ({array_size}/{ld_size})"
    );

    let mut off = MR_CONF_HEADER_LEN;
    for a in 0..array_count {
        let bytes = conf
            .get(off..off + array_size)
            .ok_or_else(|| anyhow!("adapter {adapter}: configuration truncated at array {a}"))?;
        let (ar, _) = MrArray::ref_from_prefix(bytes)
            .map_err(|_| anyhow!("adapter {adapter}: bad array record {a}"))?;

        let rows = (ar.num_rows as usize).min(SAS_MAX_ROW);
        let mut span = Span {
            num_disks: rows as u8,
            disks: vec![None; rows],
            blocks_per_disk: ar.size.get(),
            logicals: Vec::new(),
        };
        for (r, slot) in span.disks.iter_mut().enumerate() {
            let device_id = ar.pd[r].device_id.get();
            if device_id == SAS_DEVICE_ID_UNUSED {
                continue;
            }
            // SAS device ids are sparse; find the slot through the device
            // list instead of indexing by id.
            match cfg
                .physicals
                .iter()
                .position(|p| p.bound && p.device_id == device_id)
            {
                Some(pix) => *slot = Some(PdIx(pix)),
                None => warn!(adapter, device_id, "configured disk not in device list"),
            }
        }
        cfg.spans.push(span);
        off += array_size;
    }

    for l in 0..ld_count {
        let bytes = conf.get(off..off + ld_size).ok_or_else(|| {
            anyhow!("adapter {adapter}: configuration truncated at logical drive {l}")
        })?;
        let (ld, _) = MrLd::ref_from_prefix(bytes)
            .map_err(|_| anyhow!("adapter {adapter}: bad logical drive record {l}"))?;

        let depth = (ld.span_depth as usize).min(SAS_MAX_SPANS_PER_LD);
        let ld_ix = LdIx(cfg.logicals.len());
        let mut logical = LogicalDrive {
            target: ld.target_id,
            raid_level: RaidLevel::from_raw(ld.raid_level),
            state: LdState::from_sas(ld.state),
            num_spans: depth as u8,
            span_size: ld.row_size,
            spans: Vec::with_capacity(depth),
        };

        for (s, sp) in ld.span.iter().enumerate().take(depth) {
            let six = sp.array_ref.get() as usize;
            ensure!(
                six < cfg.spans.len(),
                "adapter {adapter}: logical drive {l} span {s} references array {six} of {}",
                cfg.spans.len()
            );
            logical.spans.push(SpanRef {
                span: SpanIx(six),
                start_block: sp.start_block.get(),
                num_blocks: sp.num_blocks.get(),
            });
            cfg.spans[six].logicals.push(ld_ix);

            for d in 0..cfg.spans[six].disks.len() {
                let member = cfg.spans[six].disks[d];
                if let Some(pix) = member {
                    cfg.physicals[pix.0].span = Some(SpanIx(six));
                }
            }
        }
        cfg.logicals.push(logical);
        off += ld_size;
    }

    Ok(cfg)
}
