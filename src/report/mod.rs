// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Renders adapter reports, the health-check scan, and the drive self-test
//! trigger. All report text goes to the writer the caller hands in; stdout
//! stays free of diagnostics.

use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::{
    cfg::{cli::CliOptions, enums::SelfTestKind},
    control_block::{
        log_sense::{LogPageData, PAGE_TEMPERATURE},
        send_diagnostic::fill_send_diagnostic,
    },
    ioctl::transport::MegaTransport,
    topology::{
        log_page::drive_log_page,
        model::{AdapterConfig, DriveAddr, PdIx, Probe, RaidLevel},
        registry::AdapterRegistry,
    },
    utils::format_capacity,
};

/// Address filter from one command-line target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetFilter {
    pub channel: Option<u8>,
    pub id: Option<u8>,
}

impl TargetFilter {
    fn matches(&self, addr: DriveAddr) -> bool {
        self.channel.is_none_or(|c| c == addr.channel)
            && self.id.is_none_or(|i| i == addr.id)
    }
}

/// Prints the full report for one adapter, resolving drives on the way.
pub fn print_adapter<W: Write, T: MegaTransport>(
    out: &mut W,
    t: &mut T,
    reg: &mut AdapterRegistry,
    adapter: u8,
    sas: bool,
    filter: TargetFilter,
    opts: &CliOptions,
) -> Result<()> {
    reg.adapter_config(t, adapter, sas)?;
    if !opts.no_drives {
        resolve_targets(t, reg, adapter, sas, filter, opts.probe_all)?;
    }

    let Some(cfg) = reg.config(adapter) else {
        bail!("adapter {adapter} not in registry");
    };

    writeln!(
        out,
        "-- Adapter a{}: {}  firmware {}  bios {}  {}MiB{}",
        cfg.adapter,
        cfg.product_name,
        cfg.firmware_version,
        cfg.bios_version,
        cfg.memory_mb,
        battery_suffix(cfg)
    )?;
    if opts.verbose > 0 {
        writeln!(
            out,
            "   {} channel(s)  max {} commands  rebuild rate {}%",
            cfg.channels.len(),
            cfg.max_commands,
            cfg.rebuild_rate
        )?;
    }

    for (li, ld) in cfg.logicals.iter().enumerate() {
        writeln!(
            out,
            "   a{}d{}: {}  {}  {}  {} span(s) x {} disk(s)",
            cfg.adapter,
            ld.target,
            ld.raid_level,
            ld.state,
            format_capacity(logical_capacity(cfg, li)),
            ld.num_spans,
            ld.span_size
        )?;
        for sr in &ld.spans {
            let span = cfg.span(sr.span);
            let mut members = String::new();
            for disk in &span.disks {
                members.push(' ');
                match disk {
                    Some(ix) => members.push_str(&drive_name(cfg, *ix)),
                    None => members.push_str("missing"),
                }
            }
            writeln!(
                out,
                "     span: {}/disk {}",
                format_capacity(span.blocks_per_disk),
                members
            )?;
        }
    }

    // With -p the report stops after the logical drive section.
    if opts.no_drives {
        return Ok(());
    }

    // Drive lines come from the sorted index so the order is stable.
    let keys: Vec<PdIx> = reg
        .physical_list()
        .iter()
        .filter(|k| k.adapter == adapter && filter.matches(k.addr))
        .map(|k| k.pd)
        .collect();

    writeln!(out, "   Drives:")?;
    for ix in keys {
        print_drive(out, t, reg, adapter, ix, opts)?;
    }

    // Slots that were probed and came up empty or unreachable.
    if opts.verbose > 0 {
        if let Some(cfg) = reg.config(adapter) {
            for pd in &cfg.physicals {
                if pd.probe == Probe::Absent && filter.matches(pd.addr) {
                    match pd.errmsg {
                        Some(msg) => writeln!(
                            out,
                            "     {}  probe failed: {msg}",
                            addr_name(cfg, pd.addr)
                        )?,
                        None => writeln!(
                            out,
                            "     {}  no disk",
                            addr_name(cfg, pd.addr)
                        )?,
                    }
                }
            }
        }
    }
    Ok(())
}

/// Resolves the drives the report will show. Configured drives always;
/// with `-a` every slot of every channel.
fn resolve_targets<T: MegaTransport>(
    t: &mut T,
    reg: &mut AdapterRegistry,
    adapter: u8,
    sas: bool,
    filter: TargetFilter,
    probe_all: bool,
) -> Result<()> {
    let addrs: Vec<DriveAddr> = {
        let Some(cfg) = reg.config(adapter) else {
            return Ok(());
        };
        if probe_all {
            cfg.channels
                .iter()
                .flat_map(|ch| {
                    (0..ch.slots).map(|slot| DriveAddr {
                        channel: ch.id,
                        id: slot,
                    })
                })
                .filter(|a| filter.matches(*a))
                .collect()
        } else {
            cfg.physicals
                .iter()
                .filter(|pd| pd.bound && filter.matches(pd.addr))
                .map(|pd| pd.addr)
                .collect()
        }
    };
    for addr in addrs {
        reg.physical_drive_info(t, adapter, sas, addr, true)?;
    }
    Ok(())
}

fn print_drive<W: Write, T: MegaTransport>(
    out: &mut W,
    t: &mut T,
    reg: &mut AdapterRegistry,
    adapter: u8,
    ix: PdIx,
    opts: &CliOptions,
) -> Result<()> {
    let Some(cfg) = reg.config_mut(adapter) else {
        return Ok(());
    };

    let mut line = {
        let pd = cfg.pd(ix);
        let blocks = drive_blocks(cfg, ix);
        let mut line = format!(
            "     {}  {} {} {}  {}  {}",
            drive_name(cfg, ix),
            pd.vendor,
            pd.model,
            pd.revision,
            format_capacity(blocks),
            pd.state
        );
        if opts.show_serials && !pd.serial.is_empty() {
            line.push_str(&format!("  serial {}", pd.serial));
        }
        if opts.show_errors {
            line.push_str(&format!(
                "  errors media={} other={} predictive={}",
                pd.media_errors, pd.other_errors, pd.predictive_failures
            ));
        }
        line
    };

    if opts.show_temperature {
        if let Some(page) = drive_log_page(t, cfg, ix, PAGE_TEMPERATURE) {
            if let LogPageData::Temperature(temp) = &page.data {
                line.push_str(&format!("  {}C", temp.current_c));
            }
        }
    }
    writeln!(out, "{line}")?;

    if let Some(code) = opts.dump_page {
        match drive_log_page(t, cfg, ix, code) {
            Some(page) => {
                writeln!(out, "       log page {code:#04x}: {}", render_page(page))?;
            },
            None => {
                writeln!(out, "       log page {code:#04x}: not available")?;
            },
        }
    }
    Ok(())
}

fn render_page(page: &crate::control_block::log_sense::LogPage) -> String {
    match &page.data {
        LogPageData::SupportedPages(codes) => {
            let list: Vec<String> =
                codes.iter().map(|c| format!("{c:#04x}")).collect();
            format!("supported pages {}", list.join(" "))
        },
        LogPageData::Counters(c) => format!(
            "corrected={} uncorrected={} bytes={}",
            c.corrected, c.uncorrected, c.bytes_processed
        ),
        LogPageData::Temperature(temp) => match temp.reference_c {
            Some(r) => format!("{}C (reference {}C)", temp.current_c, r),
            None => format!("{}C", temp.current_c),
        },
        LogPageData::SelfTest(entries) => match entries.first() {
            Some(e) if e.result == 0 => {
                format!("last self-test passed ({} power-on hours)", e.power_on_hours)
            },
            Some(e) => format!(
                "last self-test result {:#x} sense {:#x}/{:#x}/{:#x}",
                e.result, e.sense_key, e.asc, e.ascq
            ),
            None => "no self-test results".to_string(),
        },
        LogPageData::Raw(bytes) => hex::encode(bytes),
    }
}

/// Collects everything wrong with one adapter as printable problem lines.
/// An empty list means the adapter is healthy.
pub fn health_problems<T: MegaTransport>(
    t: &mut T,
    reg: &mut AdapterRegistry,
    adapter: u8,
    sas: bool,
    ignore_battery: bool,
) -> Result<Vec<String>> {
    reg.adapter_config(t, adapter, sas)?;
    resolve_targets(t, reg, adapter, sas, TargetFilter::default(), false)?;

    let Some(cfg) = reg.config(adapter) else {
        bail!("adapter {adapter} not in registry");
    };

    let mut problems = Vec::new();
    for ld in &cfg.logicals {
        if ld.state != crate::topology::model::LdState::Optimal {
            problems.push(format!(
                "a{}d{}: logical drive is {}",
                cfg.adapter, ld.target, ld.state
            ));
        }
    }
    for pd in &cfg.physicals {
        if !pd.bound {
            continue;
        }
        if !pd.state.is_healthy() {
            problems.push(format!(
                "{}: drive is {}",
                addr_name(cfg, pd.addr),
                pd.state
            ));
        }
        if pd.predictive_failures > 0 {
            problems.push(format!(
                "{}: {} predictive failure(s)",
                addr_name(cfg, pd.addr),
                pd.predictive_failures
            ));
        }
    }
    if !ignore_battery {
        if let Some(status) = cfg.battery_status {
            if status != 0 {
                problems
                    .push(format!("a{}: battery status {status:#04x}", cfg.adapter));
            }
        }
    }
    Ok(problems)
}

/// Starts a background self-test on one resolved drive.
pub fn start_self_test<T: MegaTransport>(
    t: &mut T,
    reg: &mut AdapterRegistry,
    adapter: u8,
    sas: bool,
    addr: DriveAddr,
    kind: SelfTestKind,
) -> Result<()> {
    let Some(ix) = reg.physical_drive_info(t, adapter, sas, addr, true)? else {
        bail!("no disk at a{adapter} {addr}");
    };
    let Some(cfg) = reg.config(adapter) else {
        bail!("adapter {adapter} not in registry");
    };
    let pd = cfg.pd(ix);

    let mut cdb = [0u8; 16];
    fill_send_diagnostic(&mut cdb, kind.code());
    let mut out = [0u8; 4];
    let res = if cfg.variant.is_sas() {
        t.sas_passthrough(adapter, pd.device_id, &cdb[..6], &mut out)
    } else {
        t.passthrough(adapter, addr.channel, addr.id, &cdb[..6], &mut out)
    };
    res.with_context(|| format!("self-test start failed on a{adapter} {addr}"))?;
    info!(adapter, addr = %addr, kind = %kind, "self-test started");
    Ok(())
}

/// `a0c1t3` for legacy addressing, `a0e1s3` for enclosures.
fn addr_name(cfg: &AdapterConfig, addr: DriveAddr) -> String {
    let enclosure = cfg
        .channels
        .iter()
        .find(|ch| ch.id == addr.channel)
        .is_some_and(|ch| ch.is_enclosure);
    if enclosure {
        format!("a{}e{}s{}", cfg.adapter, addr.channel, addr.id)
    } else {
        format!("a{}c{}t{}", cfg.adapter, addr.channel, addr.id)
    }
}

fn drive_name(cfg: &AdapterConfig, ix: PdIx) -> String {
    addr_name(cfg, cfg.pd(ix).addr)
}

/// Capacity of one drive in blocks. Legacy probes do not report capacity,
/// so fall back to the owning span's per-disk share.
fn drive_blocks(cfg: &AdapterConfig, ix: PdIx) -> u64 {
    let pd = cfg.pd(ix);
    if pd.blocks > 0 {
        return pd.blocks;
    }
    pd.span.map(|s| cfg.span(s).blocks_per_disk).unwrap_or(0)
}

/// Usable capacity of one logical drive in blocks, reduced by the RAID
/// redundancy of each span.
fn logical_capacity(cfg: &AdapterConfig, li: usize) -> u64 {
    let ld = &cfg.logicals[li];
    ld.spans
        .iter()
        .map(|sr| {
            let disks = cfg.span(sr.span).num_disks as u64;
            let data_disks = match ld.raid_level {
                RaidLevel::Raid0 | RaidLevel::Other(_) => disks,
                RaidLevel::Raid1 => disks.div_ceil(2),
                RaidLevel::Raid5 => disks.saturating_sub(1),
                RaidLevel::Raid6 => disks.saturating_sub(2),
            };
            sr.num_blocks.saturating_mul(data_disks)
        })
        .sum()
}

fn battery_suffix(cfg: &AdapterConfig) -> String {
    match cfg.battery_status {
        Some(0) => "  battery good".to_string(),
        Some(status) => format!("  battery status {status:#04x}"),
        None => String::new(),
    }
}
