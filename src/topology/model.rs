// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The normalized topology model.
//!
//! One [`AdapterConfig`] per physical HBA, built once and cached for the
//! life of the process. It owns all drives, spans, and logical drives in
//! flat vectors; every cross-reference is a stable index into those vectors
//! ([`PdIx`], [`SpanIx`], [`LdIx`]), never a pointer.

use core::fmt;

use crate::{
    control_block::log_sense::LogPage,
    wire::{product, sas::RawPdState},
};

/// Index of a physical drive within `AdapterConfig::physicals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdIx(pub usize);

/// Index of a span within `AdapterConfig::spans`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpanIx(pub usize);

/// Index of a logical drive within `AdapterConfig::logicals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LdIx(pub usize);

/// Which of the three wire formats an adapter speaks. Selected once at
/// construction and carried immutably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterVariant {
    /// Legacy mailbox, 8-LD firmware (PERC2).
    V2,
    /// Legacy mailbox, 40-LD firmware (PERC3/4).
    V34,
    /// SAS DCMD frames (PERC5).
    V5,
}

impl AdapterVariant {
    pub fn is_sas(self) -> bool {
        matches!(self, AdapterVariant::V5)
    }
}

impl fmt::Display for AdapterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdapterVariant::V2 => "v2",
            AdapterVariant::V34 => "v34",
            AdapterVariant::V5 => "sas",
        })
    }
}

/// Drive address within an adapter: channel/target for legacy adapters,
/// enclosure-index/slot for SAS. Order matters: the sorted drive index is
/// keyed by (adapter, channel, id).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DriveAddr {
    pub channel: u8,
    pub id: u8,
}

impl fmt::Display for DriveAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.id)
    }
}

/// Physical-drive state, normalized across wire formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PdState {
    UnconfiguredGood,
    UnconfiguredBad,
    Hotspare,
    Failed,
    Rebuilding,
    Online,
    #[default]
    Unknown,
}

impl PdState {
    /// Maps the legacy enquiry per-target state byte.
    pub fn from_legacy(raw: u8) -> Self {
        match raw {
            product::LEGACY_PD_UNCONFIGURED => PdState::UnconfiguredGood,
            product::LEGACY_PD_UNCONFIGURED_BAD => PdState::UnconfiguredBad,
            product::LEGACY_PD_ONLINE => PdState::Online,
            product::LEGACY_PD_FAILED => PdState::Failed,
            product::LEGACY_PD_REBUILDING => PdState::Rebuilding,
            product::LEGACY_PD_HOTSPARE => PdState::Hotspare,
            _ => PdState::Unknown,
        }
    }

    /// Maps SAS firmware state bits with a fixed precedence: for configured
    /// devices online, then rebuilding, then failed, then unknown; for
    /// unconfigured devices hotspare, then unconfigured-bad, then
    /// unconfigured-good.
    pub fn from_firmware(raw: RawPdState) -> Self {
        if raw.contains(RawPdState::CONFIGURED) {
            if raw.contains(RawPdState::ONLINE) {
                PdState::Online
            } else if raw.contains(RawPdState::REBUILD) {
                PdState::Rebuilding
            } else if raw.contains(RawPdState::FAILED) {
                PdState::Failed
            } else {
                PdState::Unknown
            }
        } else if raw.contains(RawPdState::HOTSPARE) {
            PdState::Hotspare
        } else if raw.contains(RawPdState::UNCONFIG_BAD) {
            PdState::UnconfiguredBad
        } else {
            PdState::UnconfiguredGood
        }
    }

    /// Whether this state is acceptable for a configured drive in the
    /// health check.
    pub fn is_healthy(self) -> bool {
        matches!(
            self,
            PdState::Online | PdState::UnconfiguredGood | PdState::Hotspare
        )
    }
}

impl fmt::Display for PdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PdState::UnconfiguredGood => "ready",
            PdState::UnconfiguredBad => "unconfigured-bad",
            PdState::Hotspare => "hotspare",
            PdState::Failed => "failed",
            PdState::Rebuilding => "rebuilding",
            PdState::Online => "online",
            PdState::Unknown => "unknown",
        })
    }
}

/// Logical-drive state, normalized across wire formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LdState {
    Offline,
    Degraded,
    PartiallyDegraded,
    Optimal,
    Deleted,
    #[default]
    Unknown,
}

impl LdState {
    pub fn from_legacy(raw: u8) -> Self {
        match raw {
            product::LEGACY_LD_OFFLINE => LdState::Offline,
            product::LEGACY_LD_DEGRADED => LdState::Degraded,
            product::LEGACY_LD_OPTIMAL => LdState::Optimal,
            product::LEGACY_LD_DELETED => LdState::Deleted,
            _ => LdState::Unknown,
        }
    }

    pub fn from_sas(raw: u8) -> Self {
        use crate::wire::sas;
        match raw {
            sas::SAS_LD_OFFLINE => LdState::Offline,
            sas::SAS_LD_PARTIALLY_DEGRADED => LdState::PartiallyDegraded,
            sas::SAS_LD_DEGRADED => LdState::Degraded,
            sas::SAS_LD_OPTIMAL => LdState::Optimal,
            _ => LdState::Unknown,
        }
    }
}

impl fmt::Display for LdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LdState::Offline => "offline",
            LdState::Degraded => "degraded",
            LdState::PartiallyDegraded => "partially degraded",
            LdState::Optimal => "optimal",
            LdState::Deleted => "deleted",
            LdState::Unknown => "unknown",
        })
    }
}

/// RAID level of a logical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaidLevel {
    Raid0,
    Raid1,
    Raid5,
    Raid6,
    Other(u8),
}

impl RaidLevel {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => RaidLevel::Raid0,
            1 => RaidLevel::Raid1,
            5 => RaidLevel::Raid5,
            6 => RaidLevel::Raid6,
            other => RaidLevel::Other(other),
        }
    }
}

impl fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaidLevel::Raid0 => f.write_str("RAID-0"),
            RaidLevel::Raid1 => f.write_str("RAID-1"),
            RaidLevel::Raid5 => f.write_str("RAID-5"),
            RaidLevel::Raid6 => f.write_str("RAID-6"),
            RaidLevel::Other(raw) => write!(f, "RAID-?({raw})"),
        }
    }
}

/// Probe status of a drive slot. Once a slot has been probed the outcome is
/// permanent for the run: drive hot-swap is not modeled, and a failed probe
/// is never retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Probe {
    #[default]
    Unprobed,
    Present,
    Absent,
}

/// One physical disk slot.
#[derive(Debug, Clone, Default)]
pub struct PhysicalDrive {
    /// Slot is bound to an address (by the config walk or by a claim).
    pub bound: bool,
    pub addr: DriveAddr,
    /// SAS firmware device id; for legacy drives the dense slot index.
    pub device_id: u16,
    pub probe: Probe,
    pub state: PdState,
    /// Capacity in 512-byte blocks.
    pub blocks: u64,
    pub vendor: String,
    pub model: String,
    pub revision: String,
    pub serial: String,
    pub media_errors: u32,
    pub other_errors: u32,
    pub predictive_failures: u32,
    /// Owning span, if the drive is part of one. A drive belongs to at most
    /// one span in this model; multi-span sharing keeps the last one seen.
    pub span: Option<SpanIx>,
    /// First probe failure, kept for the rest of the run.
    pub errmsg: Option<&'static str>,
    /// Lazily-populated log-page cache, most recent fetch first.
    pub log_pages: Vec<LogPage>,
}

/// A RAID stripe group.
#[derive(Debug, Clone, Default)]
pub struct Span {
    pub num_disks: u8,
    /// One entry per disk slot; `None` marks a missing member.
    pub disks: Vec<Option<PdIx>>,
    /// Blocks contributed per member disk.
    pub blocks_per_disk: u64,
    /// Logical drives this span contributes to. Exactly one on legacy
    /// adapters; SAS spans may feed several.
    pub logicals: Vec<LdIx>,
}

/// One span reference inside a logical drive: which span, and which block
/// range of it. Legacy adapters always use offset 0 and the full span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanRef {
    pub span: SpanIx,
    pub start_block: u64,
    pub num_blocks: u64,
}

/// A RAID volume.
#[derive(Debug, Clone)]
pub struct LogicalDrive {
    pub target: u8,
    pub raid_level: RaidLevel,
    pub state: LdState,
    pub num_spans: u8,
    /// Disks per span.
    pub span_size: u8,
    pub spans: Vec<SpanRef>,
}

/// One channel (legacy) or enclosure (SAS).
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub id: u8,
    pub is_enclosure: bool,
    pub slots: u8,
}

/// Fully-normalized configuration of one adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub adapter: u8,
    pub variant: AdapterVariant,
    pub product_name: String,
    pub firmware_version: String,
    pub bios_version: String,
    pub memory_mb: u16,
    pub max_commands: u16,
    pub rebuild_rate: u8,
    /// Raw firmware battery status byte; zero means healthy.
    pub battery_status: Option<u8>,
    pub channels: Vec<Channel>,
    pub physicals: Vec<PhysicalDrive>,
    pub spans: Vec<Span>,
    pub logicals: Vec<LogicalDrive>,
}

impl AdapterConfig {
    pub fn new(adapter: u8, variant: AdapterVariant) -> Self {
        Self {
            adapter,
            variant,
            product_name: String::new(),
            firmware_version: String::new(),
            bios_version: String::new(),
            memory_mb: 0,
            max_commands: 0,
            rebuild_rate: 0,
            battery_status: None,
            channels: Vec::new(),
            physicals: Vec::new(),
            spans: Vec::new(),
            logicals: Vec::new(),
        }
    }

    /// Finds the slot already bound to `addr`, if any.
    pub fn find_slot(&self, addr: DriveAddr) -> Option<PdIx> {
        self.physicals
            .iter()
            .position(|pd| pd.bound && pd.addr == addr)
            .map(PdIx)
    }

    /// Claims the first unbound slot for `addr`. Returns `None` when every
    /// slot is taken.
    pub fn claim_slot(&mut self, addr: DriveAddr) -> Option<PdIx> {
        let ix = self.physicals.iter().position(|pd| !pd.bound)?;
        let pd = &mut self.physicals[ix];
        pd.bound = true;
        pd.addr = addr;
        Some(PdIx(ix))
    }

    pub fn pd(&self, ix: PdIx) -> &PhysicalDrive {
        &self.physicals[ix.0]
    }

    pub fn span(&self, ix: SpanIx) -> &Span {
        &self.spans[ix.0]
    }

    pub fn ld(&self, ix: LdIx) -> &LogicalDrive {
        &self.logicals[ix.0]
    }
}
