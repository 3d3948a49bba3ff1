// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Command-line parsing.
//!
//! Targets select what to report on. `aN` is a whole adapter, `aNcM` one
//! legacy channel, `aNcMtK` one legacy drive; SAS adapters use `aNeMsK`
//! (enclosure/slot) for the same shape. No targets means every adapter.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};

use crate::cfg::enums::SelfTestKind;

pub const USAGE: &str = "\
usage: megactl [options] [target ...]
  targets: aN | aNcMtK | aNeMsK  (adapter, legacy channel/target, enclosure/slot)
  -c <file>        read configuration from <file>
  -v               increase verbosity (repeatable)
  -e               show drive error counters
  -s               show drive serial numbers
  -t               show drive temperature
  -l <page>        dump one SCSI log page (hex page code accepted)
  -p               suppress the physical drive listing
  -a               probe every drive slot, not just configured ones
  -T short|extended  start a drive self-test on the targeted drives
  -H               health check: print problems only, exit 1 if any
  -B               ignore battery status in the health check
  -V               print version and exit
  -h               print this help";

/// One positional target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    pub adapter: u8,
    /// Channel (legacy) or enclosure index (SAS).
    pub channel: Option<u8>,
    /// Target id (legacy) or slot (SAS); requires `channel`.
    pub id: Option<u8>,
}

/// Parsed command line.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub config_path: Option<String>,
    pub verbose: u8,
    pub show_errors: bool,
    pub show_serials: bool,
    pub show_temperature: bool,
    pub dump_page: Option<u8>,
    pub no_drives: bool,
    pub probe_all: bool,
    pub self_test: Option<SelfTestKind>,
    pub health_check: bool,
    pub ignore_battery: bool,
    pub print_version: bool,
    pub print_help: bool,
    pub targets: Vec<TargetSpec>,
}

/// Parses the argument list (without the program name).
pub fn parse_args<I>(args: I) -> Result<CliOptions>
where I: IntoIterator<Item = String> {
    let mut opts = CliOptions::default();
    let mut it = args.into_iter();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-c" => {
                opts.config_path =
                    Some(it.next().context("-c requires a file argument")?);
            },
            "-v" => opts.verbose = opts.verbose.saturating_add(1),
            "-e" => opts.show_errors = true,
            "-s" => opts.show_serials = true,
            "-t" => opts.show_temperature = true,
            "-l" => {
                let page = it.next().context("-l requires a page argument")?;
                opts.dump_page = Some(parse_page(&page)?);
            },
            "-p" => opts.no_drives = true,
            "-a" => opts.probe_all = true,
            "-T" => {
                let kind = it.next().context("-T requires short or extended")?;
                opts.self_test = Some(match kind.as_str() {
                    "short" => SelfTestKind::Short,
                    "extended" | "long" => SelfTestKind::Extended,
                    other => bail!("unknown self-test kind {other:?}"),
                });
            },
            "-H" => opts.health_check = true,
            "-B" => opts.ignore_battery = true,
            "-V" => opts.print_version = true,
            "-h" | "--help" => opts.print_help = true,
            flag if flag.starts_with('-') => {
                bail!("unknown option {flag}\n{USAGE}");
            },
            target => opts.targets.push(parse_target(target)?),
        }
    }

    if opts.self_test.is_some() {
        ensure!(
            opts.targets.iter().any(|t| t.id.is_some()),
            "-T requires at least one drive target (aNcMtK or aNeMsK)"
        );
    }
    Ok(opts)
}

/// Log page code, decimal or `0x`-prefixed hex.
fn parse_page(s: &str) -> Result<u8> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("bad log page code {s:?}"))
}

/// Splits leading decimal digits off a string.
fn split_num(s: &str) -> Option<(u8, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let n = s[..end].parse().ok()?;
    Some((n, &s[end..]))
}

/// Parses one target: `aN`, `aNcM`, `aNcMtK`, `aNeM`, or `aNeMsK`.
pub fn parse_target(s: &str) -> Result<TargetSpec> {
    let bad = || anyhow::anyhow!("bad target {s:?}\n{USAGE}");

    let rest = s.strip_prefix('a').ok_or_else(bad)?;
    let (adapter, rest) = split_num(rest).ok_or_else(bad)?;
    if rest.is_empty() {
        return Ok(TargetSpec {
            adapter,
            channel: None,
            id: None,
        });
    }

    // Channel/target for legacy adapters, enclosure/slot for SAS; the two
    // spellings are equivalent here.
    let (id_key, rest) = match rest.as_bytes().first() {
        Some(b'c') => ('t', &rest[1..]),
        Some(b'e') => ('s', &rest[1..]),
        _ => return Err(bad()),
    };
    let (channel, rest) = split_num(rest).ok_or_else(bad)?;
    if rest.is_empty() {
        return Ok(TargetSpec {
            adapter,
            channel: Some(channel),
            id: None,
        });
    }

    let rest = rest.strip_prefix(id_key).ok_or_else(bad)?;
    let (id, rest) = split_num(rest).ok_or_else(bad)?;
    ensure!(rest.is_empty(), "bad target {s:?}\n{USAGE}");
    Ok(TargetSpec {
        adapter,
        channel: Some(channel),
        id: Some(id),
    })
}

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}
