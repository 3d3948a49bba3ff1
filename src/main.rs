// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use megactl_rs::{
    cfg::{
        cli::{CliOptions, TargetSpec, USAGE, parse_args, resolve_config_path},
        config::Config,
        logger::init_logger,
    },
    ioctl::{
        device::{DeviceTransport, DriverKind},
        transport::MegaTransport,
    },
    report::{TargetFilter, health_problems, print_adapter, start_self_test},
    topology::{model::DriveAddr, registry::AdapterRegistry},
};
use tracing::debug;

fn main() -> ExitCode {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("megactl: {e}");
            return ExitCode::from(2);
        },
    };

    if opts.print_help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if opts.print_version {
        println!("megactl {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let _logger_guard = match init_logger(opts.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("megactl: {e}");
            return ExitCode::from(2);
        },
    };

    match run(&opts) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("megactl: {e:#}");
            ExitCode::from(2)
        },
    }
}

fn run(opts: &CliOptions) -> Result<ExitCode> {
    let config = match &opts.config_path {
        Some(path) => resolve_config_path(path)
            .and_then(Config::load_from_file)
            .context("failed to resolve or load config")?,
        None => Config::default(),
    };

    let (mut transport, sas) = open_transport(&config)?;
    transport.set_timeout_secs(config.runtime.command_timeout.as_secs() as u16);

    let count = transport.adapter_count().context("adapter count query failed")?;
    debug!(count, sas, "driver node open");
    if count == 0 {
        bail!("driver reports no adapters");
    }

    let work = work_list(opts, count)?;
    let mut registry = AdapterRegistry::new();

    if let Some(kind) = opts.self_test {
        for target in &work {
            let (Some(channel), Some(id)) = (target.channel, target.id) else {
                continue;
            };
            let addr = DriveAddr { channel, id };
            start_self_test(&mut transport, &mut registry, target.adapter, sas, addr, kind)?;
            println!("a{} {addr}: {kind} self-test started", target.adapter);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if opts.health_check {
        let mut all_problems = Vec::new();
        for target in &work {
            let mut problems = health_problems(
                &mut transport,
                &mut registry,
                target.adapter,
                sas,
                opts.ignore_battery,
            )?;
            all_problems.append(&mut problems);
        }
        for line in &all_problems {
            println!("{line}");
        }
        return Ok(if all_problems.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;
    for target in &work {
        let filter = TargetFilter {
            channel: target.channel,
            id: target.id,
        };
        if let Err(e) = print_adapter(
            &mut out,
            &mut transport,
            &mut registry,
            target.adapter,
            sas,
            filter,
            opts,
        ) {
            // One broken adapter should not hide the others.
            eprintln!("megactl: adapter a{}: {e:#}", target.adapter);
            failed = true;
        }
    }
    out.flush()?;
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Opens whichever driver node exists, preferring the SAS driver when both
/// are present.
fn open_transport(config: &Config) -> Result<(DeviceTransport, bool)> {
    match DeviceTransport::open_at(DriverKind::Sas, &config.devices.sas_node) {
        Ok(t) => Ok((t, true)),
        Err(sas_err) => {
            match DeviceTransport::open_at(DriverKind::Legacy, &config.devices.legacy_node)
            {
                Ok(t) => Ok((t, false)),
                Err(legacy_err) => bail!(
                    "no usable driver node: {sas_err}; {legacy_err}"
                ),
            }
        },
    }
}

/// Expands the command line into per-adapter targets, validating adapter
/// numbers against the driver-reported count.
fn work_list(opts: &CliOptions, count: u8) -> Result<Vec<TargetSpec>> {
    if opts.targets.is_empty() {
        return Ok((0..count)
            .map(|adapter| TargetSpec {
                adapter,
                channel: None,
                id: None,
            })
            .collect());
    }
    for target in &opts.targets {
        if target.adapter >= count {
            bail!(
                "adapter a{} does not exist (driver reports {count})",
                target.adapter
            );
        }
    }
    Ok(opts.targets.clone())
}
