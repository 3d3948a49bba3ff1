// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use megactl_rs::{
    cfg::cli::CliOptions,
    ioctl::mock::{MockKey, MockTransport},
    report::{TargetFilter, health_problems, print_adapter},
    topology::registry::AdapterRegistry,
    wire::mbox::{
        FC_NEW_CONFIG, MBOX_CMD_PRED_FAIL, NC_SUBOP_ENQUIRY3,
        NC_SUBOP_PRODUCT_INFO, NC_SUBOP_READ_CONFIG,
    },
};

use crate::unit_tests::fixtures::{
    LdSpec, SpanSpec, disk_array_v34, enquiry3, inquiry_disk, pred_fail,
    product_info, serial_page,
};

fn mbox_key(cmd: u8, subop: u8) -> MockKey {
    MockKey::Mailbox {
        adapter: 0,
        cmd,
        subop,
    }
}

fn inquiry_key(channel: u8, target: u8, page: u8) -> MockKey {
    MockKey::Passthrough {
        adapter: 0,
        channel,
        target,
        opcode: 0x12,
        page,
    }
}

/// Degraded RAID-1: c0t0 online, c0t1 failed, predictive counters on t0,
/// battery unhealthy.
fn program_degraded(mock: &mut MockTransport) {
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
        product_info(false),
    );
    let mut enq = enquiry3(&[0x01], &[(0, 0x03), (1, 0x04)]);
    enq[8] = 0x10; // battery status byte, non-zero is a fault
    mock.program(mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3), enq);
    mock.program(
        mbox_key(MBOX_CMD_PRED_FAIL, 0),
        pred_fail(&[(0, (0, 0, 3))]),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
        disk_array_v34(&[LdSpec {
            raid: 1,
            row: 2,
            spans: vec![SpanSpec {
                start: 0,
                blocks: 0x1000,
                disks: vec![(0, 0), (0, 1)],
            }],
        }]),
    );
    mock.program(
        inquiry_key(0, 0, 0),
        inquiry_disk("FUJITSU", "MAW3073NC", "0104"),
    );
    mock.program(
        inquiry_key(0, 1, 0),
        inquiry_disk("FUJITSU", "MAW3073NC", "0104"),
    );
}

#[test]
fn health_check_reports_every_problem() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);

    let mut reg = AdapterRegistry::new();
    let problems = health_problems(&mut mock, &mut reg, 0, false, false)?;

    assert!(problems.iter().any(|p| p == "a0d0: logical drive is degraded"));
    assert!(problems.iter().any(|p| p == "a0c0t1: drive is failed"));
    assert!(problems.iter().any(|p| p == "a0c0t0: 3 predictive failure(s)"));
    assert!(problems.iter().any(|p| p.contains("battery")));
    Ok(())
}

#[test]
fn health_check_can_ignore_battery() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);

    let mut reg = AdapterRegistry::new();
    let problems = health_problems(&mut mock, &mut reg, 0, false, true)?;
    assert!(!problems.iter().any(|p| p.contains("battery")));
    Ok(())
}

#[test]
fn healthy_adapter_reports_nothing() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3),
        enquiry3(&[0x02], &[(0, 0x03), (1, 0x03)]),
    );
    mock.program(mbox_key(MBOX_CMD_PRED_FAIL, 0), pred_fail(&[]));

    let mut reg = AdapterRegistry::new();
    let problems = health_problems(&mut mock, &mut reg, 0, false, false)?;
    assert!(problems.is_empty(), "unexpected problems: {problems:?}");
    Ok(())
}

#[test]
fn report_lists_adapter_volumes_and_drives() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);
    mock.program(inquiry_key(0, 0, 0x80), serial_page("DAL1P6703"));

    let mut reg = AdapterRegistry::new();
    let mut out = Vec::new();
    let opts = CliOptions {
        show_serials: true,
        ..CliOptions::default()
    };
    print_adapter(
        &mut out,
        &mut mock,
        &mut reg,
        0,
        false,
        TargetFilter::default(),
        &opts,
    )?;

    let text = String::from_utf8(out)?;
    assert!(text.contains("PERC 3/DC"), "report was: {text}");
    assert!(text.contains("a0d0: RAID-1  degraded"), "report was: {text}");
    assert!(text.contains("a0c0t0"), "report was: {text}");
    assert!(text.contains("serial DAL1P6703"), "report was: {text}");
    // The failed drive still shows with its firmware state.
    assert!(text.contains("a0c0t1"), "report was: {text}");
    Ok(())
}

#[test]
fn suppressing_drives_skips_listing_and_probes() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);

    let mut reg = AdapterRegistry::new();
    let mut out = Vec::new();
    let opts = CliOptions {
        no_drives: true,
        ..CliOptions::default()
    };
    print_adapter(
        &mut out,
        &mut mock,
        &mut reg,
        0,
        false,
        TargetFilter::default(),
        &opts,
    )?;

    let text = String::from_utf8(out)?;
    // Volumes still print; the drive section does not, and nothing was
    // probed to produce it.
    assert!(text.contains("a0d0: RAID-1"), "report was: {text}");
    assert!(!text.contains("Drives:"), "report was: {text}");
    assert_eq!(mock.count(&inquiry_key(0, 0, 0)), 0);
    assert_eq!(mock.count(&inquiry_key(0, 1, 0)), 0);
    Ok(())
}

#[test]
fn target_filter_narrows_the_drive_list() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_degraded(&mut mock);

    let mut reg = AdapterRegistry::new();
    let mut out = Vec::new();
    let opts = CliOptions::default();
    print_adapter(
        &mut out,
        &mut mock,
        &mut reg,
        0,
        false,
        TargetFilter {
            channel: Some(0),
            id: Some(1),
        },
        &opts,
    )?;

    let text = String::from_utf8(out)?;
    let drives = text.split("Drives:").nth(1).expect("drive section");
    assert!(drives.contains("a0c0t1"), "report was: {text}");
    assert!(!drives.contains("a0c0t0 "), "report was: {text}");
    Ok(())
}
