// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use megactl_rs::{
    control_block::log_sense::{LogPageData, PAGE_SUPPORTED, PAGE_TEMPERATURE},
    ioctl::mock::{MockKey, MockTransport},
    topology::{log_page::drive_log_page, model::DriveAddr, registry::AdapterRegistry},
    wire::mbox::{
        FC_NEW_CONFIG, MBOX_CMD_PRED_FAIL, NC_SUBOP_ENQUIRY3,
        NC_SUBOP_PRODUCT_INFO, NC_SUBOP_READ_CONFIG,
    },
};

use crate::unit_tests::fixtures::{
    LdSpec, SpanSpec, disk_array_v34, enquiry3, inquiry_disk, pred_fail,
    product_info, supported_pages, temperature_page,
};

fn mbox_key(cmd: u8, subop: u8) -> MockKey {
    MockKey::Mailbox {
        adapter: 0,
        cmd,
        subop,
    }
}

fn log_key(page: u8) -> MockKey {
    MockKey::Passthrough {
        adapter: 0,
        channel: 0,
        target: 0,
        opcode: 0x4D,
        page,
    }
}

/// Registry with one resolved legacy drive at c0t0.
fn resolved_drive(
    mock: &mut MockTransport,
) -> Result<(AdapterRegistry, megactl_rs::topology::model::PdIx)> {
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
        product_info(false),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3),
        enquiry3(&[0x02], &[(0, 0x03)]),
    );
    mock.program(mbox_key(MBOX_CMD_PRED_FAIL, 0), pred_fail(&[]));
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
        disk_array_v34(&[LdSpec {
            raid: 0,
            row: 1,
            spans: vec![SpanSpec {
                start: 0,
                blocks: 0x1000,
                disks: vec![(0, 0)],
            }],
        }]),
    );
    mock.program(
        MockKey::Passthrough {
            adapter: 0,
            channel: 0,
            target: 0,
            opcode: 0x12,
            page: 0,
        },
        inquiry_disk("FUJITSU", "MAW3073NC", "0104"),
    );

    let mut reg = AdapterRegistry::new();
    let ix = reg
        .physical_drive_info(mock, 0, false, DriveAddr { channel: 0, id: 0 }, true)?
        .expect("present disk");
    Ok((reg, ix))
}

#[test]
fn page_fetch_goes_through_supported_bitmap_and_caches() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(log_key(PAGE_SUPPORTED), supported_pages(&[0x02, 0x0D]));
    mock.program(log_key(PAGE_TEMPERATURE), temperature_page(35));
    let (mut reg, ix) = resolved_drive(&mut mock)?;
    let cfg = reg.config_mut(0).expect("cached");

    let page = drive_log_page(&mut mock, cfg, ix, PAGE_TEMPERATURE)
        .expect("advertised page");
    match &page.data {
        LogPageData::Temperature(t) => assert_eq!(t.current_c, 35),
        other => panic!("unexpected page data: {other:?}"),
    }
    // Prerequisite bitmap first, then the page itself.
    assert_eq!(mock.count(&log_key(PAGE_SUPPORTED)), 1);
    assert_eq!(mock.count(&log_key(PAGE_TEMPERATURE)), 1);

    // Second request is a pure cache hit.
    drive_log_page(&mut mock, cfg, ix, PAGE_TEMPERATURE).expect("cached");
    assert_eq!(mock.count(&log_key(PAGE_SUPPORTED)), 1);
    assert_eq!(mock.count(&log_key(PAGE_TEMPERATURE)), 1);
    Ok(())
}

#[test]
fn unadvertised_page_is_never_requested() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(log_key(PAGE_SUPPORTED), supported_pages(&[0x02]));
    let (mut reg, ix) = resolved_drive(&mut mock)?;
    let cfg = reg.config_mut(0).expect("cached");

    assert!(drive_log_page(&mut mock, cfg, ix, 0x10).is_none());
    assert_eq!(mock.count(&log_key(0x10)), 0);

    // The bitmap itself stays cached across refusals.
    assert!(drive_log_page(&mut mock, cfg, ix, 0x10).is_none());
    assert_eq!(mock.count(&log_key(PAGE_SUPPORTED)), 1);
    Ok(())
}

#[test]
fn failed_fetch_is_not_cached_negatively() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(log_key(PAGE_SUPPORTED), supported_pages(&[0x03]));
    mock.program_failure(log_key(0x03), 0x04);
    let (mut reg, ix) = resolved_drive(&mut mock)?;
    let cfg = reg.config_mut(0).expect("cached");

    assert!(drive_log_page(&mut mock, cfg, ix, 0x03).is_none());
    assert_eq!(mock.count(&log_key(0x03)), 1);

    // The device recovered; the next request fetches again and succeeds.
    mock.program(
        log_key(0x03),
        vec![0x03, 0x00, 0x00, 0x06, 0x00, 0x03, 0x00, 0x02, 0x00, 0x09],
    );
    let page = drive_log_page(&mut mock, cfg, ix, 0x03).expect("second try");
    match &page.data {
        LogPageData::Counters(c) => assert_eq!(c.corrected, 9),
        other => panic!("unexpected page data: {other:?}"),
    }
    assert_eq!(mock.count(&log_key(0x03)), 2);
    Ok(())
}

#[test]
fn supported_page_itself_is_cached() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(log_key(PAGE_SUPPORTED), supported_pages(&[0x02]));
    let (mut reg, ix) = resolved_drive(&mut mock)?;
    let cfg = reg.config_mut(0).expect("cached");

    let page =
        drive_log_page(&mut mock, cfg, ix, PAGE_SUPPORTED).expect("bitmap");
    assert!(page.supports(0x02));
    drive_log_page(&mut mock, cfg, ix, PAGE_SUPPORTED).expect("cached bitmap");
    assert_eq!(mock.count(&log_key(PAGE_SUPPORTED)), 1);
    Ok(())
}
