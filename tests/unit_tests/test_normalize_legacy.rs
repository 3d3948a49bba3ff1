// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use megactl_rs::{
    ioctl::mock::{MockKey, MockTransport},
    topology::{
        model::{AdapterVariant, LdIx, LdState, PdIx, PdState, RaidLevel, SpanIx},
        normalize,
    },
    wire::mbox::{
        FC_NEW_CONFIG, MBOX_CMD_ADAPTER_ENQUIRY, MBOX_CMD_PRED_FAIL,
        MBOX_CMD_READ_CONFIG_8LD, NC_SUBOP_ENQUIRY3, NC_SUBOP_PRODUCT_INFO,
        NC_SUBOP_READ_CONFIG,
    },
};

use crate::unit_tests::fixtures::{
    LdSpec, SpanSpec, disk_array_v2, disk_array_v34, enquiry3, enquiry_v2,
    pred_fail, product_info,
};

fn mbox_key(cmd: u8, subop: u8) -> MockKey {
    MockKey::Mailbox {
        adapter: 0,
        cmd,
        subop,
    }
}

/// One RAID-5 LD over three disks on channel 0, plus a hotspare at c0t5.
fn program_v34(mock: &mut MockTransport) {
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
        product_info(false),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3),
        enquiry3(&[0x02], &[(0, 0x03), (1, 0x03), (2, 0x03), (5, 0x06)]),
    );
    mock.program(
        mbox_key(MBOX_CMD_PRED_FAIL, 0),
        pred_fail(&[(1, (7, 1, 2))]),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
        disk_array_v34(&[LdSpec {
            raid: 5,
            row: 3,
            spans: vec![SpanSpec {
                start: 0,
                blocks: 0x2000,
                disks: vec![(0, 0), (0, 1), (0, 2)],
            }],
        }]),
    );
}

#[test]
fn v34_adapter_builds_full_topology() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_v34(&mut mock);

    let cfg = normalize::build_legacy(&mut mock, 0)?;

    assert_eq!(cfg.variant, AdapterVariant::V34);
    assert_eq!(cfg.product_name, "PERC 3/DC");
    assert_eq!(cfg.firmware_version, "1.01");
    assert_eq!(cfg.bios_version, "3.33");
    assert_eq!(cfg.memory_mb, 128);
    assert_eq!(cfg.rebuild_rate, 30);
    assert_eq!(cfg.channels.len(), 2);
    assert!(!cfg.channels[0].is_enclosure);

    assert_eq!(cfg.logicals.len(), 1);
    let ld = &cfg.logicals[0];
    assert_eq!(ld.raid_level, RaidLevel::Raid5);
    assert_eq!(ld.state, LdState::Optimal);
    assert_eq!(ld.num_spans, 1);
    assert_eq!(ld.span_size, 3);
    assert_eq!(ld.spans[0].start_block, 0);
    assert_eq!(ld.spans[0].num_blocks, 0x2000);

    assert_eq!(cfg.spans.len(), 1);
    let span = &cfg.spans[0];
    assert_eq!(span.blocks_per_disk, 0x2000);
    assert_eq!(
        span.disks,
        vec![Some(PdIx(0)), Some(PdIx(1)), Some(PdIx(2))]
    );

    // Dense slot indexing: c0t1 is slot 1.
    let pd = &cfg.physicals[1];
    assert!(pd.bound);
    assert_eq!(pd.state, PdState::Online);
    assert_eq!(pd.span, Some(SpanIx(0)));
    assert_eq!(
        (pd.media_errors, pd.other_errors, pd.predictive_failures),
        (7, 1, 2)
    );

    // The hotspare sits outside every span yet still gets a slot.
    let spare = &cfg.physicals[5];
    assert!(spare.bound);
    assert_eq!(spare.state, PdState::Hotspare);
    assert_eq!(spare.span, None);

    // Slots nobody mentioned stay unbound.
    assert!(!cfg.physicals[7].bound);
    Ok(())
}

#[test]
fn v2_heuristic_selects_v2_command_set() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
        product_info(true),
    );
    mock.program(
        mbox_key(MBOX_CMD_ADAPTER_ENQUIRY, 0),
        enquiry_v2(&[0x02], &[(0, 0x03), (1, 0x03)]),
    );
    mock.program(mbox_key(MBOX_CMD_PRED_FAIL, 0), pred_fail(&[]));
    mock.program(
        mbox_key(MBOX_CMD_READ_CONFIG_8LD, 0),
        disk_array_v2(&[LdSpec {
            raid: 1,
            row: 2,
            spans: vec![SpanSpec {
                start: 0,
                blocks: 0x1000,
                disks: vec![(0, 0), (0, 1)],
            }],
        }]),
    );

    let cfg = normalize::build_legacy(&mut mock, 0)?;

    assert_eq!(cfg.variant, AdapterVariant::V2);
    assert_eq!(cfg.rebuild_rate, 50);
    assert_eq!(cfg.logicals[0].raid_level, RaidLevel::Raid1);
    // The v34 command set was never touched.
    assert_eq!(mock.count(&mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3)), 0);
    assert_eq!(mock.count(&mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG)), 0);
    Ok(())
}

#[test]
fn ld_count_out_of_range_is_fatal() {
    let mut mock = MockTransport::new(1);
    program_v34(&mut mock);

    let mut blob = disk_array_v34(&[]);
    blob[0] = 41; // layout holds 40
    mock.program(mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG), blob);

    let err = normalize::build_legacy(&mut mock, 0).expect_err("over-range count");
    assert!(err.to_string().contains("41"));
}

#[test]
fn span_depth_is_clamped_to_layout() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_v34(&mut mock);

    let mut blob = disk_array_v34(&[LdSpec {
        raid: 0,
        row: 1,
        spans: vec![SpanSpec {
            start: 0,
            blocks: 0x100,
            disks: vec![(0, 0)],
        }],
    }]);
    // First record starts after the 4-byte header; span_depth is its first
    // byte. Claim more spans than the record can hold.
    blob[4] = 9;
    mock.program(mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG), blob);

    let cfg = normalize::build_legacy(&mut mock, 0)?;
    assert_eq!(cfg.logicals[0].num_spans, 8);
    assert_eq!(cfg.spans.len(), 8);
    Ok(())
}

#[test]
fn two_logical_drives_get_distinct_spans() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_v34(&mut mock);
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3),
        enquiry3(
            &[0x02, 0x02],
            &[(0, 0x03), (1, 0x03), (2, 0x03), (16, 0x03), (17, 0x03), (18, 0x03)],
        ),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
        disk_array_v34(&[
            LdSpec {
                raid: 5,
                row: 3,
                spans: vec![SpanSpec {
                    start: 0,
                    blocks: 0x2000,
                    disks: vec![(0, 0), (0, 1), (0, 2)],
                }],
            },
            LdSpec {
                raid: 5,
                row: 3,
                spans: vec![SpanSpec {
                    start: 0,
                    blocks: 0x3000,
                    disks: vec![(1, 0), (1, 1), (1, 2)],
                }],
            },
        ]),
    );

    let cfg = normalize::build_legacy(&mut mock, 0)?;
    assert_eq!(cfg.logicals.len(), 2);
    assert_eq!(cfg.spans.len(), 2);

    // Each volume owns exactly one span, and each span feeds exactly one
    // volume; nothing is shared.
    assert_eq!(cfg.logicals[0].spans.len(), 1);
    assert_eq!(cfg.logicals[1].spans.len(), 1);
    assert_eq!(cfg.logicals[0].spans[0].span, SpanIx(0));
    assert_eq!(cfg.logicals[1].spans[0].span, SpanIx(1));
    assert_eq!(cfg.spans[0].logicals, vec![LdIx(0)]);
    assert_eq!(cfg.spans[1].logicals, vec![LdIx(1)]);
    assert_eq!(
        cfg.spans[1].disks,
        vec![Some(PdIx(16)), Some(PdIx(17)), Some(PdIx(18))]
    );
    Ok(())
}

#[test]
fn multi_span_ld_creates_one_span_per_record() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_v34(&mut mock);
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_READ_CONFIG),
        disk_array_v34(&[LdSpec {
            raid: 5,
            row: 2,
            spans: vec![
                SpanSpec {
                    start: 0,
                    blocks: 0x1000,
                    disks: vec![(0, 0), (0, 1)],
                },
                SpanSpec {
                    start: 0,
                    blocks: 0x1000,
                    disks: vec![(1, 0), (1, 1)],
                },
            ],
        }]),
    );

    let cfg = normalize::build_legacy(&mut mock, 0)?;
    assert_eq!(cfg.spans.len(), 2);
    assert_eq!(cfg.logicals[0].spans.len(), 2);
    // Second span's disks live on channel 1: slots 16 and 17.
    assert_eq!(
        cfg.spans[1].disks,
        vec![Some(PdIx(16)), Some(PdIx(17))]
    );
    Ok(())
}
