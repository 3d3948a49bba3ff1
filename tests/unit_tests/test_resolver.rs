// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use megactl_rs::{
    ioctl::mock::{MockKey, MockTransport},
    topology::{
        model::{DriveAddr, PdState, Probe},
        registry::AdapterRegistry,
    },
    wire::{
        dcmd::{
            MR_DCMD_CFG_READ, MR_DCMD_CTRL_GET_INFO, MR_DCMD_PD_GET_INFO,
            MR_DCMD_PD_GET_LIST,
        },
        mbox::{FC_NEW_CONFIG, MBOX_CMD_PRED_FAIL, NC_SUBOP_ENQUIRY3,
            NC_SUBOP_PRODUCT_INFO, NC_SUBOP_READ_CONFIG,
        },
    },
};

use crate::unit_tests::fixtures::{
    LdSpec, SpanSpec, disk_array_v34, enquiry3, inquiry_absent, inquiry_disk,
    pred_fail, product_info, sas_conf, sas_ctrl_info, sas_pd_info, sas_pd_list,
    serial_page,
};

fn mbox_key(cmd: u8, subop: u8) -> MockKey {
    MockKey::Mailbox {
        adapter: 0,
        cmd,
        subop,
    }
}

fn inquiry_key(channel: u8, target: u8) -> MockKey {
    MockKey::Passthrough {
        adapter: 0,
        channel,
        target,
        opcode: 0x12,
        page: 0,
    }
}

fn serial_key(channel: u8, target: u8) -> MockKey {
    MockKey::Passthrough {
        adapter: 0,
        channel,
        target,
        opcode: 0x12,
        page: 0x80,
    }
}

/// One RAID-1 LD over c0t0/c0t1.
fn program_legacy(mock: &mut MockTransport) {
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_PRODUCT_INFO),
        product_info(false),
    );
    mock.program(
        mbox_key(FC_NEW_CONFIG, NC_SUBOP_ENQUIRY3),
        enquiry3(&[0x02], &[(0, 0x03), (1, 0x03)]),
    );
    mock.program(mbox_key(MBOX_CMD_PRED_FAIL, 0), pred_fail(&[]));
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
}

#[test]
fn legacy_probe_is_lazy_and_cached() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program(inquiry_key(0, 0), inquiry_disk("FUJITSU", "MAW3073NC", "0104"));
    mock.program(serial_key(0, 0), serial_page("DAL1P6703"));

    let mut reg = AdapterRegistry::new();
    reg.adapter_config(&mut mock, 0, false)?;
    // Building the configuration probes nothing.
    assert_eq!(mock.count(&inquiry_key(0, 0)), 0);

    let addr = DriveAddr { channel: 0, id: 0 };
    let ix = reg
        .physical_drive_info(&mut mock, 0, false, addr, true)?
        .expect("present disk");
    let cfg = reg.config(0).expect("cached");
    let pd = cfg.pd(ix);
    assert_eq!(pd.probe, Probe::Present);
    assert_eq!(pd.vendor, "FUJITSU");
    assert_eq!(pd.model, "MAW3073NC");
    assert_eq!(pd.serial, "DAL1P6703");
    assert_eq!(pd.state, PdState::Online);

    // Second lookup answers from the slot, no new ioctl.
    reg.physical_drive_info(&mut mock, 0, false, addr, true)?
        .expect("still present");
    assert_eq!(mock.count(&inquiry_key(0, 0)), 1);
    assert_eq!(mock.count(&serial_key(0, 0)), 1);
    Ok(())
}

#[test]
fn failed_probe_is_permanent() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program_failure(inquiry_key(0, 1), 0x0E);

    let mut reg = AdapterRegistry::new();
    let addr = DriveAddr { channel: 0, id: 1 };
    assert!(reg.physical_drive_info(&mut mock, 0, false, addr, true)?.is_none());

    let cfg = reg.config(0).expect("cached");
    let slot = cfg.find_slot(addr).expect("bound by config walk");
    assert_eq!(cfg.pd(slot).probe, Probe::Absent);
    assert_eq!(cfg.pd(slot).errmsg, Some("selection timeout"));

    // Never retried.
    assert!(reg.physical_drive_info(&mut mock, 0, false, addr, true)?.is_none());
    assert_eq!(mock.count(&inquiry_key(0, 1)), 1);
    Ok(())
}

#[test]
fn non_disk_reply_marks_slot_empty() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program(inquiry_key(1, 4), inquiry_absent());

    let mut reg = AdapterRegistry::new();
    let addr = DriveAddr { channel: 1, id: 4 };
    assert!(reg.physical_drive_info(&mut mock, 0, false, addr, true)?.is_none());

    // Claimed a slot, probed once, not an error.
    let cfg = reg.config(0).expect("cached");
    let slot = cfg.find_slot(addr).expect("claimed");
    assert_eq!(cfg.pd(slot).probe, Probe::Absent);
    assert_eq!(cfg.pd(slot).errmsg, None);
    Ok(())
}

#[test]
fn pure_lookup_answers_without_probing() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program(inquiry_key(0, 0), inquiry_disk("FUJITSU", "MAW3073NC", "0104"));
    mock.program(serial_key(0, 0), serial_page("DAL1P6703"));
    mock.program_failure(inquiry_key(0, 1), 0x0E);

    let mut reg = AdapterRegistry::new();
    reg.adapter_config(&mut mock, 0, false)?;
    let calls = mock.total_calls();

    // Miss on an unbound address: no slot claimed, zero ioctls.
    let miss = DriveAddr { channel: 1, id: 6 };
    assert!(reg.physical_drive_info(&mut mock, 0, false, miss, false)?.is_none());
    assert_eq!(mock.total_calls(), calls);
    assert!(reg.config(0).expect("cached").find_slot(miss).is_none());

    // A bound but unprobed slot is not probed either.
    let bound = DriveAddr { channel: 0, id: 0 };
    assert!(reg.physical_drive_info(&mut mock, 0, false, bound, false)?.is_none());
    assert_eq!(mock.total_calls(), calls);

    // Once probed present, the lookup answers from the slot.
    let ix = reg
        .physical_drive_info(&mut mock, 0, false, bound, true)?
        .expect("present disk");
    let after = mock.total_calls();
    assert_eq!(
        reg.physical_drive_info(&mut mock, 0, false, bound, false)?,
        Some(ix)
    );
    assert_eq!(mock.total_calls(), after);

    // A slot probed absent stays a quiet miss.
    let failed = DriveAddr { channel: 0, id: 1 };
    reg.physical_drive_info(&mut mock, 0, false, failed, true)?;
    let after = mock.total_calls();
    assert!(reg.physical_drive_info(&mut mock, 0, false, failed, false)?.is_none());
    assert_eq!(mock.total_calls(), after);
    Ok(())
}

#[test]
fn probed_slot_outside_config_reports_ready() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program(inquiry_key(1, 3), inquiry_disk("SEAGATE", "ST336607LC", "0007"));

    let mut reg = AdapterRegistry::new();
    let addr = DriveAddr { channel: 1, id: 3 };
    let ix = reg
        .physical_drive_info(&mut mock, 0, false, addr, true)?
        .expect("present disk");

    // Outside the configuration walk the enquiry table holds state 0.
    let cfg = reg.config(0).expect("cached");
    assert_eq!(cfg.pd(ix).state, PdState::UnconfiguredGood);
    Ok(())
}

#[test]
fn drive_index_is_sorted_regardless_of_probe_order() -> Result<()> {
    let mut mock = MockTransport::new(1);
    program_legacy(&mut mock);
    mock.program(inquiry_key(0, 0), inquiry_disk("FUJITSU", "MAW3073NC", "0104"));
    mock.program(inquiry_key(0, 1), inquiry_disk("FUJITSU", "MAW3073NC", "0104"));

    let mut reg = AdapterRegistry::new();
    // Probe in reverse address order.
    reg.physical_drive_info(&mut mock, 0, false, DriveAddr { channel: 0, id: 1 }, true)?;
    reg.physical_drive_info(&mut mock, 0, false, DriveAddr { channel: 0, id: 0 }, true)?;

    let addrs: Vec<DriveAddr> =
        reg.physical_list().iter().map(|k| k.addr).collect();
    assert_eq!(
        addrs,
        vec![
            DriveAddr { channel: 0, id: 0 },
            DriveAddr { channel: 0, id: 1 }
        ]
    );
    Ok(())
}

#[test]
fn sas_adapter_resolves_every_listed_drive_eagerly() -> Result<()> {
    let mut mock = MockTransport::new(1);
    mock.program(
        MockKey::Dcmd {
            adapter: 0,
            opcode: MR_DCMD_CTRL_GET_INFO,
            device_id: 0,
        },
        sas_ctrl_info(2),
    );
    mock.program(
        MockKey::Dcmd {
            adapter: 0,
            opcode: MR_DCMD_PD_GET_LIST,
            device_id: 0,
        },
        sas_pd_list(&[(10, 1, 0), (11, 1, 1)]),
    );
    mock.program(
        MockKey::Dcmd {
            adapter: 0,
            opcode: MR_DCMD_CFG_READ,
            device_id: 0,
        },
        sas_conf(&[], &[]),
    );
    // fw_state 0x0003: configured + online.
    mock.program(
        MockKey::Dcmd {
            adapter: 0,
            opcode: MR_DCMD_PD_GET_INFO,
            device_id: 10,
        },
        sas_pd_info(10, 0x0003, 0x1117_0000, (3, 0, 1), "3LC04Y5D"),
    );
    mock.program(
        MockKey::Dcmd {
            adapter: 0,
            opcode: MR_DCMD_PD_GET_INFO,
            device_id: 11,
        },
        sas_pd_info(11, 0x0010, 0x1117_0000, (0, 0, 0), "3LC05A2B"),
    );

    let mut reg = AdapterRegistry::new();
    reg.adapter_config(&mut mock, 0, true)?;

    assert_eq!(reg.physical_list().len(), 2);
    let cfg = reg.config(0).expect("cached");
    let first = cfg.pd(reg.physical_list()[0].pd);
    assert_eq!(first.state, PdState::Online);
    assert_eq!(first.blocks, 0x1117_0000);
    assert_eq!(first.serial, "3LC04Y5D");
    assert_eq!(first.predictive_failures, 1);
    let second = cfg.pd(reg.physical_list()[1].pd);
    assert_eq!(second.state, PdState::Hotspare);

    // One info query per device, and the cached config asks nothing more.
    let info_key = |device_id| MockKey::Dcmd {
        adapter: 0,
        opcode: MR_DCMD_PD_GET_INFO,
        device_id,
    };
    assert_eq!(mock.count(&info_key(10)), 1);
    assert_eq!(mock.count(&info_key(11)), 1);
    let calls = mock.total_calls();
    reg.adapter_config(&mut mock, 0, true)?;
    assert_eq!(mock.total_calls(), calls);
    Ok(())
}
