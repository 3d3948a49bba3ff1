// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SEND DIAGNOSTIC (6): CDB filler for triggering drive self-tests.
//!
//! CDB layout (SPC):
//!   [0] = 0x1D
//!   [1] = self-test code (bits 7..5) | SELFTEST (bit 2)
//!   [2] = reserved
//!   [3..5] = parameter list length (0, no list)
//!   [5] = Control

pub const SEND_DIAGNOSTIC_OPCODE: u8 = 0x1D;

/// Self-test code: background short self-test.
pub const SELF_TEST_SHORT: u8 = 0b001;
/// Self-test code: background extended self-test.
pub const SELF_TEST_EXTENDED: u8 = 0b010;

/// Fill a SEND DIAGNOSTIC CDB starting a background self-test.
#[inline]
pub fn fill_send_diagnostic(cdb: &mut [u8; 16], self_test_code: u8) {
    cdb.fill(0);
    cdb[0] = SEND_DIAGNOSTIC_OPCODE;
    cdb[1] = (self_test_code & 0x07) << 5;
}
