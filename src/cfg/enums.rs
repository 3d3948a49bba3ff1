// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::control_block::send_diagnostic::{SELF_TEST_EXTENDED, SELF_TEST_SHORT};

/// Command retry behavior.
///
/// `None` is the only supported policy: every firmware command is issued
/// exactly once and a failure surfaces immediately. The knob exists so the
/// configuration names the behavior instead of implying it.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    #[serde(rename = "None", alias = "none", alias = "NONE")]
    #[default]
    None,
}
impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("None")
    }
}

/// Drive self-test variants selectable from the command line.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestKind {
    #[serde(rename = "Short", alias = "short")]
    Short,
    #[serde(rename = "Extended", alias = "extended", alias = "long")]
    Extended,
}
impl SelfTestKind {
    /// SEND DIAGNOSTIC self-test code for this variant.
    pub fn code(self) -> u8 {
        match self {
            SelfTestKind::Short => SELF_TEST_SHORT,
            SelfTestKind::Extended => SELF_TEST_EXTENDED,
        }
    }
}
impl fmt::Display for SelfTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelfTestKind::Short => "Short",
            SelfTestKind::Extended => "Extended",
        })
    }
}
