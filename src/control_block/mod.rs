// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod common;
pub mod inquiry;
pub mod log_sense;
pub mod send_diagnostic;
