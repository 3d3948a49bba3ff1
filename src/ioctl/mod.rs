// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// The real `/dev` node transport.
pub mod device;
/// Canned-reply transport with call counters, for tests and dry runs.
pub mod mock;
/// The transport trait and error taxonomy.
pub mod transport;
