// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Per-drive log-sense page cache.
pub mod log_page;
/// The normalized in-memory topology model.
pub mod model;
/// Per-variant wire-format normalizers.
pub mod normalize;
/// Process-wide adapter cache and sorted drive index.
pub mod registry;
/// Lazy physical-drive resolution.
pub mod resolver;
