//! This crate provides topology discovery and diagnostics for MegaRAID
//! host-bus adapters.
// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Handles configuration, command-line parsing, and logging.
pub mod cfg;
/// Implements various SCSI commands (control blocks).
pub mod control_block;
/// The vendor ioctl transport boundary (real device and mock).
pub mod ioctl;
/// Renders adapter reports and the health-check scan.
pub mod report;
/// Normalized adapter topology: model, normalizer, registry, caches.
pub mod topology;
/// Provides utility functions used throughout the crate.
pub mod utils;
/// Defines the fixed-layout vendor wire structures.
pub mod wire;
