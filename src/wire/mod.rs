// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fixed-layout vendor wire structures exchanged over the adapter ioctl
//! boundary. Every struct here mirrors a firmware-defined packed binary
//! layout; all multi-byte fields are little-endian and byte-aligned, so the
//! structs can be cast directly from raw reply buffers with zerocopy.

/// SAS DCMD frame header and opcode constants.
pub mod dcmd;
/// Legacy (v2/v34) disk-array configuration blob.
pub mod legacy;
/// Legacy mailbox command and framing constants.
pub mod mbox;
/// Legacy product-info and adapter-enquiry replies.
pub mod product;
/// SAS controller-info, device-list, and RAID-configuration replies.
pub mod sas;
