// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-drive SCSI log-page cache.
//!
//! Pages are fetched on demand and cached on the drive slot for the rest of
//! the run, most recent fetch first. The supported-pages page gates every
//! other request: a page the device does not advertise is never asked for.
//! Fetch failures are soft; nothing is cached and a later request tries
//! again.

use tracing::debug;

use crate::{
    control_block::log_sense::{LogPage, PAGE_SUPPORTED, fill_log_sense, parse_log_page},
    ioctl::transport::MegaTransport,
    topology::model::{AdapterConfig, PdIx},
};

const LOG_PAGE_ALLOC: u16 = 512;

/// Returns one log page for a resolved drive, fetching and caching it on
/// first request. `None` means the page is not advertised by the device or
/// the fetch failed this time.
pub fn drive_log_page<'a, T: MegaTransport>(
    t: &mut T,
    cfg: &'a mut AdapterConfig,
    ix: PdIx,
    page: u8,
) -> Option<&'a LogPage> {
    if let Some(pos) = cfg.physicals[ix.0]
        .log_pages
        .iter()
        .position(|p| p.code == page)
    {
        return Some(&cfg.physicals[ix.0].log_pages[pos]);
    }

    if page != PAGE_SUPPORTED {
        let cached = cfg.physicals[ix.0]
            .log_pages
            .iter()
            .any(|p| p.code == PAGE_SUPPORTED);
        if !cached {
            let page0 = fetch_page(t, cfg, ix, PAGE_SUPPORTED)?;
            cfg.physicals[ix.0].log_pages.insert(0, page0);
        }
        let advertised = cfg.physicals[ix.0]
            .log_pages
            .iter()
            .find(|p| p.code == PAGE_SUPPORTED)
            .is_some_and(|p| p.supports(page));
        if !advertised {
            return None;
        }
    }

    let fetched = fetch_page(t, cfg, ix, page)?;
    let pages = &mut cfg.physicals[ix.0].log_pages;
    pages.insert(0, fetched);
    pages.first()
}

fn fetch_page<T: MegaTransport>(
    t: &mut T,
    cfg: &AdapterConfig,
    ix: PdIx,
    page: u8,
) -> Option<LogPage> {
    let pd = &cfg.physicals[ix.0];
    let mut cdb = [0u8; 16];
    fill_log_sense(&mut cdb, page, LOG_PAGE_ALLOC);
    let mut buf = vec![0u8; LOG_PAGE_ALLOC as usize];

    let res = if cfg.variant.is_sas() {
        t.sas_passthrough(cfg.adapter, pd.device_id, &cdb[..10], &mut buf)
    } else {
        t.passthrough(cfg.adapter, pd.addr.channel, pd.addr.id, &cdb[..10], &mut buf)
    };
    let n = match res {
        Ok(n) => n,
        Err(e) => {
            debug!(
                adapter = cfg.adapter,
                addr = %pd.addr,
                page,
                error = %e,
                "log page fetch failed"
            );
            return None;
        }
    };

    match parse_log_page(&buf[..n]) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(
                adapter = cfg.adapter,
                addr = %pd.addr,
                page,
                error = %e,
                "log page parse failed"
            );
            None
        }
    }
}
