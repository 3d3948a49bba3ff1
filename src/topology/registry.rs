// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Process-wide adapter cache and the sorted drive index.
//!
//! Each adapter's configuration is built on first request and kept for the
//! life of the registry; repeated requests never touch the transport again.
//! The drive index orders every present drive by (adapter, address) so
//! reports walk drives in a stable order regardless of probe order.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::{
    ioctl::transport::MegaTransport,
    topology::{
        model::{AdapterConfig, DriveAddr, PdIx},
        normalize, resolver,
    },
};

/// One entry of the sorted drive index. Field order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdKey {
    pub adapter: u8,
    pub addr: DriveAddr,
    pub pd: PdIx,
}

#[derive(Default)]
pub struct AdapterRegistry {
    configs: BTreeMap<u8, AdapterConfig>,
    physical_list: Vec<PdKey>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds, or returns the cached, configuration for one adapter. SAS
    /// adapters resolve every listed device eagerly right after the build;
    /// legacy drives are probed on demand.
    pub fn adapter_config<T: MegaTransport>(
        &mut self,
        t: &mut T,
        adapter: u8,
        sas: bool,
    ) -> Result<&AdapterConfig> {
        if !self.configs.contains_key(&adapter) {
            let cfg = if sas {
                normalize::build_v5(t, adapter)?
            } else {
                normalize::build_legacy(t, adapter)?
            };
            self.configs.insert(adapter, cfg);
            if sas {
                self.resolve_all(t, adapter);
            }
        }
        Ok(&self.configs[&adapter])
    }

    /// Probes every bound slot of one adapter. Per-drive failures are
    /// recorded on the slots, not returned.
    fn resolve_all<T: MegaTransport>(&mut self, t: &mut T, adapter: u8) {
        let Self {
            configs,
            physical_list,
        } = self;
        if let Some(cfg) = configs.get_mut(&adapter) {
            let addrs: Vec<DriveAddr> = cfg
                .physicals
                .iter()
                .filter(|pd| pd.bound)
                .map(|pd| pd.addr)
                .collect();
            for addr in addrs {
                resolver::physical_drive_info(t, cfg, physical_list, addr, true);
            }
        }
    }

    /// Resolves one drive address, building the adapter configuration first
    /// if needed. `Ok(None)` means no present disk at that address.
    ///
    /// With `fetch` false nothing is built, claimed, or probed: the answer
    /// comes purely from slots already resolved present.
    pub fn physical_drive_info<T: MegaTransport>(
        &mut self,
        t: &mut T,
        adapter: u8,
        sas: bool,
        addr: DriveAddr,
        fetch: bool,
    ) -> Result<Option<PdIx>> {
        if fetch {
            self.adapter_config(t, adapter, sas)?;
        }
        let Self {
            configs,
            physical_list,
        } = self;
        match configs.get_mut(&adapter) {
            Some(cfg) => {
                Ok(resolver::physical_drive_info(t, cfg, physical_list, addr, fetch))
            },
            None => Ok(None),
        }
    }

    pub fn config(&self, adapter: u8) -> Option<&AdapterConfig> {
        self.configs.get(&adapter)
    }

    pub fn config_mut(&mut self, adapter: u8) -> Option<&mut AdapterConfig> {
        self.configs.get_mut(&adapter)
    }

    /// Every present drive, sorted by (adapter, address).
    pub fn physical_list(&self) -> &[PdKey] {
        &self.physical_list
    }
}
