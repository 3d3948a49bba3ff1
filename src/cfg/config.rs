// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    cfg::enums::RetryPolicy,
    ioctl::device::{COMMAND_TIMEOUT_SECS, LEGACY_NODE, SAS_NODE},
};

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Config {
    /// Driver node locations.
    #[serde(default)]
    pub devices: DeviceConfig,
    /// Runtime parameters that do not map to any wire field.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Driver node locations. The defaults match what the kernel drivers
/// create; a config file only needs these for chroots and test rigs.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_legacy_node", rename = "LegacyNode")]
    /// Legacy (megadev) control node.
    pub legacy_node: String,

    #[serde(default = "default_sas_node", rename = "SasNode")]
    /// SAS (megaraid_sas) control node.
    pub sas_node: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(
        default = "default_command_timeout",
        rename = "CommandTimeout",
        with = "serde_secs"
    )]
    /// Per-command firmware timeout baked into every request.
    pub command_timeout: Duration,

    #[serde(default, rename = "RetryPolicy")]
    /// Command retry behavior; `None` is the only supported value.
    pub retry_policy: RetryPolicy,
}

fn default_legacy_node() -> String {
    LEGACY_NODE.to_string()
}

fn default_sas_node() -> String {
    SAS_NODE.to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(COMMAND_TIMEOUT_SECS as u64)
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            legacy_node: default_legacy_node(),
            sas_node: default_sas_node(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(&path).with_context(|| {
            format!("cannot read config file {}", path.as_ref().display())
        })?;
        let cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates invariants.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.devices.legacy_node.is_empty(),
            "LegacyNode must not be empty"
        );
        ensure!(!self.devices.sas_node.is_empty(), "SasNode must not be empty");

        let secs = self.runtime.command_timeout.as_secs();
        ensure!(
            (1..=60).contains(&secs),
            "CommandTimeout must be between 1 and 60 seconds, got {secs}"
        );
        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
