//! Bootstrap configuration stored at the checkout root as `bootstrap.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::descriptor::{EnvironmentDescriptor, IdentityRecord, LayoutSpec, ServiceSpec};
use crate::io::runner::{DEFAULT_OUTPUT_LIMIT_BYTES, DEFAULT_STAGE_TIMEOUT};

/// Bootstrap configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the stock checkout layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapConfig {
    pub provision: EnvironmentDescriptor,
    pub identity: IdentityRecord,
    pub service: ServiceSpec,
    pub layout: LayoutSpec,
    pub limits: LimitsConfig,
    /// `USE_PERSISTENT_DATA`, recorded for collaborators. No bootstrap stage
    /// consumes it.
    #[serde(skip)]
    pub persistent_data: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Wall-clock budget per stage command in seconds.
    pub stage_timeout_secs: u64,
    /// Truncate per-stage logs beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT.as_secs(),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        self.provision.validate()?;
        self.identity.validate()?;
        self.service.validate()?;
        self.layout.validate()?;
        if self.limits.stage_timeout_secs == 0 {
            return Err(anyhow!("limits.stage_timeout_secs must be > 0"));
        }
        if self.limits.output_limit_bytes == 0 {
            return Err(anyhow!("limits.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Environment overrides recognized at load time.
///
/// `FAST_API_PORT` is deliberately absent: the port override is resolved at
/// launch time, not baked into the loaded config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub node_major: Option<String>,
    pub persistent_data: Option<String>,
}

impl EnvOverrides {
    pub fn from_process() -> Self {
        Self {
            node_major: std::env::var("NODE_MAJOR").ok(),
            persistent_data: std::env::var("USE_PERSISTENT_DATA").ok(),
        }
    }
}

/// Load config from a TOML file and apply environment overrides.
///
/// If the file is missing, starts from `BootstrapConfig::default()`.
pub fn load_config(path: &Path, env: &EnvOverrides) -> Result<BootstrapConfig> {
    let mut cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        BootstrapConfig::default()
    };
    apply_overrides(&mut cfg, env)?;
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut BootstrapConfig, env: &EnvOverrides) -> Result<()> {
    if let Some(raw) = &env.node_major {
        cfg.provision.node_major = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid NODE_MAJOR '{raw}'"))?;
    }
    if let Some(raw) = &env.persistent_data {
        let value = match raw.trim() {
            "1" | "true" | "True" | "TRUE" => true,
            "0" | "false" | "False" | "FALSE" => false,
            other => return Err(anyhow!("invalid USE_PERSISTENT_DATA '{other}'")),
        };
        debug!(persistent_data = value, "recorded USE_PERSISTENT_DATA");
        cfg.persistent_data = Some(value);
    }
    Ok(())
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BootstrapConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
