//! Build-time configuration records: environment, identity, service, layout.
//!
//! These are the immutable inputs to planning. They deserialize from
//! `bootstrap.toml` sections and carry defaults matching a stock checkout, so
//! a config file is only needed to deviate from them.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default port the service binds when nothing overrides it.
pub const DEFAULT_PORT: u16 = 7860;

/// OS-level runtime description: package set plus the pinned Node.js major.
///
/// Fixed at build time; planning the same descriptor twice yields the same
/// command list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvironmentDescriptor {
    pub packages: Vec<String>,
    pub node_major: u32,
}

impl Default for EnvironmentDescriptor {
    fn default() -> Self {
        Self {
            packages: vec![
                "python3".to_string(),
                "python3-pip".to_string(),
                "curl".to_string(),
                "ffmpeg".to_string(),
            ],
            node_major: 20,
        }
    }
}

impl EnvironmentDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.packages.is_empty() {
            return Err(anyhow!("provision.packages must be non-empty"));
        }
        if let Some(bad) = self.packages.iter().find(|p| p.trim().is_empty()) {
            return Err(anyhow!("provision.packages contains blank entry '{bad}'"));
        }
        if self.node_major == 0 {
            return Err(anyhow!("provision.node_major must be > 0"));
        }
        Ok(())
    }
}

/// The non-privileged execution identity. Created once by the de-escalation
/// stage; every later stage runs under it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityRecord {
    pub user: String,
    pub uid: u32,
    pub home: PathBuf,
}

impl Default for IdentityRecord {
    fn default() -> Self {
        Self {
            user: "user".to_string(),
            uid: 1000,
            home: PathBuf::from("/home/user"),
        }
    }
}

impl IdentityRecord {
    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(anyhow!("identity.user must be non-empty"));
        }
        if self.uid == 0 {
            return Err(anyhow!("identity.uid must not be 0 (root)"));
        }
        if self.home.as_os_str().is_empty() {
            return Err(anyhow!("identity.home must be non-empty"));
        }
        Ok(())
    }
}

/// Long-running server process description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceSpec {
    /// Program and leading arguments; the resolved port is appended as
    /// `--port <n>` at launch time.
    pub command: Vec<String>,
    pub port: u16,
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), "server/server.py".to_string()],
            port: DEFAULT_PORT,
        }
    }
}

impl ServiceSpec {
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("service.command must be a non-empty array"));
        }
        if self.port == 0 {
            return Err(anyhow!("service.port must be > 0"));
        }
        Ok(())
    }
}

/// Filesystem contract with the checkout: where manifests, sources, and build
/// output live, relative to the checkout root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutSpec {
    pub server_manifest: PathBuf,
    pub client_dir: PathBuf,
    pub client_manifest: PathBuf,
    pub artifact_dir: PathBuf,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            server_manifest: PathBuf::from("server/requirements.txt"),
            client_dir: PathBuf::from("client"),
            client_manifest: PathBuf::from("client/package.json"),
            artifact_dir: PathBuf::from("client/dist"),
        }
    }
}

impl LayoutSpec {
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("layout.server_manifest", &self.server_manifest),
            ("layout.client_dir", &self.client_dir),
            ("layout.client_manifest", &self.client_manifest),
            ("layout.artifact_dir", &self.artifact_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("{name} must be non-empty"));
            }
            if path.is_absolute() {
                return Err(anyhow!("{name} must be relative to the checkout root"));
            }
        }
        Ok(())
    }
}

/// Resolve the service port: explicit override wins over the configured value.
///
/// The override is the raw `FAST_API_PORT` string; junk values are rejected
/// rather than silently falling back.
pub fn resolve_port(override_value: Option<&str>, configured: u16) -> Result<u16> {
    match override_value {
        None => Ok(configured),
        Some(raw) => {
            let port: u16 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid FAST_API_PORT '{raw}'"))?;
            if port == 0 {
                return Err(anyhow!("FAST_API_PORT must be > 0"));
            }
            Ok(port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EnvironmentDescriptor::default().validate().expect("env");
        IdentityRecord::default().validate().expect("identity");
        ServiceSpec::default().validate().expect("service");
        LayoutSpec::default().validate().expect("layout");
    }

    #[test]
    fn root_uid_is_rejected() {
        let identity = IdentityRecord {
            uid: 0,
            ..IdentityRecord::default()
        };
        let err = identity.validate().unwrap_err();
        assert!(err.to_string().contains("must not be 0"));
    }

    #[test]
    fn absolute_layout_path_is_rejected() {
        let layout = LayoutSpec {
            artifact_dir: PathBuf::from("/srv/dist"),
            ..LayoutSpec::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("artifact_dir"));
    }

    #[test]
    fn port_defaults_without_override() {
        assert_eq!(resolve_port(None, DEFAULT_PORT).expect("port"), 7860);
    }

    #[test]
    fn port_override_wins() {
        assert_eq!(resolve_port(Some("9000"), DEFAULT_PORT).expect("port"), 9000);
    }

    #[test]
    fn junk_port_override_is_rejected() {
        assert!(resolve_port(Some("not-a-port"), DEFAULT_PORT).is_err());
        assert!(resolve_port(Some("0"), DEFAULT_PORT).is_err());
    }
}
