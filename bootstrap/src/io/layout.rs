//! Canonical filesystem paths for a checkout.

use std::path::{Path, PathBuf};

use crate::core::descriptor::LayoutSpec;
use crate::core::types::StageId;

/// Absolute paths the bootstrap touches, resolved once from the checkout root
/// and the layout spec.
#[derive(Debug, Clone)]
pub struct CheckoutPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub server_manifest: PathBuf,
    pub client_dir: PathBuf,
    pub client_manifest: PathBuf,
    pub artifact_dir: PathBuf,
    pub bootstrap_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl CheckoutPaths {
    pub fn new(root: impl Into<PathBuf>, layout: &LayoutSpec) -> Self {
        let root = root.into();
        let bootstrap_dir = root.join(".bootstrap");
        Self {
            config_path: root.join("bootstrap.toml"),
            server_manifest: root.join(&layout.server_manifest),
            client_dir: root.join(&layout.client_dir),
            client_manifest: root.join(&layout.client_manifest),
            artifact_dir: root.join(&layout.artifact_dir),
            logs_dir: bootstrap_dir.join("logs"),
            bootstrap_dir,
            root,
        }
    }

    /// Log file for one stage, under `.bootstrap/logs/`.
    pub fn stage_log(&self, stage: StageId) -> PathBuf {
        self.logs_dir.join(format!("{}.log", stage.name()))
    }
}

/// Path to the config file for a checkout root, without resolving a layout.
pub fn config_path(root: &Path) -> PathBuf {
    root.join("bootstrap.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_under_root() {
        let paths = CheckoutPaths::new("/srv/app", &LayoutSpec::default());
        assert_eq!(
            paths.server_manifest,
            PathBuf::from("/srv/app/server/requirements.txt")
        );
        assert_eq!(paths.artifact_dir, PathBuf::from("/srv/app/client/dist"));
        assert_eq!(
            paths.stage_log(StageId::ClientBuild),
            PathBuf::from("/srv/app/.bootstrap/logs/client-build.log")
        );
    }
}
