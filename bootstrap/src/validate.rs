//! Validation of a checkout's filesystem contract.
//!
//! `bootstrap validate` runs nothing; it checks that everything the pipeline
//! will consume is present and well-formed, so a broken checkout fails here
//! instead of five stages into a build.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::core::manifest::{ClientManifest, Requirement, parse_client_manifest, parse_requirements};
use crate::io::config::BootstrapConfig;
use crate::io::layout::CheckoutPaths;

/// What a successful validation established about the checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub server_requirements: Vec<Requirement>,
    pub client_manifest: ClientManifest,
    /// True when the artifact set already exists (a prior build's output).
    pub artifacts_present: bool,
}

/// Validate layout and both dependency manifests against the loaded config.
pub fn validate_checkout(root: &Path, cfg: &BootstrapConfig) -> Result<ValidateOutcome> {
    let paths = CheckoutPaths::new(root, &cfg.layout);

    ensure_file(&paths.server_manifest)?;
    ensure_dir(&paths.client_dir)?;
    ensure_file(&paths.client_manifest)?;

    let server_raw = fs::read_to_string(&paths.server_manifest)
        .with_context(|| format!("read {}", paths.server_manifest.display()))?;
    let server_requirements = parse_requirements(&server_raw)
        .with_context(|| format!("parse {}", paths.server_manifest.display()))?;

    let client_raw = fs::read_to_string(&paths.client_manifest)
        .with_context(|| format!("read {}", paths.client_manifest.display()))?;
    let client_manifest = parse_client_manifest(&client_raw)
        .with_context(|| format!("parse {}", paths.client_manifest.display()))?;

    let artifacts_present = paths.artifact_dir.is_dir()
        && paths
            .artifact_dir
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);

    Ok(ValidateOutcome {
        server_requirements,
        client_manifest,
        artifacts_present,
    })
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing directory {}", path.display()));
    }
    if !path.is_dir() {
        return Err(anyhow!("expected directory {}", path.display()));
    }
    Ok(())
}

fn ensure_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("missing file {}", path.display()));
    }
    if !path.is_file() {
        return Err(anyhow!("expected file {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scaffold_checkout, write_artifacts};

    #[test]
    fn valid_checkout_passes() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");

        let outcome =
            validate_checkout(temp.path(), &BootstrapConfig::default()).expect("validate");
        assert!(!outcome.server_requirements.is_empty());
        assert_eq!(outcome.client_manifest.name, "client");
        assert!(!outcome.artifacts_present);
    }

    #[test]
    fn artifacts_are_reported_when_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        write_artifacts(temp.path()).expect("artifacts");

        let outcome =
            validate_checkout(temp.path(), &BootstrapConfig::default()).expect("validate");
        assert!(outcome.artifacts_present);
    }

    #[test]
    fn missing_server_manifest_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        fs::remove_file(temp.path().join("server/requirements.txt")).expect("remove");

        let err = validate_checkout(temp.path(), &BootstrapConfig::default()).unwrap_err();
        assert!(err.to_string().contains("missing file"));
    }

    #[test]
    fn client_manifest_without_build_script_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        fs::write(
            temp.path().join("client/package.json"),
            r#"{"name": "client", "scripts": {"dev": "vite"}}"#,
        )
        .expect("write");

        let err = validate_checkout(temp.path(), &BootstrapConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("validation failed"));
    }
}
