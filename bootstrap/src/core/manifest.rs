//! Dependency manifest parsing and validation.
//!
//! Two manifests feed the installer: a `requirements.txt`-style server
//! manifest and a `package.json` client manifest. Both are validated up front
//! so a malformed manifest fails the checkout check, not a package manager
//! five stages in.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const CLIENT_MANIFEST_SCHEMA: &str = include_str!("../schemas/client_manifest.schema.json");

/// One declared server dependency: name plus optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub constraint: Option<String>,
}

/// Line grammar: package name, optional extras, optional version spec.
/// Comments (`# ...`) and blank lines are ignored.
fn requirement_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?P<name>[A-Za-z0-9][A-Za-z0-9._-]*)
            (?:\[[A-Za-z0-9,._-]+\])?
            \s*
            (?P<constraint>(?:==|>=|<=|~=|!=|>|<)\s*[^\s;]+(?:\s*,\s*(?:==|>=|<=|~=|!=|>|<)\s*[^\s;]+)*)?
            \s*$",
        )
        .expect("requirement regex compiles")
    })
}

/// Parse a server manifest. Malformed lines are fatal, reported with their
/// line number.
pub fn parse_requirements(contents: &str) -> Result<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let captures = requirement_line()
            .captures(line)
            .ok_or_else(|| anyhow!("line {}: unparseable requirement '{raw}'", idx + 1))?;
        requirements.push(Requirement {
            name: captures["name"].to_string(),
            constraint: captures
                .name("constraint")
                .map(|m| m.as_str().trim().to_string()),
        });
    }
    if requirements.is_empty() {
        bail!("server manifest declares no packages");
    }
    Ok(requirements)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parsed client manifest. Only the fields the bootstrap cares about are
/// typed; the schema check runs on the raw JSON first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// Parse and schema-validate a client `package.json`.
///
/// The manifest must carry a `name` and a `scripts.build` entry; the build
/// stage is undefined without one.
pub fn parse_client_manifest(contents: &str) -> Result<ClientManifest> {
    let instance: Value = serde_json::from_str(contents).context("parse client manifest json")?;
    let schema: Value =
        serde_json::from_str(CLIENT_MANIFEST_SCHEMA).context("parse client manifest schema")?;
    validate_schema(&instance, &schema)?;
    let manifest: ClientManifest =
        serde_json::from_value(instance).context("parse client manifest fields")?;
    Ok(manifest)
}

/// Validate JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile client manifest schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!(
            "client manifest validation failed:\n- {}",
            messages.join("\n- ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_constraints() {
        let manifest = "\
# server deps
fastapi==0.110.0
uvicorn[standard]>=0.27
websockets
";
        let reqs = parse_requirements(manifest).expect("parse");
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].name, "fastapi");
        assert_eq!(reqs[0].constraint.as_deref(), Some("==0.110.0"));
        assert_eq!(reqs[1].name, "uvicorn");
        assert_eq!(reqs[1].constraint.as_deref(), Some(">=0.27"));
        assert_eq!(reqs[2].constraint, None);
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let reqs = parse_requirements("requests>=2.31 # http client\n").expect("parse");
        assert_eq!(reqs[0].name, "requests");
        assert_eq!(reqs[0].constraint.as_deref(), Some(">=2.31"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = parse_requirements("fastapi\n===broken\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = parse_requirements("# nothing here\n\n").unwrap_err();
        assert!(err.to_string().contains("no packages"));
    }

    #[test]
    fn client_manifest_requires_build_script() {
        let json = r#"{"name": "client", "scripts": {"dev": "vite"}}"#;
        let err = parse_client_manifest(json).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn client_manifest_round_trips() {
        let json = r#"{
            "name": "client",
            "version": "0.1.0",
            "scripts": {"build": "vite build", "dev": "vite"},
            "dependencies": {"react": "^18.2.0"}
        }"#;
        let manifest = parse_client_manifest(json).expect("parse");
        assert_eq!(manifest.name, "client");
        assert_eq!(manifest.scripts["build"], "vite build");
        assert_eq!(manifest.dependencies["react"], "^18.2.0");
    }
}
