//! Shared deterministic types for bootstrap core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Named pipeline stage, in canonical execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// OS packages plus the pinned Node.js major.
    Provision,
    /// Non-root identity creation; everything after runs under it.
    Identity,
    /// Server dependency manifest install.
    ServerDeps,
    /// Client dependency manifest install.
    ClientDeps,
    /// Client bundle producing the build artifact set.
    ClientBuild,
    /// Server process start (run phase, never part of the build plan).
    Launch,
}

impl StageId {
    /// Build-phase stages in the only order they may execute.
    pub const BUILD_ORDER: [StageId; 5] = [
        StageId::Provision,
        StageId::Identity,
        StageId::ServerDeps,
        StageId::ClientDeps,
        StageId::ClientBuild,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageId::Provision => "provision",
            StageId::Identity => "identity",
            StageId::ServerDeps => "server-deps",
            StageId::ClientDeps => "client-deps",
            StageId::ClientBuild => "client-build",
            StageId::Launch => "launch",
        }
    }

    /// Failure classification for errors raised while this stage runs.
    pub fn failure_class(self) -> FailureClass {
        match self {
            StageId::Provision => FailureClass::Provisioning,
            StageId::Identity => FailureClass::Identity,
            StageId::ServerDeps | StageId::ClientDeps => FailureClass::DependencyResolution,
            StageId::ClientBuild => FailureClass::Build,
            StageId::Launch => FailureClass::Launch,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error taxonomy for the fail-fast pipeline. Every class is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Provisioning,
    Identity,
    DependencyResolution,
    Build,
    Launch,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureClass::Provisioning => "provisioning",
            FailureClass::Identity => "identity",
            FailureClass::DependencyResolution => "dependency-resolution",
            FailureClass::Build => "build",
            FailureClass::Launch => "launch",
        };
        f.write_str(name)
    }
}

/// A single planned external command.
///
/// Specs are pure data: planning never touches the filesystem or environment,
/// so the same inputs always produce the same spec list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Environment entries set on the child (in addition to the inherited env).
    pub env: Vec<(String, String)>,
    /// Working directory relative to the checkout root, if not the root itself.
    pub cwd: Option<PathBuf>,
    /// Identity to execute as. `None` only before the de-escalation stage.
    pub run_as: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            run_as: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    /// Single-line rendering for logs and failure messages.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One stage of the build plan with its ordered command list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStage {
    pub id: StageId,
    pub commands: Vec<CommandSpec>,
}

/// Record of a stage that completed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub id: StageId,
    pub commands_run: usize,
}

/// Fatal stage failure. The pipeline halts on the first one.
///
/// Carried through `anyhow` and downcast at the CLI boundary to select the
/// process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: StageId,
    pub class: FailureClass,
    pub detail: String,
}

impl StageFailure {
    pub fn new(stage: StageId, detail: impl Into<String>) -> Self {
        Self {
            stage,
            class: stage.failure_class(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage '{}' failed: {}", self.stage, self.detail)
    }
}

impl std::error::Error for StageFailure {}
