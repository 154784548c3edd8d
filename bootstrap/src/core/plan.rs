//! Pure build-plan construction: stage list and per-stage command lists.
//!
//! Planning is deterministic. No filesystem or environment access happens
//! here; the plan is data handed to a command runner for execution.

use crate::core::descriptor::{EnvironmentDescriptor, IdentityRecord, LayoutSpec, ServiceSpec};
use crate::core::types::{CommandSpec, PlannedStage, StageId};

/// Build the full build-phase plan in canonical stage order.
pub fn build_plan(
    env: &EnvironmentDescriptor,
    identity: &IdentityRecord,
    layout: &LayoutSpec,
) -> Vec<PlannedStage> {
    vec![
        PlannedStage {
            id: StageId::Provision,
            commands: provision_commands(env),
        },
        PlannedStage {
            id: StageId::Identity,
            commands: identity_commands(identity),
        },
        PlannedStage {
            id: StageId::ServerDeps,
            commands: server_deps_commands(identity, layout),
        },
        PlannedStage {
            id: StageId::ClientDeps,
            commands: client_deps_commands(identity, layout),
        },
        PlannedStage {
            id: StageId::ClientBuild,
            commands: client_build_commands(identity, layout),
        },
    ]
}

/// OS packages, pinned Node.js major, then package-index cleanup so the
/// resulting layer carries no transient cache state.
fn provision_commands(env: &EnvironmentDescriptor) -> Vec<CommandSpec> {
    vec![
        apt(CommandSpec::new("apt-get").arg("update")),
        apt(CommandSpec::new("apt-get")
            .args(["install", "-y", "--no-install-recommends"])
            .args(env.packages.iter().cloned())),
        apt(CommandSpec::new("sh").arg("-c").arg(format!(
            "curl -fsSL https://deb.nodesource.com/setup_{}.x | bash -",
            env.node_major
        ))),
        apt(CommandSpec::new("apt-get").args(["install", "-y", "nodejs"])),
        apt(CommandSpec::new("apt-get").arg("clean")),
        apt(CommandSpec::new("sh")
            .arg("-c")
            .arg("rm -rf /var/lib/apt/lists/*")),
    ]
}

fn apt(spec: CommandSpec) -> CommandSpec {
    spec.env("DEBIAN_FRONTEND", "noninteractive")
}

/// Create the non-root identity and hand it its home tree.
///
/// `useradd` fails when the uid is already taken; that failure is fatal and
/// surfaces as an identity-stage error, never a silent reuse.
fn identity_commands(identity: &IdentityRecord) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("useradd")
            .args(["-m", "-u"])
            .arg(identity.uid.to_string())
            .arg(identity.user.as_str()),
        CommandSpec::new("chown")
            .arg("-R")
            .arg(format!("{0}:{0}", identity.user))
            .arg(identity.home.display().to_string()),
    ]
}

/// Server manifest install, no cache, into the identity's own tree.
fn server_deps_commands(identity: &IdentityRecord, layout: &LayoutSpec) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("pip3")
            .args(["install", "--no-cache-dir", "--user", "-r"])
            .arg(layout.server_manifest.display().to_string())
            .run_as(identity.user.as_str()),
    ]
}

/// Client manifest install, lockfile-faithful so a stale local cache can
/// never mask a manifest change.
fn client_deps_commands(identity: &IdentityRecord, layout: &LayoutSpec) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("npm")
            .args(["ci", "--no-audit", "--no-fund"])
            .cwd(&layout.client_dir)
            .run_as(identity.user.as_str()),
    ]
}

/// Single non-interactive bundle invocation producing the artifact set.
fn client_build_commands(identity: &IdentityRecord, layout: &LayoutSpec) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("npm")
            .args(["run", "build"])
            .cwd(&layout.client_dir)
            .run_as(identity.user.as_str()),
    ]
}

/// Assemble the service launch command with the resolved port appended.
///
/// The port always travels as an explicit argument so the bound port is
/// visible in the process list, not implied by environment.
pub fn launch_command(service: &ServiceSpec, identity: &IdentityRecord, port: u16) -> CommandSpec {
    let mut spec = CommandSpec::new(service.command[0].as_str());
    spec = spec.args(service.command[1..].iter().cloned());
    spec.args(["--port".to_string(), port.to_string()])
        .run_as(identity.user.as_str())
}
