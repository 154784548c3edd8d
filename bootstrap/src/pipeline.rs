//! Fail-fast orchestration of the bootstrap pipeline.
//!
//! The build phase is an ordered list of named stages; the orchestrator
//! executes them strictly sequentially and halts on the first failure,
//! reporting which stage failed. There is no retry and no rollback — an
//! aborted build is unusable and a rerun starts from the first stage.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::core::descriptor::resolve_port;
use crate::core::invariants::validate_plan;
use crate::core::plan::{build_plan, launch_command};
use crate::core::types::{CommandSpec, StageFailure, StageId, StageReport};
use crate::io::artifacts::ensure_artifacts;
use crate::io::config::BootstrapConfig;
use crate::io::layout::CheckoutPaths;
use crate::io::runner::{CommandRunner, RunRequest};

/// Result of a completed build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub stages: Vec<StageReport>,
    /// Files found in the artifact directory after the client build.
    pub artifact_files: usize,
}

/// Execute the build phase: Provision → Identity → ServerDeps → ClientDeps →
/// ClientBuild, then verify the artifact set.
pub fn run_build<R: CommandRunner>(
    root: &Path,
    cfg: &BootstrapConfig,
    runner: &R,
) -> Result<BuildReport> {
    let paths = CheckoutPaths::new(root, &cfg.layout);
    let plan = build_plan(&cfg.provision, &cfg.identity, &cfg.layout);

    let violations = validate_plan(&plan);
    if !violations.is_empty() {
        bail!("plan invariant violations:\n- {}", violations.join("\n- "));
    }

    let mut stages = Vec::with_capacity(plan.len());
    for stage in &plan {
        info!(stage = %stage.id, commands = stage.commands.len(), "stage starting");
        let request = RunRequest {
            stage: stage.id,
            checkout: paths.root.clone(),
            log_path: paths.stage_log(stage.id),
            timeout: Duration::from_secs(cfg.limits.stage_timeout_secs),
            output_limit_bytes: cfg.limits.output_limit_bytes,
        };
        for command in &stage.commands {
            let outcome = runner
                .run(command, &request)
                .with_context(|| format!("stage '{}'", stage.id))?;
            if !outcome.success {
                let detail = if outcome.timed_out {
                    format!("'{command}' timed out")
                } else {
                    format!("'{command}' exited with status {:?}", outcome.exit_code)
                };
                return Err(StageFailure::new(stage.id, detail).into());
            }
        }
        info!(stage = %stage.id, "stage complete");
        stages.push(StageReport {
            id: stage.id,
            commands_run: stage.commands.len(),
        });
    }

    // The build is not done until the artifact set the launcher will serve
    // actually exists.
    let artifact_files = ensure_artifacts(&paths.artifact_dir)
        .map_err(|e| StageFailure::new(StageId::ClientBuild, e.to_string()))?;
    debug!(artifact_files, "artifact set verified");

    Ok(BuildReport {
        stages,
        artifact_files,
    })
}

/// Resolve the launch command for a checkout: artifact precondition, port
/// resolution, command assembly. Pure relative to its inputs; spawning is the
/// caller's final step.
pub fn prepare_launch(
    root: &Path,
    cfg: &BootstrapConfig,
    port_override: Option<&str>,
) -> Result<(CommandSpec, u16)> {
    let paths = CheckoutPaths::new(root, &cfg.layout);

    ensure_artifacts(&paths.artifact_dir)
        .map_err(|e| StageFailure::new(StageId::Launch, e.to_string()))?;

    let port = resolve_port(port_override, cfg.service.port)
        .map_err(|e| StageFailure::new(StageId::Launch, e.to_string()))?;

    let spec = launch_command(&cfg.service, &cfg.identity, port);
    if spec.program.trim().is_empty() {
        return Err(anyhow!("service command is empty"));
    }
    Ok((spec, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FailureClass;
    use crate::test_support::{FakeRunner, scaffold_checkout, write_artifacts};

    #[test]
    fn build_report_covers_every_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        write_artifacts(temp.path()).expect("artifacts");
        let runner = FakeRunner::all_pass();

        let report =
            run_build(temp.path(), &BootstrapConfig::default(), &runner).expect("build");
        let ids: Vec<StageId> = report.stages.iter().map(|s| s.id).collect();
        assert_eq!(ids, StageId::BUILD_ORDER.to_vec());
        assert!(report.artifact_files > 0);
    }

    #[test]
    fn missing_artifacts_fail_the_build_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        let runner = FakeRunner::all_pass();

        let err = run_build(temp.path(), &BootstrapConfig::default(), &runner).unwrap_err();
        let failure = err.downcast_ref::<StageFailure>().expect("stage failure");
        assert_eq!(failure.class, FailureClass::Build);
    }

    #[test]
    fn prepare_launch_requires_artifacts() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");

        let err =
            prepare_launch(temp.path(), &BootstrapConfig::default(), None).unwrap_err();
        let failure = err.downcast_ref::<StageFailure>().expect("stage failure");
        assert_eq!(failure.class, FailureClass::Launch);
    }

    #[test]
    fn prepare_launch_resolves_default_port() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        write_artifacts(temp.path()).expect("artifacts");

        let (spec, port) =
            prepare_launch(temp.path(), &BootstrapConfig::default(), None).expect("prepare");
        assert_eq!(port, 7860);
        assert!(spec.render().ends_with("--port 7860"));
    }

    #[test]
    fn prepare_launch_honors_port_override() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold_checkout(temp.path()).expect("scaffold");
        write_artifacts(temp.path()).expect("artifacts");

        let (spec, port) = prepare_launch(temp.path(), &BootstrapConfig::default(), Some("9000"))
            .expect("prepare");
        assert_eq!(port, 9000);
        assert!(spec.render().ends_with("--port 9000"));
    }
}
