//! Service launch: spawn the server process and mirror its exit code.
//!
//! The launcher performs no supervision. `{Not Started} → {Running} →
//! {Stopped}`; restart-on-crash belongs to whatever starts the container.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::types::{CommandSpec, StageFailure, StageId};
use crate::io::runner::effective_invocation;

/// A child that exits within this window is treated as a failed launch, not a
/// service lifecycle.
pub const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// Spawn the service and block until it exits.
///
/// stdout/stderr are inherited: the service's output is the container's
/// output. Returns the child's exit code; an immediate non-zero exit or a
/// spawn failure is a [`StageFailure`] in the launch class.
#[instrument(skip_all, fields(command = %spec, port))]
pub fn launch_service(spec: &CommandSpec, checkout: &Path, port: u16, uid: u32) -> Result<i32> {
    let (program, args) = effective_invocation(spec, uid);
    let mut cmd = Command::new(&program);
    cmd.args(args)
        .current_dir(checkout)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    info!(port, "starting service");
    let mut child = cmd
        .spawn()
        .map_err(|e| StageFailure::new(StageId::Launch, format!("spawn '{program}': {e}")))?;

    match child
        .wait_timeout(STARTUP_GRACE)
        .context("wait for service startup")?
    {
        Some(status) if !status.success() => {
            warn!(exit_code = ?status.code(), "service exited during startup");
            Err(StageFailure::new(
                StageId::Launch,
                format!(
                    "service exited during startup with status {:?}",
                    status.code()
                ),
            )
            .into())
        }
        Some(status) => {
            // Clean immediate exit: unusual for a server, but not a launch failure.
            info!(exit_code = ?status.code(), "service exited cleanly");
            Ok(status.code().unwrap_or(0))
        }
        None => {
            info!(port, "service running");
            let status = child.wait().context("wait for service")?;
            info!(exit_code = ?status.code(), "service stopped");
            Ok(status.code().unwrap_or(1))
        }
    }
}
