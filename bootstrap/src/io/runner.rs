//! Command runner abstraction for stage execution.
//!
//! The [`CommandRunner`] trait decouples pipeline orchestration from real
//! process spawning. Tests use scripted runners that record the commands they
//! were handed and return predetermined results without touching the system.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{CommandSpec, StageId};
use crate::io::process::{CommandOutput, run_command_with_timeout};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// Parameters for one command invocation within a stage.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub stage: StageId,
    /// Checkout root; command `cwd` fields resolve relative to it.
    pub checkout: PathBuf,
    /// Per-stage log file receiving stdout/stderr of every command.
    pub log_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Result of one command: the child ran to completion and this is how it went.
/// Spawn errors and I/O failures surface as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Abstraction over command execution backends.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec, request: &RunRequest) -> Result<RunOutcome>;
}

/// Runner that spawns real processes on the host.
pub struct SystemRunner {
    /// Effective uid of this process; decides whether `run_as` needs wrapping.
    uid: u32,
}

impl SystemRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            uid: current_uid()?,
        })
    }

    fn build_command(&self, spec: &CommandSpec, request: &RunRequest) -> Command {
        let (program, args) = effective_invocation(spec, self.uid);
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        match &spec.cwd {
            Some(dir) => cmd.current_dir(request.checkout.join(dir)),
            None => cmd.current_dir(&request.checkout),
        };
        cmd
    }
}

/// Program + argv after applying `run_as` wrapping for the given effective uid.
///
/// runuser requires root; an unprivileged process is already de-escalated.
pub fn effective_invocation(spec: &CommandSpec, uid: u32) -> (String, Vec<String>) {
    match &spec.run_as {
        Some(user) if uid == 0 => {
            let mut args = vec![
                "-u".to_string(),
                user.clone(),
                "--".to_string(),
                spec.program.clone(),
            ];
            args.extend(spec.args.iter().cloned());
            ("runuser".to_string(), args)
        }
        _ => (spec.program.clone(), spec.args.clone()),
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(stage = %request.stage, command = %spec))]
    fn run(&self, spec: &CommandSpec, request: &RunRequest) -> Result<RunOutcome> {
        info!("running stage command");
        let cmd = self.build_command(spec, request);
        let output = run_command_with_timeout(cmd, None, request.timeout, request.output_limit_bytes)
            .with_context(|| format!("run '{spec}'"))?;

        append_stage_log(&request.log_path, spec, &output, request.output_limit_bytes)?;

        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "command timed out");
        } else if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "command failed");
        } else {
            debug!("command succeeded");
        }

        Ok(RunOutcome {
            success: output.status.success() && !output.timed_out,
            exit_code: output.status.code(),
            timed_out: output.timed_out,
        })
    }
}

/// Effective uid, via `id -u`. Shelling out keeps the crate free of platform
/// bindings it needs for nothing else.
pub fn current_uid() -> Result<u32> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .context("run id -u")?;
    if !output.status.success() {
        return Err(anyhow!("id -u failed with status {:?}", output.status.code()));
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .context("parse id -u output")
}

/// Append one command's captured output to the stage log.
fn append_stage_log(
    path: &Path,
    spec: &CommandSpec,
    output: &CommandOutput,
    output_limit: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create stage log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str(&format!("=== command ===\n{spec}\n"));
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stdout));
    buf.push_str(&output.stdout_truncated_notice("stage"));
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stderr));
    buf.push_str(&output.stderr_truncated_notice("stage"));
    if output.timed_out {
        buf.push_str("\n[stage command timed out]\n");
    }
    buf.push('\n');

    if buf.len() > output_limit {
        buf = format!(
            "{}\n[truncated {} bytes]\n",
            &buf[..output_limit],
            buf.len() - output_limit
        );
    }

    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open stage log {}", path.display()))?;
    file.write_all(buf.as_bytes())
        .with_context(|| format!("write stage log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(root: &Path) -> RunRequest {
        RunRequest {
            stage: StageId::Provision,
            checkout: root.to_path_buf(),
            log_path: root.join("logs").join("provision.log"),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn unprivileged_runner_does_not_wrap_run_as() {
        let runner = SystemRunner { uid: 1000 };
        let spec = CommandSpec::new("echo").arg("hello").run_as("user");
        let temp = tempfile::tempdir().expect("tempdir");
        let cmd = runner.build_command(&spec, &request(temp.path()));
        assert_eq!(cmd.get_program(), "echo");
    }

    #[test]
    fn root_runner_wraps_run_as_with_runuser() {
        let runner = SystemRunner { uid: 0 };
        let spec = CommandSpec::new("npm").arg("ci").run_as("user");
        let temp = tempfile::tempdir().expect("tempdir");
        let cmd = runner.build_command(&spec, &request(temp.path()));
        assert_eq!(cmd.get_program(), "runuser");
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["-u", "user", "--", "npm", "ci"]);
    }

    #[test]
    fn run_writes_stage_log_and_reports_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = SystemRunner { uid: 1000 };
        let request = request(temp.path());
        let spec = CommandSpec::new("sh").args(["-c", "echo doomed; exit 3"]);

        let outcome = runner.run(&spec, &request).expect("run");
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));

        let log = fs::read_to_string(&request.log_path).expect("read log");
        assert!(log.contains("=== command ==="));
        assert!(log.contains("doomed"));
    }

    #[test]
    fn log_appends_across_commands() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = SystemRunner { uid: 1000 };
        let request = request(temp.path());

        runner
            .run(&CommandSpec::new("echo").arg("first"), &request)
            .expect("run first");
        runner
            .run(&CommandSpec::new("echo").arg("second"), &request)
            .expect("run second");

        let log = fs::read_to_string(&request.log_path).expect("read log");
        assert!(log.contains("first"));
        assert!(log.contains("second"));
    }
}
