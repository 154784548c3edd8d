//! Bootstrap orchestrator CLI.
//!
//! Turns a source checkout into a running bound service through an ordered,
//! fail-fast stage pipeline. `build` covers the image-build phase
//! (provision → identity → server deps → client deps → client build);
//! `launch` is the container-start phase and mirrors the service's exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use bootstrap::core::types::StageFailure;
use bootstrap::exit_codes;
use bootstrap::io::config::{EnvOverrides, load_config};
use bootstrap::io::launch::launch_service;
use bootstrap::io::layout;
use bootstrap::io::runner::{SystemRunner, current_uid};
use bootstrap::logging;
use bootstrap::pipeline::{prepare_launch, run_build};
use bootstrap::validate::validate_checkout;

#[derive(Parser)]
#[command(
    name = "bootstrap",
    version,
    about = "Fail-fast bootstrap pipeline: provision, de-escalate, install, build, launch"
)]
struct Cli {
    /// Checkout root to operate on.
    #[arg(long, default_value = ".")]
    checkout: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the ordered build-phase plan without executing anything.
    Plan {
        /// Emit the plan as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check the checkout's filesystem contract and manifests. Runs nothing.
    Validate,
    /// Execute the build phase, halting on the first failed stage.
    Build,
    /// Start the service and exit with its exit code.
    Launch,
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err:#}");
            let code = match err.downcast_ref::<StageFailure>() {
                Some(failure) => exit_codes::for_class(failure.class),
                None => exit_codes::INVALID,
            };
            ExitCode::from(code as u8)
        }
    }
}

fn run() -> Result<u8> {
    let cli = Cli::parse();
    let cfg = load_config(
        &layout::config_path(&cli.checkout),
        &EnvOverrides::from_process(),
    )?;

    match cli.command {
        Command::Plan { json } => {
            let plan = bootstrap::core::plan::build_plan(&cfg.provision, &cfg.identity, &cfg.layout);
            if json {
                let mut payload = serde_json::to_string_pretty(&plan)?;
                payload.push('\n');
                print!("{payload}");
            } else {
                for stage in &plan {
                    println!("[{}]", stage.id);
                    for command in &stage.commands {
                        println!("  {command}");
                    }
                }
            }
            Ok(exit_codes::OK as u8)
        }
        Command::Validate => {
            let outcome = validate_checkout(&cli.checkout, &cfg)?;
            println!(
                "ok: {} server packages, client '{}', artifacts {}",
                outcome.server_requirements.len(),
                outcome.client_manifest.name,
                if outcome.artifacts_present {
                    "present"
                } else {
                    "absent"
                }
            );
            Ok(exit_codes::OK as u8)
        }
        Command::Build => {
            validate_checkout(&cli.checkout, &cfg)?;
            let runner = SystemRunner::new()?;
            let report = run_build(&cli.checkout, &cfg, &runner)?;
            println!(
                "build complete: {} stages, {} artifact files",
                report.stages.len(),
                report.artifact_files
            );
            Ok(exit_codes::OK as u8)
        }
        Command::Launch => {
            let port_override = std::env::var("FAST_API_PORT").ok();
            let (spec, port) =
                prepare_launch(&cli.checkout, &cfg, port_override.as_deref())?;
            let uid = current_uid()?;
            let code = launch_service(&spec, &cli.checkout, port, uid)?;
            Ok(clamp_exit_code(code))
        }
    }
}

/// Map a child exit code onto the u8 range `ExitCode` accepts.
fn clamp_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_build() {
        let cli = Cli::parse_from(["bootstrap", "build"]);
        assert!(matches!(cli.command, Command::Build));
        assert_eq!(cli.checkout, PathBuf::from("."));
    }

    #[test]
    fn parse_plan_json() {
        let cli = Cli::parse_from(["bootstrap", "plan", "--json"]);
        assert!(matches!(cli.command, Command::Plan { json: true }));
    }

    #[test]
    fn parse_checkout_flag() {
        let cli = Cli::parse_from(["bootstrap", "--checkout", "/srv/app", "validate"]);
        assert_eq!(cli.checkout, PathBuf::from("/srv/app"));
    }

    #[test]
    fn exit_codes_fit_in_u8() {
        assert_eq!(clamp_exit_code(0), 0);
        assert_eq!(clamp_exit_code(7), 7);
        assert_eq!(clamp_exit_code(-1), 1);
        assert_eq!(clamp_exit_code(300), 1);
    }
}
