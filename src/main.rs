//! lfs-audit: a pre-commit / CI check for git-lfs hygiene.
//!
//! Two things fail the check:
//! - a file the `lfs` filter tracks whose committed blob is not a valid
//!   LFS pointer (someone committed the real bytes), and
//! - with `--size-limit`, a file at or above the limit that the `lfs`
//!   filter does not track at all.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use lfs_audit::core::config::{AuditConfig, ConfigOverrides};
use lfs_audit::core::error::AuditError;
use lfs_audit::utils;

#[derive(Parser)]
#[command(name = "lfs-audit", version)]
#[command(about = "Check that large files are tracked by git-lfs and LFS pointers are valid")]
struct Cli {
    /// If a positive value is given, check whether all the files bigger than
    /// the given value are tracked by git-lfs (examples: '10kb', '1MB').
    /// Defaults to 0, which disables the check.
    #[arg(long, value_name = "SIZE")]
    size_limit: Option<String>,

    /// git executable to run
    #[arg(long, value_name = "PATH")]
    git_program: Option<PathBuf>,

    /// git-lfs executable used for pointer checks
    #[arg(long, value_name = "PATH")]
    lfs_program: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// git working directory (defaults to the current directory)
    working_dir: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<bool> {
    let working_dir = match cli.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let overrides = ConfigOverrides {
        size_limit: cli.size_limit,
        git_program: cli.git_program,
        lfs_program: cli.lfs_program,
    };

    let config = AuditConfig::resolve(working_dir, overrides)?;
    let summary = utils::run_audit(&config)?;
    Ok(summary.passed())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            let configuration = e
                .downcast_ref::<AuditError>()
                .is_some_and(AuditError::is_configuration);
            if configuration {
                eprintln!("configuration error: {e:#}");
            } else {
                eprintln!("{e:#}");
            }
            ExitCode::from(1)
        }
    }
}
