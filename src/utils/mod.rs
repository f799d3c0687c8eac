use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::builders::reporter::ConsoleReporter;
use crate::core::config::AuditConfig;
use crate::core::engine::{AuditEngine, AuditSummary};
use crate::core::git::Git2Client;

/// Sets up stderr logging. `RUST_LOG` wins when set; otherwise each `-v`
/// raises the level from `warn` to `info` to `debug`.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialisation (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Opens the repository described by `config` and audits it, printing
/// violations to stdout.
pub fn run_audit(config: &AuditConfig) -> Result<AuditSummary> {
    let client = Git2Client::open(&config.working_dir, config.programs.clone())?;
    debug!(working_dir = %config.working_dir.display(), "opened repository");

    let engine = AuditEngine::new(client, ConsoleReporter::new());
    let summary = engine
        .run(config.size_threshold)
        .with_context(|| format!("audit of {} failed", config.working_dir.display()))?;
    Ok(summary)
}
