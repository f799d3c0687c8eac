use tracing::{debug, info};

use crate::builders::reporter::Reporter;
use crate::builders::scanner::scan_large_files;
use crate::builders::validator::validate_pointers;
use crate::core::error::AuditResult;
use crate::core::git::GitClient;

/// Running pass/fail state of an audit.
///
/// Starts out passing and is folded with logical AND; once failed it stays
/// failed. Folding never short-circuits the checks themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    passed: bool,
}

impl Verdict {
    pub fn new() -> Self {
        Self { passed: true }
    }

    pub fn record(&mut self, ok: bool) {
        self.passed = self.passed && ok;
    }

    pub fn passed(&self) -> bool {
        self.passed
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::new()
    }
}

/// What one audit run found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSummary {
    pub tracked: usize,
    pub invalid_pointers: usize,
    /// `None` when the size check was disabled.
    pub scanned_files: Option<usize>,
    pub untracked_large_files: usize,
    pub verdict: Verdict,
}

impl AuditSummary {
    pub fn passed(&self) -> bool {
        self.verdict.passed()
    }

    pub fn size_check_ran(&self) -> bool {
        self.scanned_files.is_some()
    }
}

pub struct AuditEngine<C, R> {
    client: C,
    reporter: R,
}

impl<C: GitClient, R: Reporter> AuditEngine<C, R> {
    pub fn new(client: C, reporter: R) -> Self {
        Self { client, reporter }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs the audit: enumerate LFS paths, check every pointer, then scan
    /// the HEAD tree for large untracked files when `threshold` is positive.
    ///
    /// The verdict is folded in that order. Any collaborator failure aborts
    /// the run with an error; violations only flip the verdict.
    pub fn run(&self, threshold: u64) -> AuditResult<AuditSummary> {
        let mut verdict = Verdict::new();

        let tracked = self.client.list_lfs_files()?;
        debug!(count = tracked.len(), "found LFS-tracked files");

        let pointers = validate_pointers(&self.client, &tracked, &self.reporter)?;
        verdict.record(pointers.all_valid());

        let mut scanned_files = None;
        let mut untracked_large_files = 0;
        if threshold > 0 {
            let scan = scan_large_files(&self.client, &tracked, threshold, &self.reporter)?;
            verdict.record(scan.clean());
            scanned_files = Some(scan.scanned);
            untracked_large_files = scan.untracked.len();
        } else {
            debug!("size check disabled");
        }

        let summary = AuditSummary {
            tracked: tracked.len(),
            invalid_pointers: pointers.invalid.len(),
            scanned_files,
            untracked_large_files,
            verdict,
        };
        info!(
            tracked = summary.tracked,
            invalid_pointers = summary.invalid_pointers,
            scanned_files = ?summary.scanned_files,
            untracked_large_files = summary.untracked_large_files,
            passed = summary.passed(),
            "audit finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_is_sticky() {
        let mut verdict = Verdict::new();
        assert!(verdict.passed());
        verdict.record(true);
        assert!(verdict.passed());
        verdict.record(false);
        assert!(!verdict.passed());
        verdict.record(true);
        assert!(!verdict.passed());
    }
}
