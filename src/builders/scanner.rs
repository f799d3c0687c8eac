use tracing::debug;

use crate::builders::reporter::Reporter;
use crate::core::error::AuditResult;
use crate::core::git::{GitClient, RepoPath, TrackedPaths};

/// Outcome of the large-file scan over the HEAD tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Number of files visited in the tree.
    pub scanned: usize,
    /// Files at or above the threshold that the LFS filter does not track.
    pub untracked: Vec<RepoPath>,
}

impl ScanReport {
    pub fn clean(&self) -> bool {
        self.untracked.is_empty()
    }
}

/// Flags every file in the HEAD tree that is at least `threshold` bytes and
/// not in `tracked`.
///
/// Membership is an exact path match. The whole tree is always visited, so
/// one run reports every violation. Files smaller than the threshold are
/// skipped without a lookup.
pub fn scan_large_files<C, R>(
    client: &C,
    tracked: &TrackedPaths,
    threshold: u64,
    reporter: &R,
) -> AuditResult<ScanReport>
where
    C: GitClient + ?Sized,
    R: Reporter + ?Sized,
{
    let mut report = ScanReport::default();

    for file in client.head_files()? {
        let file = file?;
        report.scanned += 1;

        if file.size < threshold {
            continue;
        }
        if !tracked.contains(&file.path) {
            debug!(path = %file.path, size = file.size, threshold, "untracked large file");
            reporter.untracked_large_file(&file.path);
            report.untracked.push(file.path);
        }
    }

    Ok(report)
}
