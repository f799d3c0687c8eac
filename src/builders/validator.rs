use tracing::debug;

use crate::builders::reporter::Reporter;
use crate::core::error::AuditResult;
use crate::core::git::{GitClient, RepoPath, TrackedPaths};

/// Outcome of checking every tracked path's pointer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PointerReport {
    /// Number of pointers checked.
    pub checked: usize,
    /// Paths whose committed blob is not a valid pointer, in check order.
    pub invalid: Vec<RepoPath>,
}

impl PointerReport {
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Checks the committed pointer of every tracked path.
///
/// Each invalid pointer is handed to the reporter as soon as it is found and
/// the pass carries on with the remaining paths. A failure to run the check
/// at all aborts the pass, with the offending path attached to the error.
///
/// # Arguments
/// * `client`: The git collaborator used to run the check.
/// * `tracked`: The paths governed by the LFS filter.
/// * `reporter`: Receives one report per invalid pointer.
pub fn validate_pointers<C, R>(
    client: &C,
    tracked: &TrackedPaths,
    reporter: &R,
) -> AuditResult<PointerReport>
where
    C: GitClient + ?Sized,
    R: Reporter + ?Sized,
{
    let mut report = PointerReport::default();

    for path in tracked {
        let valid = client
            .is_valid_pointer(path)
            .map_err(|e| e.at_path(&path.to_string()))?;
        report.checked += 1;

        if !valid {
            debug!(%path, "invalid LFS pointer");
            reporter.invalid_pointer(path);
            report.invalid.push(path.clone());
        }
    }

    Ok(report)
}
