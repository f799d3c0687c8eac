//! Audits a git working directory for git-lfs policy violations: LFS-tracked
//! files whose committed blob is not a valid pointer, and (optionally) large
//! files that are not tracked by LFS at all.
//!
//! The [`crate::core::engine::AuditEngine`] drives a [`crate::core::git::GitClient`] and
//! hands violations to a [`crate::builders::reporter::Reporter`].

pub mod builders;
pub mod core;
pub mod utils;
