// This file is the module declaration file for the `core` module.
// It declares the submodules under `src/core/` and exposes them to the rest
// of the crate.

// `config` module:
// Resolves the run configuration (working directory, size threshold, external
// programs) from command-line overrides and the optional `.git/lfs-audit.toml`.
pub mod config;

// `engine` module:
// The audit orchestrator. Enumerates LFS paths, validates pointers, runs the
// optional size scan and folds the results into a single verdict.
pub mod engine;

// `error` module:
// The `AuditError` taxonomy shared by every stage of a run.
pub mod error;

// `git` module:
// The `GitClient` trait and its `Git2Client` implementation, which drive the
// `git` and `git-lfs` command line tools and walk the HEAD tree with libgit2.
pub mod git;
