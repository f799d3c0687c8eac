use std::cell::RefCell;
use std::io::{self, Write};

use crate::core::git::RepoPath;

/// Receives the policy violations found during an audit.
///
/// Violations are reported as soon as they are found; nothing is buffered
/// by the engine itself.
pub trait Reporter {
    /// A path tracked by the LFS filter whose committed blob is not a valid pointer.
    fn invalid_pointer(&self, path: &RepoPath);

    /// A file at or above the size threshold that the LFS filter does not track.
    fn untracked_large_file(&self, path: &RepoPath);
}

const INVALID_POINTER: &str = "Invalid LFS Pointer";
const UNTRACKED_LARGE_FILE: &str = "Untracked large file";

/// Formats the line printed for an invalid pointer.
pub fn invalid_pointer_line(path: &RepoPath) -> String {
    format!("{path}: {INVALID_POINTER}")
}

/// Formats the line printed for an untracked large file.
pub fn untracked_large_file_line(path: &RepoPath) -> String {
    format!("{path}: {UNTRACKED_LARGE_FILE}")
}

/// Prints one line per violation to standard output.
///
/// This is the reporter used by the `lfs-audit` binary. Log output goes to
/// stderr, so stdout carries nothing but these lines. Paths are written as
/// raw bytes, exactly as git reports them.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, path: &RepoPath, message: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout must not abort the audit; the exit code still tells.
        let _ = out
            .write_all(path.as_bytes())
            .and_then(|()| writeln!(out, ": {message}"));
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn invalid_pointer(&self, path: &RepoPath) {
        self.emit(path, INVALID_POINTER);
    }

    fn untracked_large_file(&self, path: &RepoPath) {
        self.emit(path, UNTRACKED_LARGE_FILE);
    }
}

/// Keeps the report lines in memory instead of printing them.
///
/// Useful when embedding the audit in another tool, and in tests.
#[derive(Default)]
pub struct MemoryReporter {
    lines: RefCell<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported so far, in report order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Reporter for MemoryReporter {
    fn invalid_pointer(&self, path: &RepoPath) {
        self.lines.borrow_mut().push(invalid_pointer_line(path));
    }

    fn untracked_large_file(&self, path: &RepoPath) {
        self.lines.borrow_mut().push(untracked_large_file_line(path));
    }
}
