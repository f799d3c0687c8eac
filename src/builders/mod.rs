// This file is the module declaration file for the `builders` module.
// It declares and makes public the building blocks the audit engine is
// assembled from.

// `reporter` module:
// The `Reporter` trait plus `ConsoleReporter` (prints violation lines to
// stdout) and `MemoryReporter` (keeps them in memory).
pub mod reporter;

// `scanner` module:
// Walks the HEAD tree and flags files at or above the size threshold that
// the LFS filter does not track.
pub mod scanner;

// `size` module:
// Parses human-readable size strings such as `10kb` or `1MiB` into bytes.
pub mod size;

// `validator` module:
// Runs the LFS pointer check for every tracked path and collects the
// invalid ones.
pub mod validator;
