use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::builders::size::{clamp_threshold, parse_size};
use crate::core::error::{AuditError, AuditResult};

/// Name of the optional per-repository settings file, stored in the git dir.
pub const SETTINGS_FILE: &str = "lfs-audit.toml";

/// Size limit used when neither the command line nor the settings file gives one.
pub const DEFAULT_SIZE_LIMIT: &str = "0";

/// External programs the audit shells out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub git: PathBuf,
    pub git_lfs: PathBuf,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            git_lfs: PathBuf::from("git-lfs"),
        }
    }
}

/// Contents of `lfs-audit.toml` in the git dir. Every key is optional.
///
/// ```toml
/// size_limit = "5MB"
/// lfs_program = "/opt/git-lfs/bin/git-lfs"
/// ```
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    pub size_limit: Option<String>,
    pub git_program: Option<PathBuf>,
    pub lfs_program: Option<PathBuf>,
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub size_limit: Option<String>,
    pub git_program: Option<PathBuf>,
    pub lfs_program: Option<PathBuf>,
}

/// Fully resolved configuration for one audit run.
///
/// Built once by the entry point and handed down; nothing below it reads
/// flags, the environment or the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub working_dir: PathBuf,
    /// Size check threshold in bytes; zero disables the check.
    pub size_threshold: u64,
    pub programs: Programs,
}

impl AuditConfig {
    /// Resolves the configuration for `working_dir`.
    ///
    /// Precedence is command line, then settings file, then defaults. The size
    /// limit is parsed here, so a malformed value fails before any repository
    /// is opened.
    pub fn resolve(working_dir: PathBuf, overrides: ConfigOverrides) -> AuditResult<Self> {
        let settings = ConfigManager::new(&working_dir).load_settings()?;

        let size_limit = overrides
            .size_limit
            .or(settings.size_limit)
            .unwrap_or_else(|| DEFAULT_SIZE_LIMIT.to_string());
        let size_threshold = clamp_threshold(parse_size(&size_limit)?);

        let defaults = Programs::default();
        let programs = Programs {
            git: overrides
                .git_program
                .or(settings.git_program)
                .unwrap_or(defaults.git),
            git_lfs: overrides
                .lfs_program
                .or(settings.lfs_program)
                .unwrap_or(defaults.git_lfs),
        };

        debug!(working_dir = %working_dir.display(), size_threshold, ?programs, "resolved configuration");
        Ok(Self {
            working_dir,
            size_threshold,
            programs,
        })
    }

    /// Whether the large-file scan runs at all.
    pub fn size_check_enabled(&self) -> bool {
        self.size_threshold > 0
    }
}

/// Finds the directory that holds repository-wide files for `working_dir`.
///
/// In a plain clone that is `.git/` itself. In a linked worktree or a
/// submodule `.git` is a file whose `gitdir:` line points elsewhere; a
/// worktree's git dir in turn names the shared repository in `commondir`,
/// so every worktree reads the same settings file.
fn resolve_git_dir(working_dir: &Path) -> PathBuf {
    let dot_git = working_dir.join(".git");
    if !dot_git.is_file() {
        return dot_git;
    }

    let Ok(link) = fs::read_to_string(&dot_git) else {
        return dot_git;
    };
    let Some(target) = link.lines().find_map(|line| line.strip_prefix("gitdir:")) else {
        return dot_git;
    };

    let git_dir = working_dir.join(target.trim());
    match fs::read_to_string(git_dir.join("commondir")) {
        Ok(common) => git_dir.join(common.trim()),
        Err(_) => git_dir,
    }
}

/// Locates and reads the settings file of a working directory.
pub struct ConfigManager {
    settings_path: PathBuf,
}

impl ConfigManager {
    pub fn new(working_dir: &Path) -> Self {
        let git_dir = resolve_git_dir(working_dir);
        debug!(git_dir = %git_dir.display(), "settings location");
        Self {
            settings_path: git_dir.join(SETTINGS_FILE),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Reads the settings file. A missing file, or a git dir that is not a
    /// directory, yields empty settings.
    pub fn load_settings(&self) -> AuditResult<AuditSettings> {
        let content = match fs::read_to_string(&self.settings_path) {
            Ok(content) => content,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(AuditSettings::default());
            }
            Err(source) => {
                return Err(AuditError::ConfigRead {
                    path: self.settings_path.clone(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| AuditError::ConfigParse {
            path: self.settings_path.clone(),
            source,
        })
    }
}
