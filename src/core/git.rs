use git2::{ObjectType, Odb, Repository, Tree};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

use crate::core::config::Programs;
use crate::core::error::{AuditError, AuditResult};

/// A repository-relative, `/`-separated path exactly as git stores it.
///
/// Git paths are byte strings and need not be valid UTF-8. The raw bytes are
/// what gets compared and handed back to git; the lossy UTF-8 form is only
/// for display.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoPath(Vec<u8>);

impl RepoPath {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Appends one path component.
    pub fn join(&self, name: &[u8]) -> Self {
        if self.0.is_empty() {
            return Self(name.to_vec());
        }
        let mut bytes = Vec::with_capacity(self.0.len() + 1 + name.len());
        bytes.extend_from_slice(&self.0);
        bytes.push(b'/');
        bytes.extend_from_slice(name);
        Self(bytes)
    }

    /// `<prefix><path>` as a command-line argument, keeping the raw bytes
    /// where the platform allows it.
    fn to_arg(&self, prefix: &str) -> OsString {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStringExt;
            let mut bytes = prefix.as_bytes().to_vec();
            bytes.extend_from_slice(&self.0);
            OsString::from_vec(bytes)
        }
        #[cfg(not(unix))]
        {
            OsString::from(format!("{prefix}{self}"))
        }
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for RepoPath {
    fn from(path: &str) -> Self {
        Self(path.as_bytes().to_vec())
    }
}

/// Paths governed by the LFS filter attribute at the current revision.
///
/// Sorted so that diagnostics come out in a stable order.
pub type TrackedPaths = BTreeSet<RepoPath>;

/// Pathspec selecting every file whose `filter` attribute is `lfs`.
const LFS_PATHSPEC: &str = ":(attr:filter=lfs)";

/// A file entry of the HEAD tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub path: RepoPath,
    /// Blob size in bytes.
    pub size: u64,
}

/// Lazy, single-pass sequence of the files in a tree.
pub type FileIter<'a> = Box<dyn Iterator<Item = AuditResult<TreeFile>> + 'a>;

/// Trait defining the git and git-lfs operations required by the audit engine.
/// This abstraction allows the engine to be tested without real collaborators.
pub trait GitClient {
    /// Returns every path at the current revision that the LFS filter governs.
    fn list_lfs_files(&self) -> AuditResult<TrackedPaths>;

    /// Checks whether the blob committed at `HEAD:<path>` is a well-formed LFS pointer.
    ///
    /// `Ok(false)` means the checker rejected the content. An `Err` means the
    /// check itself could not be carried out.
    fn is_valid_pointer(&self, path: &RepoPath) -> AuditResult<bool>;

    /// Walks the tree of the HEAD commit, yielding every file with its size.
    fn head_files(&self) -> AuditResult<FileIter<'_>>;
}

/// Concrete implementation of GitClient: the git and git-lfs command line
/// tools for attributes and pointer checks, libgit2 for the tree walk.
pub struct Git2Client {
    repo: Repository,
    working_dir: PathBuf,
    programs: Programs,
}

impl Git2Client {
    pub fn open<P: AsRef<Path>>(working_dir: P, programs: Programs) -> AuditResult<Self> {
        let working_dir = working_dir.as_ref().to_path_buf();
        let repo = Repository::open(&working_dir).map_err(|source| AuditError::OpenRepository {
            path: working_dir.clone(),
            source,
        })?;
        Ok(Self {
            repo,
            working_dir,
            programs,
        })
    }

    fn command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.current_dir(&self.working_dir);
        cmd
    }
}

impl GitClient for Git2Client {
    fn list_lfs_files(&self) -> AuditResult<TrackedPaths> {
        let git = &self.programs.git;
        let args = ["ls-files", "-z", "--full-name", LFS_PATHSPEC];
        debug!(program = %git.display(), ?args, "listing LFS-tracked files");

        let output = self
            .command(git)
            .args(args)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| spawn_error(git, source))?;
        if !output.status.success() {
            return Err(AuditError::CommandFailed {
                command: format!("{} {}", git.display(), args.join(" ")),
                status: output.status,
            });
        }

        Ok(parse_nul_paths(&output.stdout))
    }

    fn is_valid_pointer(&self, path: &RepoPath) -> AuditResult<bool> {
        let git = &self.programs.git;
        let lfs = &self.programs.git_lfs;
        let revspec = path.to_arg("HEAD:");
        debug!(%path, "checking LFS pointer");

        // The builders are temporaries so the parent drops its copy of the
        // pipe as soon as both children hold theirs.
        let mut cat = self
            .command(git)
            .arg("cat-file")
            .arg("blob")
            .arg(&revspec)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| spawn_error(git, source))?;
        let blob = cat
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("blob output was not captured"))?;

        let check = self
            .command(lfs)
            .args(["pointer", "check", "--stdin"])
            .stdin(Stdio::from(blob))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut check = match check {
            Ok(child) => child,
            Err(source) => {
                let _ = cat.kill();
                let _ = cat.wait();
                return Err(spawn_error(lfs, source));
            }
        };

        let verdict = check.wait()?;
        let cat_status = cat.wait()?;
        if !cat_status.success() && !closed_by_reader(&cat_status) {
            return Err(AuditError::CommandFailed {
                command: format!("{} cat-file blob HEAD:{path}", git.display()),
                status: cat_status,
            });
        }

        debug!(%path, valid = verdict.success(), "pointer check finished");
        Ok(verdict.success())
    }

    fn head_files(&self) -> AuditResult<FileIter<'_>> {
        let commit = self.repo.head()?.peel_to_commit()?;
        debug!(commit = %commit.id(), "walking HEAD tree");
        let tree = commit.tree()?;
        Ok(Box::new(TreeFiles::new(&self.repo, tree)?))
    }
}

fn spawn_error(program: &Path, source: std::io::Error) -> AuditError {
    AuditError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

/// Splits NUL-delimited `ls-files -z` output into a path set, dropping empty entries.
pub fn parse_nul_paths(raw: &[u8]) -> TrackedPaths {
    raw.split(|b| *b == 0)
        .filter(|p| !p.is_empty())
        .map(RepoPath::from_bytes)
        .collect()
}

/// The blob writer died of a broken pipe: the checker had read enough to
/// decide and closed its end. Git normally re-raises SIGPIPE, and exits with
/// 128 + SIGPIPE when the signal cannot be delivered.
#[cfg(unix)]
fn closed_by_reader(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGPIPE: i32 = 13;
    status.signal() == Some(SIGPIPE) || status.code() == Some(128 + SIGPIPE)
}

#[cfg(not(unix))]
fn closed_by_reader(_status: &ExitStatus) -> bool {
    false
}

/// Depth-first iterator over the blobs of a tree.
///
/// Each pending level of the walk is a `(prefix, tree, next index)` frame.
/// Sizes come from the object header so blob contents are never loaded.
struct TreeFiles<'repo> {
    repo: &'repo Repository,
    odb: Odb<'repo>,
    stack: Vec<(RepoPath, Tree<'repo>, usize)>,
}

impl<'repo> TreeFiles<'repo> {
    fn new(repo: &'repo Repository, root: Tree<'repo>) -> AuditResult<Self> {
        Ok(Self {
            repo,
            odb: repo.odb()?,
            stack: vec![(RepoPath::default(), root, 0)],
        })
    }
}

impl Iterator for TreeFiles<'_> {
    type Item = AuditResult<TreeFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = {
                let (prefix, tree, idx) = self.stack.last_mut()?;
                tree.get(*idx).map(|entry| {
                    *idx += 1;
                    (prefix.join(entry.name_bytes()), entry.kind(), entry.id())
                })
            };
            let Some((path, kind, id)) = step else {
                self.stack.pop();
                continue;
            };

            match kind {
                Some(ObjectType::Tree) => match self.repo.find_tree(id) {
                    Ok(subtree) => self.stack.push((path, subtree, 0)),
                    Err(e) => return Some(Err(e.into())),
                },
                Some(ObjectType::Blob) => {
                    let file = self
                        .odb
                        .read_header(id)
                        .map(|(size, _)| TreeFile {
                            path,
                            size: size as u64,
                        })
                        .map_err(AuditError::from);
                    return Some(file);
                }
                // Submodule entries point at commits in other repositories.
                _ => continue,
            }
        }
    }
}
