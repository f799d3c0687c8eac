use git2::{Repository, Signature};
use lfs_audit::builders::reporter::MemoryReporter;
use lfs_audit::core::config::{AuditConfig, ConfigManager, ConfigOverrides, Programs};
use lfs_audit::core::engine::AuditEngine;
use lfs_audit::core::error::AuditError;
use lfs_audit::core::git::{Git2Client, GitClient, RepoPath};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const POINTER: &str = "version https://git-lfs.github.com/spec/v1\n\
oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\n\
size 12345\n";

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// Creates a repository, writes `files` into it, stages and commits them.
fn setup_test_repo(files: &[(&str, &[u8])]) -> (TempDir, Repository) {
    let files: Vec<(&Path, &[u8])> = files
        .iter()
        .map(|(name, content)| (Path::new(*name), *content))
        .collect();
    setup_repo_with_paths(&files)
}

fn setup_repo_with_paths(files: &[(&Path, &[u8])]) -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    {
        let mut index = repo.index().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            index.add_path(name).unwrap();
        }
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
    }

    (dir, repo)
}

/// Writes an executable stand-in for `git-lfs` that accepts exactly the
/// content starting with the LFS pointer version line.
#[cfg(unix)]
fn stub_lfs(dir: &Path) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("git-lfs-stub");
    {
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(
            b"#!/bin/sh\n\
content=$(cat)\n\
case \"$content\" in\n\
  \"version https://git-lfs.github.com/spec/v1\"*) exit 0 ;;\n\
  *) exit 1 ;;\n\
esac\n",
        )
        .unwrap();
        file.sync_all().unwrap();
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn programs_with_lfs(lfs: impl Into<PathBuf>) -> Programs {
    Programs {
        git_lfs: lfs.into(),
        ..Programs::default()
    }
}

#[test]
fn test_lists_only_lfs_tracked_paths() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs diff=lfs merge=lfs -text\n"),
        ("assets/model.bin", POINTER.as_bytes()),
        ("assets/with space.bin", POINTER.as_bytes()),
        ("README.md", b"hello\n"),
    ]);

    let client = Git2Client::open(td.path(), Programs::default()).unwrap();
    let tracked = client.list_lfs_files().unwrap();

    assert_eq!(
        tracked.iter().map(RepoPath::to_string).collect::<Vec<_>>(),
        vec!["assets/model.bin", "assets/with space.bin"]
    );
}

#[cfg(unix)]
#[test]
fn test_always_valid_checker_accepts_everything() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("a.bin", b"not a pointer at all"),
        ("b.bin", POINTER.as_bytes()),
    ]);

    let client = Git2Client::open(td.path(), programs_with_lfs("true")).unwrap();
    let engine = AuditEngine::new(client, MemoryReporter::new());
    let summary = engine.run(0).unwrap();

    assert!(summary.passed());
    assert!(engine.reporter().lines().is_empty());
}

#[cfg(unix)]
#[test]
fn test_reports_the_one_invalid_pointer() {
    if !git_available() {
        return;
    }
    let scripts = tempfile::tempdir().unwrap();
    let lfs = stub_lfs(scripts.path());
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("good.bin", POINTER.as_bytes()),
        ("bad.bin", b"raw bytes committed by mistake"),
        ("also-good.bin", POINTER.as_bytes()),
    ]);

    let client = Git2Client::open(td.path(), programs_with_lfs(&lfs)).unwrap();
    assert!(client.is_valid_pointer(&RepoPath::from("good.bin")).unwrap());
    assert!(!client.is_valid_pointer(&RepoPath::from("bad.bin")).unwrap());

    let engine = AuditEngine::new(client, MemoryReporter::new());
    let summary = engine.run(0).unwrap();

    assert!(!summary.passed());
    assert_eq!(engine.reporter().lines(), vec!["bad.bin: Invalid LFS Pointer"]);
}

#[cfg(unix)]
#[test]
fn test_pointer_check_uses_committed_blob() {
    if !git_available() {
        return;
    }
    let scripts = tempfile::tempdir().unwrap();
    let lfs = stub_lfs(scripts.path());
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("model.bin", POINTER.as_bytes()),
    ]);
    // An uncommitted edit in the working tree must not affect the verdict.
    fs::write(td.path().join("model.bin"), b"smudged content").unwrap();

    let client = Git2Client::open(td.path(), programs_with_lfs(&lfs)).unwrap();
    assert!(client.is_valid_pointer(&RepoPath::from("model.bin")).unwrap());
}

#[cfg(unix)]
#[test]
fn test_missing_blob_is_an_error_not_an_invalid_pointer() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[("README.md", b"hello\n")]);

    let client = Git2Client::open(td.path(), programs_with_lfs("true")).unwrap();
    let err = client
        .is_valid_pointer(&RepoPath::from("does/not/exist.bin"))
        .unwrap_err();
    assert!(matches!(err, AuditError::CommandFailed { .. }));
}

#[test]
fn test_missing_checker_is_an_environment_error() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("a.bin", POINTER.as_bytes()),
    ]);

    let client = Git2Client::open(
        td.path(),
        programs_with_lfs("/nonexistent/definitely-not-git-lfs"),
    )
    .unwrap();
    let engine = AuditEngine::new(client, MemoryReporter::new());
    let err = engine.run(0).unwrap_err();

    match err {
        AuditError::Path { path, source } => {
            assert_eq!(path, "a.bin");
            assert!(matches!(*source, AuditError::Spawn { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_size_scan_against_real_tree() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"tracked/** filter=lfs\n"),
        ("tracked/big.dat", &[1u8; 20]),
        ("untracked/big.dat", &[2u8; 20]),
        ("untracked/small.dat", &[3u8; 5]),
    ]);

    let client = Git2Client::open(td.path(), programs_with_lfs("true")).unwrap();
    let engine = AuditEngine::new(client, MemoryReporter::new());
    let summary = engine.run(10).unwrap();

    assert!(!summary.passed());
    assert!(summary.size_check_ran());
    assert_eq!(
        engine.reporter().lines(),
        vec!["untracked/big.dat: Untracked large file"]
    );
}

#[test]
fn test_config_resolution_reads_settings_file() {
    let (td, _repo) = setup_test_repo(&[("README.md", b"hello\n")]);
    let manager = ConfigManager::new(td.path());
    assert_eq!(
        manager.settings_path(),
        td.path().join(".git").join("lfs-audit.toml")
    );
    fs::write(manager.settings_path(), "size_limit = \"10kb\"\n").unwrap();

    let config =
        AuditConfig::resolve(td.path().to_path_buf(), ConfigOverrides::default()).unwrap();
    assert_eq!(config.size_threshold, 10_000);
    assert!(config.size_check_enabled());
}

#[test]
fn test_linked_worktree_shares_settings_and_audits() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[("dump.sql", &[b'x'; 2048])]);
    fs::write(
        td.path().join(".git").join("lfs-audit.toml"),
        "size_limit = \"1kb\"\n",
    )
    .unwrap();

    let root = tempfile::tempdir().unwrap();
    let worktree = root.path().join("wt");
    let status = Command::new("git")
        .arg("-C")
        .arg(td.path())
        .args(["worktree", "add", "--detach"])
        .arg(&worktree)
        .output()
        .unwrap()
        .status;
    assert!(status.success());
    assert!(worktree.join(".git").is_file());

    let config = AuditConfig::resolve(worktree.clone(), ConfigOverrides::default()).unwrap();
    assert_eq!(config.size_threshold, 1_000);

    let output = lfs_audit().arg(&worktree).output().unwrap();
    assert_eq!(
        output.status.code(),
        Some(1),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "dump.sql: Untracked large file\n"
    );
}

#[cfg(unix)]
#[test]
fn test_checker_that_stops_reading_early() {
    if !git_available() {
        return;
    }
    // Far larger than a pipe buffer, so the blob writer is still writing
    // when the checker exits.
    let big = vec![b'z'; 4 * 1024 * 1024];
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("huge.bin", &big),
    ]);
    let path = RepoPath::from("huge.bin");

    let accepting = Git2Client::open(td.path(), programs_with_lfs("true")).unwrap();
    assert!(accepting.is_valid_pointer(&path).unwrap());

    let rejecting = Git2Client::open(td.path(), programs_with_lfs("false")).unwrap();
    assert!(!rejecting.is_valid_pointer(&path).unwrap());
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_path_is_checked_by_its_raw_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    if !git_available() {
        return;
    }
    let name = Path::new(OsStr::from_bytes(b"caf\xe9.bin"));
    let (td, _repo) = setup_repo_with_paths(&[
        (Path::new(".gitattributes"), b"*.bin filter=lfs\n"),
        (name, &[7u8; 20]),
    ]);

    let client = Git2Client::open(td.path(), programs_with_lfs("true")).unwrap();
    let tracked = client.list_lfs_files().unwrap();
    assert!(tracked.contains(&RepoPath::from_bytes(&b"caf\xe9.bin"[..])));

    let engine = AuditEngine::new(client, MemoryReporter::new());
    let summary = engine.run(10).unwrap();
    assert!(summary.passed());
    assert_eq!(summary.untracked_large_files, 0);

    let client = Git2Client::open(td.path(), programs_with_lfs("false")).unwrap();
    let engine = AuditEngine::new(client, MemoryReporter::new());
    let summary = engine.run(0).unwrap();
    assert!(!summary.passed());
    assert_eq!(
        engine.reporter().lines(),
        vec!["caf\u{FFFD}.bin: Invalid LFS Pointer"]
    );
}

// --- binary end-to-end -------------------------------------------------------

fn lfs_audit() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lfs-audit"))
}

#[test]
fn test_cli_bad_size_limit_fails_before_opening_repository() {
    let output = lfs_audit()
        .args(["--size-limit", "abc", "/nonexistent/not-a-repo"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("configuration error: "), "stderr: {stderr}");
    assert!(stderr.contains("invalid size-limit"), "stderr: {stderr}");
    assert!(!stderr.contains("failed to open repository"));
}

#[test]
fn test_cli_not_a_repository_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = lfs_audit().arg(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open repository"), "stderr: {stderr}");
}

#[test]
fn test_cli_clean_repository_exits_zero() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[("README.md", b"hello\n")]);

    let output = lfs_audit().arg(td.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[cfg(unix)]
#[test]
fn test_cli_invalid_pointer_exits_one_with_one_line() {
    if !git_available() {
        return;
    }
    let scripts = tempfile::tempdir().unwrap();
    let lfs = stub_lfs(scripts.path());
    let (td, _repo) = setup_test_repo(&[
        (".gitattributes", b"*.bin filter=lfs\n"),
        ("ok.bin", POINTER.as_bytes()),
        ("broken.bin", b"\x00\x01\x02 binary payload"),
    ]);

    let output = lfs_audit()
        .arg("--lfs-program")
        .arg(&lfs)
        .arg(td.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "broken.bin: Invalid LFS Pointer\n"
    );
}

#[test]
fn test_cli_untracked_large_file_exits_one() {
    if !git_available() {
        return;
    }
    let (td, _repo) = setup_test_repo(&[("dump.sql", &[b'x'; 2048])]);

    let output = lfs_audit()
        .args(["--size-limit", "1kb"])
        .arg(td.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "dump.sql: Untracked large file\n"
    );
}
