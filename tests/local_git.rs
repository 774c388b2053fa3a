//! Integration tests for local repository operations.

use git2::{Commit, Oid, Repository, Signature};
use repo_manager::manager::local_branches;
use repo_manager::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&Commit> = parents.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

fn init_repo(dir: &Path) -> Repository {
    let repo = Repository::init(dir).unwrap();
    commit_file(&repo, "README.md", "# test\n", "Initial commit");
    repo
}

#[test]
fn test_open_non_repository() {
    let dir = TempDir::new().unwrap();
    match GitOps::open(dir.path()) {
        Err(ManagerError::RepoNotFound(path)) => assert_eq!(path, dir.path()),
        Err(other) => panic!("expected RepoNotFound, got {:?}", other),
        Ok(_) => panic!("expected RepoNotFound"),
    }
    assert!(!GitOps::is_repository(dir.path()));
}

#[test]
fn test_list_and_current_branch() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let git = GitOps::open(dir.path()).unwrap();
    let default = git.current_branch().unwrap();

    git.create_branch("feature").unwrap();
    git.create_branch("bugfix").unwrap();

    let branches = git.list_branches().unwrap();
    assert!(branches.contains(&default));
    assert!(branches.contains(&"feature".to_string()));
    let mut sorted = branches.clone();
    sorted.sort();
    assert_eq!(branches, sorted);

    // Creating a branch does not switch to it
    assert_eq!(git.current_branch().unwrap(), default);
}

#[test]
fn test_local_branches_summary() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    GitOps::open(dir.path()).unwrap().checkout_new_branch("work").unwrap();

    let branches = local_branches(dir.path()).unwrap();
    assert_eq!(branches.current.as_deref(), Some("work"));
    assert_eq!(branches.names.len(), 2);
}

#[test]
fn test_checkout_branch() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let git = GitOps::open(dir.path()).unwrap();

    git.create_branch("develop").unwrap();
    git.checkout_branch("develop").unwrap();
    assert_eq!(git.current_branch().unwrap(), "develop");

    let err = git.checkout_branch("missing").unwrap_err();
    assert!(matches!(err, ManagerError::BranchError { .. }));
}

#[test]
fn test_checkout_new_branch_rejects_existing() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let git = GitOps::open(dir.path()).unwrap();

    git.checkout_new_branch("topic").unwrap();
    assert_eq!(git.current_branch().unwrap(), "topic");

    let err = git.checkout_new_branch("topic").unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn test_create_and_checkout_reuses_existing_branch() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let git = GitOps::open(dir.path()).unwrap();
    let default = git.current_branch().unwrap();

    git.create_and_checkout("release").unwrap();
    assert_eq!(git.current_branch().unwrap(), "release");
    let tip = commit_file(&repo, "notes.txt", "v1\n", "Release notes");

    git.checkout_branch(&default).unwrap();
    git.create_and_checkout("release").unwrap();
    assert_eq!(git.current_branch().unwrap(), "release");
    assert_eq!(repo.head().unwrap().target().unwrap(), tip);
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn test_detached_head_has_no_current_branch() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let head = repo.head().unwrap().target().unwrap();
    repo.set_head_detached(head).unwrap();

    let git = GitOps::open(dir.path()).unwrap();
    let err = git.current_branch().unwrap_err();
    assert!(err.to_string().contains("detached"));
}

#[test]
fn test_invalid_branch_name() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let git = GitOps::open(dir.path()).unwrap();

    assert!(matches!(
        git.create_branch("bad..name"),
        Err(ManagerError::BranchError { .. })
    ));
}

#[test]
fn test_delete_branch() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    let git = GitOps::open(dir.path()).unwrap();
    let default = git.current_branch().unwrap();

    // Merged branch deletes without force
    git.create_branch("merged").unwrap();
    git.delete_branch("merged", false).unwrap();
    assert!(!git.branch_exists("merged"));

    // The checked-out branch is protected
    assert!(git.delete_branch(&default, true).is_err());

    // Unmerged work needs force
    git.checkout_new_branch("unmerged").unwrap();
    commit_file(&repo, "work.txt", "wip\n", "Work in progress");
    git.checkout_branch(&default).unwrap();

    let err = git.delete_branch("unmerged", false).unwrap_err();
    assert!(err.to_string().contains("not fully merged"));
    git.delete_branch("unmerged", true).unwrap();
    assert!(!git.branch_exists("unmerged"));
}

#[test]
fn test_recent_commits_newest_first() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    commit_file(&repo, "a.txt", "a\n", "Add a");
    let last = commit_file(&repo, "b.txt", "b\n", "Add b\n\nWith a body");

    let git = GitOps::open(dir.path()).unwrap();
    let commits = git.recent_commits(2).unwrap();

    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].sha, last.to_string());
    assert_eq!(commits[0].summary, "Add b");
    assert_eq!(commits[0].author, "Test User");
    assert_eq!(commits[0].short_sha().len(), 7);
    assert!(commits[0].time.is_some());
    assert_eq!(commits[1].summary, "Add a");

    assert_eq!(git.recent_commits(10).unwrap().len(), 3);
}

#[test]
fn test_remote_configuration() {
    let dir = TempDir::new().unwrap();
    let repo = init_repo(dir.path());
    repo.remote("origin", "https://github.com/octocat/old.git")
        .unwrap();

    let git = GitOps::open(dir.path()).unwrap();
    assert!(git.remote_exists("origin"));
    assert!(!git.remote_exists("upstream"));
    assert_eq!(git.list_remotes().unwrap(), vec!["origin".to_string()]);

    git.set_remote_url("origin", "https://github.com/octocat/new.git")
        .unwrap();
    assert_eq!(
        git.remote_url("origin").unwrap(),
        "https://github.com/octocat/new.git"
    );

    assert!(git.set_remote_url("upstream", "https://example.com/x.git").is_err());
}

#[test]
fn test_cli_clone_and_set_remote() {
    let git = GitCli::default();
    if !git.is_installed() {
        eprintln!("git not installed; skipping");
        return;
    }

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source");
    fs::create_dir(&source).unwrap();
    let repo = init_repo(&source);
    commit_file(&repo, "lib.rs", "fn main() {}\n", "Add lib");

    let target = dir.path().join("clones").join("copy");
    git.clone(source.to_str().unwrap(), &target, None).unwrap();

    let cloned = GitOps::open(&target).unwrap();
    assert_eq!(cloned.recent_commits(5).unwrap().len(), 2);
    assert!(target.join("lib.rs").exists());
    assert!(git.is_work_tree(&target));

    // Cloning over an existing directory is refused
    assert!(matches!(
        git.clone(source.to_str().unwrap(), &target, None),
        Err(ManagerError::PathExists(_))
    ));

    git.set_remote_url(&target, "origin", "https://github.com/octocat/copy.git")
        .unwrap();
    let reopened = GitOps::open(&target).unwrap();
    assert_eq!(
        reopened.remote_url("origin").unwrap(),
        "https://github.com/octocat/copy.git"
    );
}

#[test]
fn test_cli_failed_clone_leaves_nothing_behind() {
    let git = GitCli::default();
    if !git.is_installed() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("missing-copy");
    let source = dir.path().join("no-such-source");

    assert!(git.clone(source.to_str().unwrap(), &target, None).is_err());
    assert!(!target.exists());
}

#[test]
fn test_cli_clone_timeout_removes_partial_directory() {
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    let git = GitCli::default().with_clone_timeout(Duration::from_secs(1));
    if !git.is_installed() {
        return;
    }

    // Accepts connections and never answers, so the clone hangs
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("stalled");
    let url = format!("http://127.0.0.1:{}/repo.git", port);

    let started = Instant::now();
    let err = git.clone(&url, &target, None).unwrap_err();
    assert!(
        matches!(err, ManagerError::GitTimeout { secs: 1, .. }),
        "expected timeout, got {:?}",
        err
    );
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(!target.exists());
}

#[test]
fn test_cli_set_remote_outside_repository() {
    let git = GitCli::default();
    if !git.is_installed() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("plain");
    fs::create_dir(&plain).unwrap();

    assert!(matches!(
        git.set_remote_url(&plain, "origin", "https://example.com/x.git"),
        Err(ManagerError::RepoNotFound(_))
    ));
}

#[test]
fn test_workspace_rename_keeps_repository() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let old = workspace.path_for("old-name");
    fs::create_dir(&old).unwrap();
    init_repo(&old);

    let new_path = workspace.rename_folder(&old, "new-name").unwrap();
    assert_eq!(new_path, dir.path().join("new-name"));
    assert!(workspace.local_repo("old-name").is_none());
    assert!(GitOps::is_repository(&new_path));
}
