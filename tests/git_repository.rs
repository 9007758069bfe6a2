//! GitRepository against real repositories: discovery, branch state, and
//! the remote gating of push/pull.

mod common;

use common::{git_stdout, init_repo, seed_java_tree};
use std::fs;
use tcr::vcs::{GitRepository, Vcs};

#[test]
fn open_discovers_branch_and_root() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());

    let repo = GitRepository::open(tmp.path()).unwrap();
    assert_eq!(repo.working_branch(), "feature/x");
    assert_eq!(
        repo.root_dir().canonicalize().unwrap(),
        tmp.path().canonicalize().unwrap()
    );
    assert!(!repo.is_push_enabled());
}

#[test]
fn open_from_a_subdirectory_finds_the_enclosing_repository() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());

    let repo = GitRepository::open(&tmp.path().join("src/main")).unwrap();
    assert_eq!(
        repo.root_dir().canonicalize().unwrap(),
        tmp.path().canonicalize().unwrap()
    );
}

#[test]
fn open_outside_any_repository_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let err = GitRepository::open(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("not inside a git repository"));
}

#[test]
fn commit_creates_a_commit_when_the_tree_changed() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    fs::write(tmp.path().join("src/main/Foo.java"), "class Foo { int x; }\n").unwrap();
    common::git(tmp.path(), &["add", "."]);

    let mut repo = GitRepository::open(tmp.path()).unwrap();
    repo.commit(false, &["TCR"]).unwrap();

    assert_eq!(git_stdout(tmp.path(), &["log", "-1", "--format=%s"]), "TCR");
}

#[test]
fn commit_on_a_clean_tree_is_swallowed() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());

    let head = git_stdout(tmp.path(), &["rev-parse", "HEAD"]);
    let mut repo = GitRepository::open(tmp.path()).unwrap();
    repo.commit(false, &["TCR"]).unwrap();
    assert_eq!(git_stdout(tmp.path(), &["rev-parse", "HEAD"]), head);
}

#[test]
fn restore_discards_local_changes_on_one_path() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    let target = tmp.path().join("src/main/Foo.java");
    fs::write(&target, "class Foo { broken }\n").unwrap();

    let mut repo = GitRepository::open(tmp.path()).unwrap();
    repo.restore(&target).unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "class Foo {}\n");
}

#[test]
fn push_and_pull_are_silent_noops_without_a_remote() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());

    let mut repo = GitRepository::open(tmp.path()).unwrap();
    repo.enable_push(true);
    // The flag reflects the last value set even though no remote exists
    assert!(repo.is_push_enabled());
    // No remote named origin: neither call may fail
    repo.push().unwrap();
    repo.pull().unwrap();
    repo.enable_push(false);
    assert!(!repo.is_push_enabled());
}

#[test]
fn diff_round_trips_through_the_parser() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    fs::write(
        tmp.path().join("src/main/Foo.java"),
        "class Foo {\n  int x;\n  int y;\n}\n",
    )
    .unwrap();

    let mut repo = GitRepository::open(tmp.path()).unwrap();
    let diffs = repo.diff().unwrap();
    assert_eq!(diffs.len(), 1);
    let entry = &diffs[0];
    assert!(entry.path.ends_with("src/main/Foo.java"));
    assert!(entry.added_lines > 0);
}

#[test]
fn stash_and_unstash_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    let target = tmp.path().join("src/main/Foo.java");
    fs::write(&target, "class Foo { int stashed; }\n").unwrap();

    let mut repo = GitRepository::open(tmp.path()).unwrap();
    repo.stash("tcr test").unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "class Foo {}\n");
    repo.unstash(false).unwrap();

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "class Foo { int stashed; }\n"
    );
}
