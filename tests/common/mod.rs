use std::path::Path;
use std::process::Command;
use tcr::engine::SessionInfo;
use tcr::ui::UserInterface;
use tcr::{Role, RunMode};

/// UI stub for engine tests: answers confirms with their default and
/// renders nothing.
#[allow(dead_code)]
pub struct SilentUi;

impl UserInterface for SilentUi {
    fn start(&self) {}
    fn show_running_mode(&self, _mode: RunMode) {}
    fn notify_role_starting(&self, _role: Role) {}
    fn notify_role_ending(&self, _role: Role) {}
    fn show_session_info(&self, _info: &SessionInfo) {}
    fn confirm(&self, _message: &str, default_answer: bool) -> bool {
        default_answer
    }
    fn start_reporting(&self) {}
    fn stop_reporting(&self) {}
    fn mute_desktop_notifications(&self, _muted: bool) {}
}

/// Run git in `dir`, panicking on failure. Test setup only.
pub fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("git not runnable");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// Capture trimmed stdout of a git command in `dir`.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("git not runnable");
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initialise a repository on a feature branch with an identity suitable
/// for committing in tests.
pub fn init_repo(dir: &Path) {
    git(dir, &["init", "-q", "-b", "feature/x"]);
    git(dir, &["config", "user.name", "tcr-tests"]);
    git(dir, &["config", "user.email", "tcr-tests@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Lay out a minimal java kata tree and commit it.
pub fn seed_java_tree(dir: &Path) {
    std::fs::create_dir_all(dir.join("src/main")).unwrap();
    std::fs::create_dir_all(dir.join("src/test")).unwrap();
    std::fs::write(dir.join("src/main/Foo.java"), "class Foo {}\n").unwrap();
    std::fs::write(
        dir.join("src/test/FooTest.java"),
        "class FooTest {}\n",
    )
    .unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "--no-gpg-sign", "-m", "initial"]);
}
