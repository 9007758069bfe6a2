//! Git adapter: every version-control operation the engine needs, shelled
//! out to the `git` binary found on PATH.
//!
//! The subprocess invocation goes through a single replaceable seam
//! (`runner`), so tests exercise the exact argument vectors without a real
//! repository. Traced commands forward their output to the report bus.

use crate::errors::{Result, TcrError};
use crate::report;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_REMOTE_NAME: &str = "origin";
pub const DEFAULT_COMMIT_MESSAGE: &str = "TCR";

/// Outcome of one git invocation: whether it exited zero, plus combined
/// stdout/stderr text.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub text: String,
}

type GitRunner = Box<dyn FnMut(&[String]) -> std::io::Result<GitOutput> + Send>;

/// One file's change summary from `git diff --numstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub added_lines: usize,
    pub removed_lines: usize,
}

/// Operations the engine requires from a version control system.
pub trait Vcs: Send {
    fn working_branch(&self) -> &str;
    fn commit(&mut self, amend: bool, messages: &[&str]) -> Result<()>;
    fn restore(&mut self, path: &Path) -> Result<()>;
    fn revert_head(&mut self) -> Result<()>;
    fn push(&mut self) -> Result<()>;
    fn pull(&mut self) -> Result<()>;
    fn diff(&mut self) -> Result<Vec<FileDiff>>;
    /// Zero-context unified patch of the changes under the given paths,
    /// against HEAD. Empty paths mean the whole tree.
    fn diff_patch(&mut self, paths: &[&Path]) -> Result<String>;
    fn add(&mut self, paths: &[&Path]) -> Result<()>;
    fn stash(&mut self, message: &str) -> Result<()>;
    fn unstash(&mut self, keep: bool) -> Result<()>;
    fn enable_push(&mut self, flag: bool);
    fn is_push_enabled(&self) -> bool;
}

pub struct GitRepository {
    base_dir: PathBuf,
    root_dir: PathBuf,
    remote_name: String,
    working_branch: String,
    working_branch_exists_on_remote: bool,
    commit_message: String,
    push_enabled: bool,
    remote_enabled: bool,
    runner: GitRunner,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("base_dir", &self.base_dir)
            .field("root_dir", &self.root_dir)
            .field("remote_name", &self.remote_name)
            .field("working_branch", &self.working_branch)
            .field(
                "working_branch_exists_on_remote",
                &self.working_branch_exists_on_remote,
            )
            .field("commit_message", &self.commit_message)
            .field("push_enabled", &self.push_enabled)
            .field("remote_enabled", &self.remote_enabled)
            .finish_non_exhaustive()
    }
}

/// Run git in a given directory and capture trimmed stdout, failing on
/// non-zero exit. Used during discovery, before the adapter exists.
fn git_capture(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| TcrError::Git(format!("cannot run git: {e}")))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(TcrError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// The real runner pins the repository directory with `git -C`; the seam
/// still sees the logical argument vectors without that prefix.
fn default_runner(dir: PathBuf) -> GitRunner {
    Box::new(move |args: &[String]| {
        let output = Command::new("git").arg("-C").arg(&dir).args(args).output()?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(GitOutput {
            success: output.status.success(),
            text,
        })
    })
}

impl GitRepository {
    /// Open the repository enclosing `base_dir`: record the repository
    /// root, the current branch, and whether that branch is known on the
    /// remote. Fails when `base_dir` is not inside any repository.
    pub fn open(base_dir: &Path) -> Result<GitRepository> {
        let root = git_capture(base_dir, &["rev-parse", "--show-toplevel"]).map_err(|_| {
            TcrError::Git(format!(
                "{} is not inside a git repository",
                base_dir.display()
            ))
        })?;
        let branch = git_capture(base_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let remote_enabled = git_capture(base_dir, &["remote"])
            .map(|out| out.lines().any(|l| l.trim() == DEFAULT_REMOTE_NAME))
            .unwrap_or(false);
        let on_remote = remote_enabled
            && git_capture(base_dir, &["branch", "--remotes", "--format=%(refname:short)"])
                .map(|out| {
                    let wanted = format!("{DEFAULT_REMOTE_NAME}/{branch}");
                    out.lines().any(|l| l.trim() == wanted)
                })
                .unwrap_or(false);

        Ok(GitRepository {
            base_dir: base_dir.to_path_buf(),
            root_dir: PathBuf::from(root),
            remote_name: DEFAULT_REMOTE_NAME.to_string(),
            working_branch: branch,
            working_branch_exists_on_remote: on_remote,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            push_enabled: false,
            remote_enabled,
            runner: default_runner(base_dir.to_path_buf()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_git(&mut self, args: &[&str]) -> std::io::Result<GitOutput> {
        let owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        (self.runner)(&owned)
    }

    /// Run a git command, forward its output to the report bus, and turn a
    /// non-zero exit into an error.
    fn trace_git(&mut self, args: &[&str]) -> Result<()> {
        match self.run_git(args) {
            Ok(out) => {
                if !out.text.trim().is_empty() {
                    report::post_text(out.text.trim_end());
                }
                if out.success {
                    Ok(())
                } else {
                    Err(TcrError::Git(format!("git {} failed", args[0])))
                }
            }
            Err(e) => Err(TcrError::Git(format!("cannot run git: {e}"))),
        }
    }

    /// Whether HEAD differs from the work tree. Used to skip pointless
    /// commit attempts after a revert.
    fn has_changes(&mut self) -> bool {
        match self.run_git(&["diff", "--exit-code", "--quiet", "HEAD"]) {
            Ok(out) => !out.success,
            Err(_) => true,
        }
    }
}

impl Vcs for GitRepository {
    fn working_branch(&self) -> &str {
        &self.working_branch
    }

    /// Commit staged and tracked changes, falling back to the configured
    /// message template when none is given. Subprocess failure is
    /// swallowed: "nothing to commit" is a legitimate state right after a
    /// revert. The empty-diff probe skips the invocation in the common
    /// case.
    fn commit(&mut self, amend: bool, messages: &[&str]) -> Result<()> {
        if !amend && !self.has_changes() {
            return Ok(());
        }
        let template = self.commit_message.clone();
        let mut args = vec!["commit", "--no-gpg-sign"];
        if amend {
            args.push("--amend");
        }
        if messages.is_empty() {
            args.push("-m");
            args.push(&template);
        } else {
            for m in messages {
                args.push("-m");
                args.push(m);
            }
        }
        let _ = self.trace_git(&args);
        Ok(())
    }

    fn restore(&mut self, path: &Path) -> Result<()> {
        report::post_warning(format!("Reverting {}", path.display()));
        let path = path.display().to_string();
        self.trace_git(&["checkout", "HEAD", "--", &path])
    }

    fn revert_head(&mut self) -> Result<()> {
        self.trace_git(&["revert", "--no-gpg-sign", "--no-edit", "HEAD"])
    }

    fn push(&mut self) -> Result<()> {
        if !self.push_enabled || !self.remote_enabled {
            return Ok(());
        }
        report::post_info(format!(
            "Pushing changes to {}/{}",
            self.remote_name, self.working_branch
        ));
        let remote = self.remote_name.clone();
        let branch = self.working_branch.clone();
        self.trace_git(&["push", "--no-recurse-submodules", &remote, &branch])?;
        self.working_branch_exists_on_remote = true;
        Ok(())
    }

    fn pull(&mut self) -> Result<()> {
        if !self.working_branch_exists_on_remote {
            report::post_info(format!("Working locally on branch {}", self.working_branch));
            return Ok(());
        }
        report::post_info(format!(
            "Pulling latest changes from {}/{}",
            self.remote_name, self.working_branch
        ));
        let remote = self.remote_name.clone();
        let branch = self.working_branch.clone();
        self.trace_git(&["pull", "--no-recurse-submodules", &remote, &branch])
    }

    /// Per-file added/removed line counts against HEAD. Lines that do not
    /// start with two integers are skipped (CRLF warnings and similar
    /// noise show up in the stream).
    fn diff(&mut self) -> Result<Vec<FileDiff>> {
        let out = self
            .run_git(&[
                "diff",
                "--numstat",
                "--ignore-cr-at-eol",
                "--ignore-all-space",
                "--ignore-blank-lines",
                "HEAD",
            ])
            .map_err(|e| TcrError::Git(format!("cannot run git: {e}")))?;
        if !out.success {
            return Err(TcrError::Git("git diff failed".to_string()));
        }
        let mut diffs = Vec::new();
        for line in out.text.lines() {
            let mut fields = line.split_whitespace();
            let added = fields.next().and_then(|f| f.parse::<usize>().ok());
            let removed = fields.next().and_then(|f| f.parse::<usize>().ok());
            let path = fields.next();
            if let (Some(added), Some(removed), Some(path)) = (added, removed, path) {
                diffs.push(FileDiff {
                    path: self.root_dir.join(path),
                    added_lines: added,
                    removed_lines: removed,
                });
            }
        }
        Ok(diffs)
    }

    fn diff_patch(&mut self, paths: &[&Path]) -> Result<String> {
        let mut args: Vec<String> = ["diff", "--unified=0", "HEAD", "--"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(paths.iter().map(|p| p.display().to_string()));
        let out = (self.runner)(&args).map_err(|e| TcrError::Git(format!("cannot run git: {e}")))?;
        if out.success {
            Ok(out.text)
        } else {
            Err(TcrError::Git("git diff failed".to_string()))
        }
    }

    fn add(&mut self, paths: &[&Path]) -> Result<()> {
        let mut args = vec!["add".to_string()];
        if paths.is_empty() {
            args.push(".".to_string());
        } else {
            args.extend(paths.iter().map(|p| p.display().to_string()));
        }
        let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        self.trace_git(&refs)
    }

    fn stash(&mut self, message: &str) -> Result<()> {
        self.trace_git(&[
            "stash",
            "push",
            "--quiet",
            "--include-untracked",
            "--message",
            message,
        ])
    }

    fn unstash(&mut self, keep: bool) -> Result<()> {
        let action = if keep { "apply" } else { "pop" };
        self.trace_git(&["stash", action, "--quiet"])
    }

    fn enable_push(&mut self, flag: bool) {
        if self.push_enabled == flag {
            return;
        }
        self.push_enabled = flag;
        let state = if flag { "on" } else { "off" };
        report::post_info(format!("Git auto-push is turned {state}"));
    }

    fn is_push_enabled(&self) -> bool {
        self.push_enabled
    }
}
