//! Source tree handle and filesystem change watcher.
//!
//! `watch` registers every matching regular file under the requested
//! directories and blocks until the first of: a change on a registered
//! file (true), a watcher error (false), or a value on the interrupt
//! channel (false). One verdict per call; coalescing is the caller's
//! concern. The OS watcher is released on every exit path by scope.

use crate::errors::{Result, TcrError};
use crate::report;
use notify::{RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// How often the watch loop looks at the interrupt channel while no
/// filesystem event arrives.
const INTERRUPT_POLL_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct SourceTree {
    base_dir: PathBuf,
}

impl SourceTree {
    /// Open the source tree rooted at `dir` (current directory when
    /// empty). Changes the process working directory to it, once, and
    /// records the resolved absolute path.
    pub fn open(dir: &Path) -> Result<SourceTree> {
        if !dir.as_os_str().is_empty() {
            if !dir.exists() {
                return Err(TcrError::Config(format!(
                    "directory {} does not exist",
                    dir.display()
                )));
            }
            if !dir.is_dir() {
                return Err(TcrError::Config(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
            std::env::set_current_dir(dir).map_err(|e| {
                TcrError::Config(format!(
                    "failed to change directory to {}: {e}",
                    dir.display()
                ))
            })?;
        }
        let base_dir = std::env::current_dir()
            .map_err(|e| TcrError::Config(format!("cannot resolve working directory: {e}")))?;
        Ok(SourceTree { base_dir })
    }

    /// Like [`SourceTree::open`], but without touching the process working
    /// directory. For embedding scenarios where the caller controls cwd.
    pub fn attach(dir: &Path) -> Result<SourceTree> {
        if !dir.is_dir() {
            return Err(TcrError::Config(format!(
                "directory {} does not exist",
                dir.display()
            )));
        }
        let base_dir = dir
            .canonicalize()
            .map_err(|e| TcrError::Config(format!("cannot resolve {}: {e}", dir.display())))?;
        Ok(SourceTree { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Watch for a change on any matching file under `dirs`. Returns true
    /// when a change was seen, false on watcher error or interruption.
    ///
    /// Files appearing under the directories after this call starts are
    /// not registered; they are picked up by the next invocation.
    pub fn watch(
        &self,
        dirs: &[PathBuf],
        matcher: &dyn Fn(&Path) -> bool,
        interrupt: &Receiver<bool>,
    ) -> bool {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                let _ = tx.send(res);
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                report::post_error(format!("cannot create filesystem watcher: {e}"));
                return false;
            }
        };

        for dir in dirs {
            report::post_text(format!("- Watching {}", dir.display()));
            if let Err(e) = register_matching_files(&mut watcher, dir, matcher) {
                report::post_warning(format!("while watching {}: {e}", dir.display()));
            }
        }

        loop {
            match rx.recv_timeout(INTERRUPT_POLL_PERIOD) {
                Ok(Ok(event)) => {
                    if let Some(path) = event.paths.first() {
                        report::post_text(format!("-> {}", path.display()));
                    }
                    return true;
                }
                Ok(Err(e)) => {
                    report::post_warning(format!("watcher error: {e}"));
                    return false;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if interrupt.try_recv().is_ok() {
                        return false;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

/// Walk a directory tree and register every regular file whose path
/// satisfies the matcher. Directories themselves are not registered.
fn register_matching_files(
    watcher: &mut dyn Watcher,
    dir: &Path,
    matcher: &dyn Fn(&Path) -> bool,
) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| TcrError::Other(e.to_string()))? {
        let entry = entry.map_err(|e| TcrError::Other(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            register_matching_files(watcher, &path, matcher)?;
        } else if matcher(&path) {
            watcher
                .watch(&path, RecursiveMode::NonRecursive)
                .map_err(|e| TcrError::Other(format!("watch {}: {e}", path.display())))?;
        }
    }
    Ok(())
}
