//! Supported languages: directory layout, file classification and defaults.
//!
//! A language tells the engine where production and test code live, which
//! files belong to it (the watcher's filename matcher), and which toolchain
//! builds it by default. The revert step relies on the split between source
//! and test directories: only production files are restored.

use crate::errors::{Result, TcrError};
use std::fs;
use std::path::{Path, PathBuf};

pub trait Language: Send + Sync {
    fn name(&self) -> &'static str;

    /// Toolchain used when none is requested explicitly.
    fn default_toolchain(&self) -> &'static str;

    /// Production code directories, relative to the base dir.
    fn src_dirs(&self) -> &'static [&'static str];

    /// Test code directories, relative to the base dir.
    fn test_dirs(&self) -> &'static [&'static str];

    /// Whether a filename belongs to this language (by extension).
    fn matches_extension(&self, filename: &Path) -> bool;

    /// Substring marking a test case definition, used for diff heuristics.
    fn test_case_marker(&self) -> &'static str;
}

pub struct Java;

impl Language for Java {
    fn name(&self) -> &'static str {
        "java"
    }

    fn default_toolchain(&self) -> &'static str {
        "gradle"
    }

    fn src_dirs(&self) -> &'static [&'static str] {
        &["src/main"]
    }

    fn test_dirs(&self) -> &'static [&'static str] {
        &["src/test"]
    }

    fn matches_extension(&self, filename: &Path) -> bool {
        has_extension(filename, &["java"])
    }

    fn test_case_marker(&self) -> &'static str {
        "@Test"
    }
}

pub struct Cpp;

impl Language for Cpp {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn default_toolchain(&self) -> &'static str {
        "cmake"
    }

    fn src_dirs(&self) -> &'static [&'static str] {
        &["src", "include"]
    }

    fn test_dirs(&self) -> &'static [&'static str] {
        &["test"]
    }

    fn matches_extension(&self, filename: &Path) -> bool {
        has_extension(filename, &["c", "cc", "cpp", "cxx", "h", "hh", "hpp"])
    }

    fn test_case_marker(&self) -> &'static str {
        "TEST("
    }
}

fn has_extension(filename: &Path, extensions: &[&str]) -> bool {
    filename
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|x| *x == e)
        })
        .unwrap_or(false)
}

fn known_languages() -> Vec<Box<dyn Language>> {
    vec![Box::new(Java), Box::new(Cpp)]
}

/// Look up a language by its name.
pub fn language_named(name: &str) -> Result<Box<dyn Language>> {
    known_languages()
        .into_iter()
        .find(|l| l.name() == name.trim().to_ascii_lowercase())
        .ok_or_else(|| TcrError::Config(format!("language \"{name}\" is not supported")))
}

/// Detect the language from the base directory name (kata layout: the tree
/// for each language lives in a directory named after it, e.g. `…/java`).
pub fn detect_language(base_dir: &Path) -> Result<Box<dyn Language>> {
    let dir_name = base_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    known_languages()
        .into_iter()
        .find(|l| l.name() == dir_name)
        .ok_or_else(|| {
            TcrError::Config(format!(
                "unable to detect language from directory \"{}\"",
                base_dir.display()
            ))
        })
}

/// Directories the watcher observes for a language: src and test trees,
/// joined to the base dir.
pub fn dirs_to_watch(base_dir: &Path, lang: &dyn Language) -> Vec<PathBuf> {
    lang.src_dirs()
        .iter()
        .chain(lang.test_dirs().iter())
        .map(|d| base_dir.join(d))
        .collect()
}

/// Enumerate every production source file of the language under the base
/// dir, as absolute paths. Test files are excluded by construction.
pub fn all_src_files(base_dir: &Path, lang: &dyn Language) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in lang.src_dirs() {
        let root = base_dir.join(dir);
        if root.is_dir() {
            collect_matching(&root, lang, &mut files)?;
        }
    }
    files.sort();
    Ok(files)
}

fn collect_matching(dir: &Path, lang: &dyn Language, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .map_err(|e| TcrError::Other(format!("cannot list {}: {e}", dir.display())))?
    {
        let entry = entry.map_err(|e| TcrError::Other(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_matching(&path, lang, out)?;
        } else if lang.matches_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Whether a path (relative to the repo root or absolute under it) lies in
/// one of the language's production directories.
pub fn is_src_path(base_dir: &Path, lang: &dyn Language, path: &Path) -> bool {
    in_any_dir(base_dir, lang.src_dirs(), path) && lang.matches_extension(path)
}

/// Whether a path lies in one of the language's test directories.
pub fn is_test_path(base_dir: &Path, lang: &dyn Language, path: &Path) -> bool {
    in_any_dir(base_dir, lang.test_dirs(), path) && lang.matches_extension(path)
}

fn in_any_dir(base_dir: &Path, dirs: &[&str], path: &Path) -> bool {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    dirs.iter().any(|d| relative.starts_with(d))
}
