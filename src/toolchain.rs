//! Build/test toolchains invoked as opaque subprocess commands.
//!
//! A toolchain is a pair of fixed command vectors (build, test) run from
//! the source tree base directory. Exit status is the only verdict: zero
//! passes, anything else fails. Subprocess output is forwarded to the
//! report bus rather than printed directly.

use crate::errors::{Result, TcrError};
use crate::language::Language;
use crate::report;
use std::path::PathBuf;
use std::process::Command;
use which::which;

/// An {os, arch} pair a toolchain is known to run on. Vocabulary follows
/// `std::env::consts::{OS, ARCH}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

const DESKTOP_PLATFORMS: &[Platform] = &[
    Platform { os: "linux", arch: "x86_64" },
    Platform { os: "linux", arch: "aarch64" },
    Platform { os: "macos", arch: "x86_64" },
    Platform { os: "macos", arch: "aarch64" },
    Platform { os: "windows", arch: "x86_64" },
    Platform { os: "windows", arch: "aarch64" },
];

/// A concrete command invocation: program plus fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

pub trait Toolchain: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn build_command(&self) -> ToolCommand;

    fn test_command(&self) -> ToolCommand;

    fn supported_platforms(&self) -> &'static [Platform];

    /// Whether this toolchain can build the given language.
    fn supports(&self, lang: &dyn Language) -> bool;

    fn supports_platform(&self, os: &str, arch: &str) -> bool {
        self.supported_platforms()
            .iter()
            .any(|p| p.os == os && p.arch == arch)
    }

    fn run_build(&self) -> Result<()> {
        run_tool_command(&self.build_command())
    }

    fn run_tests(&self) -> Result<()> {
        run_tool_command(&self.test_command())
    }
}

#[derive(Debug)]
pub struct Gradle;

impl Toolchain for Gradle {
    fn name(&self) -> &'static str {
        "gradle"
    }

    fn build_command(&self) -> ToolCommand {
        ToolCommand::new(wrapper_name("gradlew"), &["build", "-x", "test"])
    }

    fn test_command(&self) -> ToolCommand {
        ToolCommand::new(wrapper_name("gradlew"), &["test"])
    }

    fn supported_platforms(&self) -> &'static [Platform] {
        DESKTOP_PLATFORMS
    }

    fn supports(&self, lang: &dyn Language) -> bool {
        lang.name() == "java"
    }
}

#[derive(Debug)]
pub struct Maven;

impl Toolchain for Maven {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn build_command(&self) -> ToolCommand {
        ToolCommand::new(wrapper_name("mvnw"), &["test-compile"])
    }

    fn test_command(&self) -> ToolCommand {
        ToolCommand::new(wrapper_name("mvnw"), &["test"])
    }

    fn supported_platforms(&self) -> &'static [Platform] {
        DESKTOP_PLATFORMS
    }

    fn supports(&self, lang: &dyn Language) -> bool {
        lang.name() == "java"
    }
}

#[derive(Debug)]
pub struct Cmake;

impl Toolchain for Cmake {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn build_command(&self) -> ToolCommand {
        ToolCommand::new("cmake", &["--build", ".", "--config", "Debug"])
    }

    fn test_command(&self) -> ToolCommand {
        ToolCommand::new("ctest", &["-C", "Debug", "--output-on-failure"])
    }

    fn supported_platforms(&self) -> &'static [Platform] {
        DESKTOP_PLATFORMS
    }

    fn supports(&self, lang: &dyn Language) -> bool {
        lang.name() == "cpp"
    }
}

#[cfg(windows)]
fn wrapper_name(base: &str) -> &str {
    match base {
        "gradlew" => "gradlew.bat",
        "mvnw" => "mvnw.cmd",
        _ => base,
    }
}

#[cfg(not(windows))]
fn wrapper_name(base: &str) -> &str {
    base
}

fn known_toolchains() -> Vec<Box<dyn Toolchain>> {
    vec![Box::new(Gradle), Box::new(Maven), Box::new(Cmake)]
}

/// Pick a toolchain by explicit name, or the language default when the
/// name is empty; verify it can build the language.
pub fn new_toolchain(name: &str, lang: &dyn Language) -> Result<Box<dyn Toolchain>> {
    let wanted = if name.trim().is_empty() {
        lang.default_toolchain().to_string()
    } else {
        name.trim().to_ascii_lowercase()
    };
    let toolchain = known_toolchains()
        .into_iter()
        .find(|t| t.name() == wanted)
        .ok_or_else(|| TcrError::Config(format!("toolchain \"{wanted}\" is not supported")))?;
    if !toolchain.supports(lang) {
        return Err(TcrError::Config(format!(
            "{} toolchain does not support {} language",
            toolchain.name(),
            lang.name()
        )));
    }
    Ok(toolchain)
}

/// Resolve the command's program: wrapper scripts live in the working
/// directory, everything else is searched on PATH.
fn resolve_program(program: &str) -> PathBuf {
    let local = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(program);
    if local.is_file() {
        return local;
    }
    which(program).unwrap_or_else(|_| PathBuf::from(program))
}

/// Run a tool command to completion, forwarding its output to the report
/// bus. Non-zero exit is the failure condition; stderr is not interpreted.
pub fn run_tool_command(cmd: &ToolCommand) -> Result<()> {
    let program = resolve_program(&cmd.program);
    let output = Command::new(&program)
        .args(&cmd.args)
        .output()
        .map_err(|e| TcrError::Other(format!("cannot run {}: {e}", program.display())))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        report::post_text(stdout.trim_end());
    }
    if output.status.success() {
        Ok(())
    } else {
        Err(TcrError::Other(format!(
            "{} exited with {}",
            cmd.program, output.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Cpp, Java};

    #[test]
    fn gradle_command_vectors() {
        assert_eq!(
            Gradle.build_command(),
            ToolCommand::new("gradlew", &["build", "-x", "test"])
        );
        assert_eq!(Gradle.test_command(), ToolCommand::new("gradlew", &["test"]));
    }

    #[test]
    fn maven_command_vectors() {
        assert_eq!(Maven.build_command(), ToolCommand::new("mvnw", &["test-compile"]));
        assert_eq!(Maven.test_command(), ToolCommand::new("mvnw", &["test"]));
    }

    #[test]
    fn cmake_command_vectors() {
        assert_eq!(
            Cmake.build_command(),
            ToolCommand::new("cmake", &["--build", ".", "--config", "Debug"])
        );
        assert_eq!(
            Cmake.test_command(),
            ToolCommand::new("ctest", &["-C", "Debug", "--output-on-failure"])
        );
    }

    #[test]
    fn default_toolchain_per_language() {
        assert_eq!(new_toolchain("", &Java).unwrap().name(), "gradle");
        assert_eq!(new_toolchain("", &Cpp).unwrap().name(), "cmake");
    }

    #[test]
    fn explicit_toolchain_selection() {
        assert_eq!(new_toolchain("maven", &Java).unwrap().name(), "maven");
        assert_eq!(new_toolchain(" GRADLE ", &Java).unwrap().name(), "gradle");
    }

    #[test]
    fn unknown_toolchain_is_a_config_error() {
        let err = new_toolchain("bazel", &Java).unwrap_err();
        assert!(err.to_string().contains("bazel"));
    }

    #[test]
    fn incompatible_toolchain_is_a_config_error() {
        let err = new_toolchain("cmake", &Java).unwrap_err();
        assert!(err.to_string().contains("does not support"));
    }

    #[test]
    fn platform_table_lookup() {
        assert!(Gradle.supports_platform("linux", "x86_64"));
        assert!(Cmake.supports_platform("macos", "aarch64"));
        assert!(!Maven.supports_platform("plan9", "mips"));
    }

    #[cfg(unix)]
    #[test]
    fn run_tool_command_classifies_exit_status() {
        assert!(run_tool_command(&ToolCommand::new("true", &[])).is_ok());
        assert!(run_tool_command(&ToolCommand::new("false", &[])).is_err());
        assert!(run_tool_command(&ToolCommand::new("definitely-not-a-binary", &[])).is_err());
    }
}
