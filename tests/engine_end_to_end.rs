//! Whole-cycle scenarios against a real git repository, with the
//! toolchain faked to force green, red, and broken-build outcomes.

mod common;

use common::{git_stdout, init_repo, seed_java_tree, SilentUi};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tcr::engine::{EngineParts, TcrEngine};
use tcr::errors::TcrError;
use tcr::filesystem::SourceTree;
use tcr::language::{Java, Language};
use tcr::toolchain::{Platform, ToolCommand, Toolchain};
use tcr::vcs::GitRepository;
use tcr::{RunMode, Status};

#[derive(Debug)]
struct ScriptedToolchain {
    build_passes: bool,
    tests_pass: bool,
}

impl Toolchain for ScriptedToolchain {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn build_command(&self) -> ToolCommand {
        unreachable!("scripted toolchain runs nothing")
    }

    fn test_command(&self) -> ToolCommand {
        unreachable!("scripted toolchain runs nothing")
    }

    fn supported_platforms(&self) -> &'static [Platform] {
        &[]
    }

    fn supports(&self, _lang: &dyn Language) -> bool {
        true
    }

    fn run_build(&self) -> Result<(), TcrError> {
        if self.build_passes {
            Ok(())
        } else {
            Err(TcrError::Other("build failed".to_string()))
        }
    }

    fn run_tests(&self) -> Result<(), TcrError> {
        if self.tests_pass {
            Ok(())
        } else {
            Err(TcrError::Other("tests failed".to_string()))
        }
    }
}

fn engine_for(dir: &std::path::Path, build_passes: bool, tests_pass: bool) -> Arc<TcrEngine> {
    TcrEngine::assemble(EngineParts {
        mode: RunMode::OneShot,
        source_tree: SourceTree::attach(dir).unwrap(),
        language: Arc::new(Java),
        toolchain: Arc::new(ScriptedToolchain {
            build_passes,
            tests_pass,
        }),
        vcs: Box::new(GitRepository::open(dir).unwrap()),
        ui: Arc::new(SilentUi),
        polling_period: Duration::from_millis(100),
        mob_turn_duration: Duration::from_secs(300),
    })
}

#[test]
fn green_cycle_commits_the_changes() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    fs::write(
        tmp.path().join("src/main/Foo.java"),
        "class Foo { int green; }\n",
    )
    .unwrap();

    let engine = engine_for(tmp.path(), true, true);
    engine.run_tcr_cycle();

    assert_eq!(git_stdout(tmp.path(), &["log", "-1", "--format=%s"]), "TCR");
    assert_eq!(engine.status(), Status::Ok);
    // Committed content survives in the work tree
    assert_eq!(
        fs::read_to_string(tmp.path().join("src/main/Foo.java")).unwrap(),
        "class Foo { int green; }\n"
    );
}

#[test]
fn red_cycle_reverts_sources_but_keeps_tests() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    let head = git_stdout(tmp.path(), &["rev-parse", "HEAD"]);
    fs::write(
        tmp.path().join("src/main/Foo.java"),
        "class Foo { int broken; }\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("src/test/FooTest.java"),
        "class FooTest { void added() {} }\n",
    )
    .unwrap();

    let engine = engine_for(tmp.path(), true, false);
    engine.run_tcr_cycle();

    // Production source restored, test change preserved, no new commit
    assert_eq!(
        fs::read_to_string(tmp.path().join("src/main/Foo.java")).unwrap(),
        "class Foo {}\n"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("src/test/FooTest.java")).unwrap(),
        "class FooTest { void added() {} }\n"
    );
    assert_eq!(git_stdout(tmp.path(), &["rev-parse", "HEAD"]), head);
    assert_eq!(engine.status(), Status::TestFailed);
}

#[test]
fn broken_build_discards_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    let head = git_stdout(tmp.path(), &["rev-parse", "HEAD"]);
    fs::write(
        tmp.path().join("src/main/Foo.java"),
        "class Foo { not yet compiling }\n",
    )
    .unwrap();

    let engine = engine_for(tmp.path(), false, false);
    engine.run_tcr_cycle();

    // Work in progress stays in place; no commit, no revert
    assert_eq!(
        fs::read_to_string(tmp.path().join("src/main/Foo.java")).unwrap(),
        "class Foo { not yet compiling }\n"
    );
    assert_eq!(git_stdout(tmp.path(), &["rev-parse", "HEAD"]), head);
    assert_eq!(engine.status(), Status::BuildFailed);
}

#[test]
fn cycles_append_to_the_event_log() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(tmp.path());
    seed_java_tree(tmp.path());
    fs::write(
        tmp.path().join("src/main/Foo.java"),
        "class Foo { int first; }\n",
    )
    .unwrap();

    let engine = engine_for(tmp.path(), true, true);
    engine.run_tcr_cycle();
    engine.run_tcr_cycle();

    let log = fs::read_to_string(
        tcr::events::event_log_dir(engine.base_dir()).join(tcr::events::EVENT_LOG_FILE_NAME),
    )
    .unwrap();
    let rows: Vec<&str> = log.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ends_with(",true,true"), "row: {}", rows[0]);
}
