//! The TCR engine: wires source tree, language, toolchain and VCS
//! together, owns the role workers, and runs the build → test →
//! (commit | revert) cycle.

pub mod supervisor;

use crate::errors::{Result, TcrError};
use crate::events::{self, TcrEvent};
use crate::filesystem::SourceTree;
use crate::language::{self, Language};
use crate::params::Params;
use crate::report;
use crate::role::Role;
use crate::runmode::RunMode;
use crate::status::Status;
use crate::timer::{self, InactivityTeaser, PeriodicReminder};
use crate::toolchain::{self, Toolchain};
use crate::ui::UserInterface;
use crate::vcs::{GitRepository, Vcs, DEFAULT_COMMIT_MESSAGE};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use supervisor::RoleWorker;
use tracing::debug;

const ROOT_BRANCHES: &[&str] = &["main", "master"];
const INACTIVITY_TEASER_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const INACTIVITY_TEASER_TICK: Duration = Duration::from_secs(60);

/// Snapshot of the current session, produced on demand for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub base_dir: PathBuf,
    pub language_name: String,
    pub toolchain_name: String,
    pub auto_push: bool,
    pub branch: String,
}

/// Everything an engine is assembled from. [`TcrEngine::init`] builds the
/// standard wiring; embedders and tests fill this in themselves.
pub struct EngineParts {
    pub mode: RunMode,
    pub source_tree: SourceTree,
    pub language: Arc<dyn Language>,
    pub toolchain: Arc<dyn Toolchain>,
    pub vcs: Box<dyn Vcs>,
    pub ui: Arc<dyn UserInterface>,
    pub polling_period: Duration,
    pub mob_turn_duration: Duration,
}

pub struct TcrEngine {
    mode: RunMode,
    source_tree: SourceTree,
    language: Arc<dyn Language>,
    toolchain: Arc<dyn Toolchain>,
    vcs: Mutex<Box<dyn Vcs>>,
    ui: Arc<dyn UserInterface>,
    polling_period: Duration,
    mob_turn_duration: Duration,
    status: Mutex<Status>,
    current_role: Mutex<Option<Role>>,
    worker: Mutex<Option<RoleWorker>>,
    mob_timer: Mutex<Option<Arc<PeriodicReminder>>>,
    teaser: InactivityTeaser,
}

impl std::fmt::Debug for TcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcrEngine")
            .field("mode", &self.mode)
            .field("polling_period", &self.polling_period)
            .field("mob_turn_duration", &self.mob_turn_duration)
            .finish_non_exhaustive()
    }
}

impl TcrEngine {
    /// Standard engine wiring from run parameters. Changes the process
    /// working directory to the source tree base. Returns `None` when the
    /// user declines to run on a root branch: a clean exit, not an error.
    pub fn init(ui: Arc<dyn UserInterface>, params: Params) -> Result<Option<Arc<TcrEngine>>> {
        report::post_info(format!(
            "Starting TCR version {}...",
            env!("CARGO_PKG_VERSION")
        ));
        let source_tree = SourceTree::open(&params.base_dir)?;
        report::post_info(format!(
            "Working directory is {}",
            source_tree.base_dir().display()
        ));
        let language: Arc<dyn Language> = if params.language.trim().is_empty() {
            Arc::from(language::detect_language(source_tree.base_dir())?)
        } else {
            Arc::from(language::language_named(&params.language)?)
        };
        let toolchain: Arc<dyn Toolchain> =
            Arc::from(toolchain::new_toolchain(&params.toolchain, language.as_ref())?);
        let mut repo = GitRepository::open(source_tree.base_dir())?;
        repo.enable_push(params.auto_push);
        if params.mode.needs_countdown_timer() {
            report::post_info(format!(
                "Mob timer duration is {}",
                timer::format_duration(params.mob_turn_duration)
            ));
        }

        let engine = TcrEngine::assemble(EngineParts {
            mode: params.mode,
            source_tree,
            language,
            toolchain,
            vcs: Box::new(repo),
            ui,
            polling_period: params.polling_period,
            mob_turn_duration: params.mob_turn_duration,
        });
        engine.ui.show_running_mode(engine.mode);
        engine.ui.show_session_info(&engine.session_info());
        if !engine.confirm_root_branch() {
            return Ok(None);
        }
        Ok(Some(engine))
    }

    pub fn assemble(parts: EngineParts) -> Arc<TcrEngine> {
        Arc::new(TcrEngine {
            mode: parts.mode,
            source_tree: parts.source_tree,
            language: parts.language,
            toolchain: parts.toolchain,
            vcs: Mutex::new(parts.vcs),
            ui: parts.ui,
            polling_period: parts.polling_period,
            mob_turn_duration: parts.mob_turn_duration,
            status: Mutex::new(Status::Ok),
            current_role: Mutex::new(None),
            worker: Mutex::new(None),
            mob_timer: Mutex::new(None),
            teaser: InactivityTeaser::new(INACTIVITY_TEASER_TIMEOUT, INACTIVITY_TEASER_TICK),
        })
    }

    /// Running TCR on a root branch needs an explicit go-ahead in
    /// interactive modes; non-interactive modes only get a warning.
    fn confirm_root_branch(&self) -> bool {
        let branch = self.vcs.lock().expect("vcs lock poisoned").working_branch().to_string();
        if !ROOT_BRANCHES.contains(&branch.as_str()) {
            return true;
        }
        let message = format!("Running TCR on branch \"{branch}\" is not recommended");
        if self.mode.is_interactive() {
            self.ui.confirm(&message, false)
        } else {
            report::post_warning(message);
            true
        }
    }

    pub fn base_dir(&self) -> &Path {
        self.source_tree.base_dir()
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn session_info(&self) -> SessionInfo {
        let vcs = self.vcs.lock().expect("vcs lock poisoned");
        SessionInfo {
            base_dir: self.base_dir().to_path_buf(),
            language_name: self.language.name().to_string(),
            toolchain_name: self.toolchain.name().to_string(),
            auto_push: vcs.is_push_enabled(),
            branch: vcs.working_branch().to_string(),
        }
    }

    pub fn current_role(&self) -> Option<Role> {
        *self.current_role.lock().expect("role lock poisoned")
    }

    pub fn toggle_auto_push(&self) {
        let mut vcs = self.vcs.lock().expect("vcs lock poisoned");
        let enabled = vcs.is_push_enabled();
        vcs.enable_push(!enabled);
    }

    pub fn set_auto_push(&self, enabled: bool) {
        self.vcs.lock().expect("vcs lock poisoned").enable_push(enabled);
    }

    /// Start the driver loop: pull, then run one TCR cycle per observed
    /// source change until stopped. Runs the mob countdown when the mode
    /// asks for one.
    pub fn run_as_driver(self: &Arc<Self>) {
        let countdown = timer::mob_turn_countdown(self.mode, self.mob_turn_duration);
        *self.mob_timer.lock().expect("timer lock poisoned") = countdown.clone();

        let birth = {
            let engine = Arc::clone(self);
            move || {
                *engine.current_role.lock().expect("role lock poisoned") = Some(Role::Driver);
                engine.ui.notify_role_starting(Role::Driver);
                let pulled = engine.vcs.lock().expect("vcs lock poisoned").pull();
                if let Err(e) = pulled {
                    engine.record(e);
                }
                if let Some(timer) = &countdown {
                    timer.start();
                }
            }
        };
        let daily_life = {
            let engine = Arc::clone(self);
            move |interrupt: &Receiver<bool>| {
                engine.teaser.start();
                if engine.wait_for_change(interrupt) {
                    engine.teaser.reset();
                    engine.run_tcr_cycle();
                    engine.teaser.start();
                    true
                } else {
                    engine.teaser.reset();
                    false
                }
            }
        };
        let death = {
            let engine = Arc::clone(self);
            move || {
                if let Some(timer) = engine.mob_timer.lock().expect("timer lock poisoned").take() {
                    timer.stop();
                }
                engine.ui.notify_role_ending(Role::Driver);
                *engine.current_role.lock().expect("role lock poisoned") = None;
            }
        };
        self.spawn_worker(RoleWorker::spawn(birth, daily_life, death));
    }

    /// Start the navigator loop: pull the driver's commits every polling
    /// period until stopped.
    pub fn run_as_navigator(self: &Arc<Self>) {
        let birth = {
            let engine = Arc::clone(self);
            move || {
                *engine.current_role.lock().expect("role lock poisoned") = Some(Role::Navigator);
                engine.ui.notify_role_starting(Role::Navigator);
            }
        };
        let daily_life = {
            let engine = Arc::clone(self);
            move |interrupt: &Receiver<bool>| {
                if interrupt.try_recv().is_ok() {
                    return false;
                }
                let pulled = engine.vcs.lock().expect("vcs lock poisoned").pull();
                if let Err(e) = pulled {
                    engine.record(e);
                }
                thread::sleep(engine.polling_period);
                true
            }
        };
        let death = {
            let engine = Arc::clone(self);
            move || {
                engine.ui.notify_role_ending(Role::Navigator);
                *engine.current_role.lock().expect("role lock poisoned") = None;
            }
        };
        self.spawn_worker(RoleWorker::spawn(birth, daily_life, death));
    }

    fn spawn_worker(&self, worker: RoleWorker) {
        *self.worker.lock().expect("worker lock poisoned") = Some(worker);
    }

    /// Ask the active role loop to end at its next suspension point. A
    /// cycle in progress runs to completion.
    pub fn stop(&self) {
        if let Some(worker) = self.worker.lock().expect("worker lock poisoned").as_ref() {
            worker.stop();
        }
    }

    /// End the session: stop any active role, wait for its death, and
    /// return the exit code derived from the last recorded status.
    pub fn quit(&self) -> u8 {
        report::post_info("That's All Folks!");
        self.stop();
        if let Some(worker) = self.worker.lock().expect("worker lock poisoned").take() {
            worker.join();
        }
        self.status.lock().expect("status lock poisoned").exit_code()
    }

    /// Project the mob countdown progress onto the report bus.
    pub fn report_mob_timer_status(&self) {
        match self.mob_timer.lock().expect("timer lock poisoned").as_ref() {
            Some(timer) => timer::report_countdown_status(timer),
            None => report::post_info("No mob timer is running"),
        }
    }

    fn wait_for_change(&self, interrupt: &Receiver<bool>) -> bool {
        report::post_info("Going to sleep until something interesting happens");
        let dirs = language::dirs_to_watch(self.base_dir(), self.language.as_ref());
        let language = Arc::clone(&self.language);
        self.source_tree
            .watch(&dirs, &move |p: &Path| language.matches_extension(p), interrupt)
    }

    /// One TCR cycle: build, then test, then commit on green or revert
    /// production sources on red. A failing build discards nothing.
    pub fn run_tcr_cycle(&self) {
        *self.status.lock().expect("status lock poisoned") = Status::Ok;
        let build_passed = self.build().is_ok();
        let mut tests_passed = false;
        let metrics = self.change_metrics();
        if build_passed {
            tests_passed = self.test().is_ok();
            if tests_passed {
                self.commit();
            } else {
                self.revert();
            }
        }
        self.append_event(build_passed, tests_passed, metrics);
    }

    fn build(&self) -> Result<()> {
        report::post_info("Launching Build");
        let result = self.toolchain.run_build();
        if result.is_err() {
            self.set_status(Status::BuildFailed);
            report::post_warning("There are build errors! I can't go any further");
        }
        result
    }

    fn test(&self) -> Result<()> {
        report::post_info("Running Tests");
        let result = self.toolchain.run_tests();
        if result.is_err() {
            self.set_status(Status::TestFailed);
            report::post_warning("Some tests are failing! That's unfortunate");
        }
        result
    }

    fn commit(&self) {
        let result = {
            let mut vcs = self.vcs.lock().expect("vcs lock poisoned");
            report::post_info(format!(
                "Committing changes on branch {}",
                vcs.working_branch()
            ));
            vcs.add(&[])
                .and_then(|_| vcs.commit(false, &[DEFAULT_COMMIT_MESSAGE]))
                .and_then(|_| vcs.push())
        };
        if let Err(e) = result {
            self.record(e);
        }
    }

    /// Restore every production source file to its committed state. Test
    /// files are deliberately preserved: red tests cost production code.
    fn revert(&self) {
        report::post_warning("Reverting changes");
        let files = match language::all_src_files(self.base_dir(), self.language.as_ref()) {
            Ok(files) => files,
            Err(e) => {
                self.record(e);
                return;
            }
        };
        for file in files {
            let restored = self.vcs.lock().expect("vcs lock poisoned").restore(&file);
            if let Err(e) = restored {
                self.record(e);
            }
        }
    }

    /// Line and test-case metrics of the changes being cycled, classified
    /// by the language's directory layout. Computed before commit/revert
    /// mutate the tree.
    fn change_metrics(&self) -> (usize, usize, usize) {
        let base = self.base_dir();
        let mut vcs = self.vcs.lock().expect("vcs lock poisoned");
        let diffs = match vcs.diff() {
            Ok(diffs) => diffs,
            Err(e) => {
                drop(vcs);
                self.record(e);
                return (0, 0, 0);
            }
        };
        let mut src_lines = 0;
        let mut test_lines = 0;
        for diff in &diffs {
            let lines = diff.added_lines + diff.removed_lines;
            if language::is_src_path(base, self.language.as_ref(), &diff.path) {
                src_lines += lines;
            } else if language::is_test_path(base, self.language.as_ref(), &diff.path) {
                test_lines += lines;
            }
        }
        let added_cases = if test_lines > 0 {
            let test_dirs: Vec<PathBuf> =
                self.language.test_dirs().iter().map(|d| base.join(d)).collect();
            let test_dir_refs: Vec<&Path> = test_dirs.iter().map(|p| p.as_path()).collect();
            match vcs.diff_patch(&test_dir_refs) {
                Ok(patch) => count_added_test_cases(&patch, self.language.test_case_marker()),
                Err(_) => 0,
            }
        } else {
            0
        };
        (src_lines, test_lines, added_cases)
    }

    fn append_event(&self, build_passed: bool, tests_passed: bool, metrics: (usize, usize, usize)) {
        let (modified_src_lines, modified_test_lines, added_test_cases) = metrics;
        let event = TcrEvent {
            timestamp: Utc::now(),
            modified_src_lines,
            modified_test_lines,
            added_test_cases,
            build_passed,
            tests_passed,
        };
        if let Err(e) = events::append_event_to_log(self.base_dir(), &event) {
            report::post_warning(format!("cannot record event: {e}"));
        }
    }

    pub fn status(&self) -> Status {
        *self.status.lock().expect("status lock poisoned")
    }

    fn set_status(&self, status: Status) {
        *self.status.lock().expect("status lock poisoned") = status;
        debug!(?status, "session status recorded");
    }

    /// Record a runtime error: remember its status, tell the user, move
    /// on. Only init errors are fatal.
    fn record(&self, error: TcrError) {
        self.set_status(error.status());
        report::post_warning(error.to_string());
    }
}

/// Count test-case definitions among the added lines of a patch.
fn count_added_test_cases(patch: &str, marker: &str) -> usize {
    patch
        .lines()
        .filter(|l| l.starts_with('+') && !l.starts_with("+++") && l.contains(marker))
        .count()
}
