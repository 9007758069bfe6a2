//! Run modes and the attributes the engine derives from them.

use clap::ValueEnum;

/// Operating mode selected at startup. Immutable once picked.
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum RunMode {
    /// Single developer: no auto-push, driver role only.
    Solo,
    /// Mob session: auto-push on by default, role menu, turn countdown.
    Mob,
    /// Run a single TCR cycle and exit.
    OneShot,
    /// Check configuration and environment without running.
    Check,
    /// Print the event log.
    Log,
    /// Compute statistics over the event log.
    Stats,
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Solo => "solo",
            RunMode::Mob => "mob",
            RunMode::OneShot => "one-shot",
            RunMode::Check => "check",
            RunMode::Log => "log",
            RunMode::Stats => "stats",
        }
    }

    /// Default state of the VCS auto-push option under this mode.
    pub fn auto_push_default(&self) -> bool {
        matches!(self, RunMode::Mob)
    }

    /// Whether a mob-turn countdown timer runs with this mode.
    pub fn needs_countdown_timer(&self) -> bool {
        matches!(self, RunMode::Mob)
    }

    /// Whether this mode allows user interaction.
    pub fn is_interactive(&self) -> bool {
        matches!(self, RunMode::Solo | RunMode::Mob)
    }

    /// Whether this mode actively runs TCR cycles.
    pub fn is_active(&self) -> bool {
        matches!(self, RunMode::Solo | RunMode::Mob | RunMode::OneShot)
    }
}
