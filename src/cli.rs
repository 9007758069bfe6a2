use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tcr::params::parse_duration;
use tcr::ColorMode;

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Run TCR on your own: driver role directly, auto-push off
    Solo,
    /// Run TCR in a mob session: role menu, auto-push on, turn countdown
    Mob,
    /// Run a single TCR cycle and exit with its status
    #[command(name = "one-shot")]
    OneShot,
}

#[derive(Parser, Debug)]
#[command(
    name = "tcr",
    version,
    about = "Test && Commit || Revert: watch the source tree, build and test on every change, commit on green, revert on red.",
    after_long_help = "Examples:\n  tcr solo -b ./kata/java\n  tcr mob -b ./kata/cpp -d 10m\n  tcr one-shot -b ./kata/java -t maven\n"
)]
pub(crate) struct Cli {
    /// Base directory of the source tree to work on
    #[arg(short = 'b', long = "base-dir")]
    pub(crate) base_dir: Option<PathBuf>,

    /// Toolchain used to build and test (defaults to the language's)
    #[arg(short = 't', long = "toolchain")]
    pub(crate) toolchain: Option<String>,

    /// Language of the source tree (detected from the base dir by default)
    #[arg(short = 'l', long = "language")]
    pub(crate) language: Option<String>,

    /// Enable or disable git auto-push (overrides the run mode default)
    #[arg(short = 'p', long = "auto-push")]
    pub(crate) auto_push: Option<bool>,

    /// Navigator polling period between pulls, e.g. 2s or 500ms
    #[arg(short = 'o', long = "polling", value_parser = parse_duration)]
    pub(crate) polling: Option<Duration>,

    /// Duration of a driver turn in mob mode, e.g. 5m
    #[arg(short = 'd', long = "duration", value_parser = parse_duration)]
    pub(crate) duration: Option<Duration>,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum)]
    pub(crate) color: Option<ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Command,
}
