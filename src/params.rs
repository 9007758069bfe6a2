//! Run parameters assembled from the command line.

use crate::runmode::RunMode;
use std::path::PathBuf;
use std::time::Duration;

/// Default navigator polling period between pulls.
pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_secs(2);
/// Default duration of a driver turn in mob mode.
pub const DEFAULT_MOB_TURN_DURATION: Duration = Duration::from_secs(5 * 60);

/// Everything the engine needs to start a session.
#[derive(Debug, Clone)]
pub struct Params {
    pub mode: RunMode,
    /// Source tree base directory; empty means the current directory.
    pub base_dir: PathBuf,
    /// Explicit toolchain name; empty means the language default.
    pub toolchain: String,
    /// Explicit language name; empty means detection from the base dir.
    pub language: String,
    pub auto_push: bool,
    pub polling_period: Duration,
    pub mob_turn_duration: Duration,
}

impl Params {
    pub fn new(mode: RunMode) -> Self {
        Params {
            mode,
            base_dir: PathBuf::new(),
            toolchain: String::new(),
            language: String::new(),
            auto_push: mode.auto_push_default(),
            polling_period: DEFAULT_POLLING_PERIOD,
            mob_turn_duration: DEFAULT_MOB_TURN_DURATION,
        }
    }
}

/// Parse a humane duration: "5m", "90s", "250ms", "1h", or plain seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let n: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration value in \"{s}\""))?;
    match unit {
        "ms" => Ok(Duration::from_millis(n)),
        "s" | "sec" => Ok(Duration::from_secs(n)),
        "m" | "min" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        other => Err(format!("unknown duration unit \"{other}\"")),
    }
}
