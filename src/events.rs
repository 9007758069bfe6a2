//! Per-cycle event records appended to the event log.
//!
//! One CSV row per TCR cycle, fixed column order:
//! timestamp, modified src lines, modified test lines, added test cases,
//! build passed, tests passed. The log is the input of the (external)
//! statistics tooling, so the format is part of the crate's contract.

use crate::errors::{Result, TcrError};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EVENT_LOG_FILE_NAME: &str = "event-log.csv";
const STATE_DIR_NAME: &str = ".tcr";

/// What happened during one TCR cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcrEvent {
    pub timestamp: DateTime<Utc>,
    pub modified_src_lines: usize,
    pub modified_test_lines: usize,
    pub added_test_cases: usize,
    pub build_passed: bool,
    pub tests_passed: bool,
}

impl TcrEvent {
    /// Serialise to the fixed CSV row format; timestamp is UTC at second
    /// resolution, booleans spelled `true`/`false`.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.modified_src_lines,
            self.modified_test_lines,
            self.added_test_cases,
            self.build_passed,
            self.tests_passed,
        )
    }
}

/// Directory holding the event log for a source tree.
pub fn event_log_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(STATE_DIR_NAME)
}

/// Append one event row to `<base_dir>/.tcr/event-log.csv`, creating the
/// directory and file as needed.
pub fn append_event_to_log(base_dir: &Path, event: &TcrEvent) -> Result<()> {
    let dir = event_log_dir(base_dir);
    fs::create_dir_all(&dir)
        .map_err(|e| TcrError::Other(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(EVENT_LOG_FILE_NAME);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| TcrError::Other(format!("cannot open {}: {e}", path.display())))?;
    writeln!(file, "{}", event.to_csv_row())
        .map_err(|e| TcrError::Other(format!("cannot write {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> TcrEvent {
        TcrEvent {
            timestamp: Utc.with_ymd_and_hms(2023, 4, 11, 15, 52, 42).unwrap(),
            modified_src_lines: 12,
            modified_test_lines: 25,
            added_test_cases: 3,
            build_passed: true,
            tests_passed: false,
        }
    }

    #[test]
    fn csv_row_format_is_fixed() {
        assert_eq!(
            sample_event().to_csv_row(),
            "2023-04-11 15:52:42,12,25,3,true,false"
        );
    }

    #[test]
    fn append_creates_directory_and_accumulates_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let event = sample_event();
        append_event_to_log(tmp.path(), &event).unwrap();
        append_event_to_log(tmp.path(), &event).unwrap();

        let content =
            fs::read_to_string(event_log_dir(tmp.path()).join(EVENT_LOG_FILE_NAME)).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows, vec![event.to_csv_row(), event.to_csv_row()]);
    }
}
