//! Session status and its mapping to process exit codes.

/// Outcome recorded over a session; the last recorded value decides the
/// process exit code when quitting.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Status {
    #[default]
    Ok,
    BuildFailed,
    TestFailed,
    ConfigError,
    GitError,
    OtherError,
}

impl Status {
    /// Direct mapping to the process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::BuildFailed => 1,
            Status::TestFailed => 2,
            Status::ConfigError => 3,
            Status::GitError => 4,
            Status::OtherError => 5,
        }
    }
}
