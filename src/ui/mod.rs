//! The port the engine drives to talk to a user interface.

use crate::engine::SessionInfo;
use crate::role::Role;
use crate::runmode::RunMode;
use clap::ValueEnum;
use once_cell::sync::OnceCell;

pub mod terminal;

/// Operations a user interface must provide for the engine to interact
/// with it. The terminal implementation lives in this crate; a graphical
/// front-end implements the same port elsewhere.
pub trait UserInterface: Send + Sync {
    /// Enter the interface's interactive loop; returns when the user is
    /// done with the session.
    fn start(&self);
    fn show_running_mode(&self, mode: RunMode);
    fn notify_role_starting(&self, role: Role);
    fn notify_role_ending(&self, role: Role);
    fn show_session_info(&self, info: &SessionInfo);
    /// Ask a yes/no question; `default_answer` is used on plain Enter.
    fn confirm(&self, message: &str, default_answer: bool) -> bool;
    /// Begin rendering report-bus messages.
    fn start_reporting(&self);
    /// Stop rendering report-bus messages.
    fn stop_reporting(&self);
    fn mute_desktop_notifications(&self, muted: bool);
}

/// How terminal output gets colourised, selected with `--color`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Pick the colour mode for this process; the first caller wins.
pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

/// Whether stdout output should carry ANSI colours. NO_COLOR
/// (https://no-color.org/) overrides the selected mode.
pub(crate) fn color_enabled() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    match COLOR_MODE.get().copied().unwrap_or(ColorMode::Auto) {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => atty::is(atty::Stream::Stdout),
    }
}
