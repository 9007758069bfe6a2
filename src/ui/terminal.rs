//! Terminal front-end: renders report-bus messages as prefixed, colour
//! coded lines and drives the engine from single-key shortcuts.
//!
//! Keyboard input runs in raw mode, acquired through `stty` in best-effort
//! fashion and restored by a Drop guard on every exit path.

use crate::engine::{SessionInfo, TcrEngine};
use crate::report::{self, Message, MessageKind, Subscription};
use crate::role::Role;
use crate::runmode::RunMode;
use crate::ui::{color_enabled, UserInterface};
use once_cell::sync::OnceCell;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const LINE_PREFIX: &str = "[TCR]";
const TERMINAL_WIDTH: usize = 80;

const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const ESCAPE_KEY: u8 = 0x1b;
const ENTER_KEY: u8 = 0x0a;
const CARRIAGE_RETURN_KEY: u8 = 0x0d;

/// ANSI style a message category renders with. Normal carries raw
/// command output and stays untouched.
fn style_for(kind: MessageKind) -> Option<&'static str> {
    match kind {
        MessageKind::Normal => None,
        MessageKind::Title | MessageKind::Info | MessageKind::Notification => Some(CYAN),
        MessageKind::Warning => Some(YELLOW),
        MessageKind::Error => Some(RED),
    }
}

/// Print one line the way its category dictates: prefixed and coloured
/// for engine messages, untouched for subprocess output.
fn print_line(kind: MessageKind, text: &str) {
    match style_for(kind) {
        None => println!("{text}"),
        Some(code) if color_enabled() => println!("{code}{LINE_PREFIX} {text}{RESET}"),
        Some(_) => println!("{LINE_PREFIX} {text}"),
    }
}

fn print_info(text: &str) {
    print_line(MessageKind::Info, text);
}

fn print_warning(text: &str) {
    print_line(MessageKind::Warning, text);
}

fn print_error(text: &str) {
    print_line(MessageKind::Error, text);
}

fn print_title(text: &str) {
    let width = TERMINAL_WIDTH.saturating_sub(LINE_PREFIX.len() + 2);
    print_line(MessageKind::Title, &"-".repeat(width));
    print_line(MessageKind::Title, text);
}

fn render_message(msg: &Message, notifications_muted: &AtomicBool) {
    match msg.kind {
        MessageKind::Title => print_title(&msg.text),
        MessageKind::Notification => {
            print_line(MessageKind::Notification, &msg.text);
            if !notifications_muted.load(Ordering::SeqCst) {
                // Terminal bell as the closest thing to a desktop ping
                print!("\x07");
            }
        }
        kind => print_line(kind, &msg.text),
    }
}

pub struct Terminal {
    engine: OnceCell<Arc<TcrEngine>>,
    reporting: Mutex<Option<Subscription>>,
    notifications_muted: Arc<AtomicBool>,
}

impl Terminal {
    pub fn new() -> Arc<Terminal> {
        let terminal = Arc::new(Terminal {
            engine: OnceCell::new(),
            reporting: Mutex::new(None),
            notifications_muted: Arc::new(AtomicBool::new(false)),
        });
        terminal.start_reporting();
        terminal
    }

    /// Wire the engine the menu shortcuts act on. Must happen before
    /// [`Terminal::start`].
    pub fn attach(&self, engine: Arc<TcrEngine>) {
        let _ = self.engine.set(engine);
    }

    fn engine(&self) -> &Arc<TcrEngine> {
        self.engine.get().expect("terminal started before attach")
    }

    fn read_key(&self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match std::io::stdin().read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    fn print_options_menu(&self) {
        print_title("What shall we do?");
        print_info("\tD -> Driver role");
        print_info("\tN -> Navigator role");
        print_info("\tP -> Turn on/off git auto-push");
        print_info("\tT -> Mob timer status");
        print_info("\tQ -> Quit");
    }

    fn main_menu(&self) {
        self.print_options_menu();
        while let Some(key) = self.read_key() {
            match key {
                b'd' | b'D' => self.start_as(Role::Driver),
                b'n' | b'N' => self.start_as(Role::Navigator),
                b'p' | b'P' => {
                    self.engine().toggle_auto_push();
                    self.show_session_info(&self.engine().session_info());
                }
                b't' | b'T' => self.engine().report_mob_timer_status(),
                b'q' | b'Q' => return,
                ENTER_KEY | CARRIAGE_RETURN_KEY => continue,
                other => {
                    print_warning(&format!(
                        "No action is mapped to shortcut '{}'",
                        (other as char).escape_default()
                    ));
                }
            }
            self.print_options_menu();
        }
    }

    /// Run a role until the user presses ESC.
    fn start_as(&self, role: Role) {
        match role {
            Role::Driver => self.engine().run_as_driver(),
            Role::Navigator => self.engine().run_as_navigator(),
        }
        while let Some(key) = self.read_key() {
            match key {
                ESCAPE_KEY => {
                    print_warning("OK, I heard you");
                    self.engine().stop();
                    return;
                }
                _ => {
                    print_warning(&format!(
                        "Key not recognized. Press ESC to leave {role} role"
                    ));
                }
            }
        }
        // Stdin is gone; end the role rather than spinning
        self.engine().stop();
    }
}

impl UserInterface for Terminal {
    /// Interactive session entry point: solo goes straight to the driver
    /// role, mob opens the role menu. Raw mode spans the whole session.
    fn start(&self) {
        let _raw = RawModeGuard::acquire();
        match self.engine().mode() {
            RunMode::Solo => self.start_as(Role::Driver),
            RunMode::Mob => self.main_menu(),
            other => print_error(&format!("Unknown interactive mode: {}", other.name())),
        }
    }

    fn show_running_mode(&self, mode: RunMode) {
        print_title(&format!("Running in {} mode", mode.name()));
    }

    fn notify_role_starting(&self, role: Role) {
        print_title(&format!(
            "Starting as a {}. Press ESC when done",
            role.title()
        ));
    }

    fn notify_role_ending(&self, role: Role) {
        print_info(&format!("Leaving {} role", role.title()));
    }

    fn show_session_info(&self, info: &SessionInfo) {
        print_title(&format!("Working Directory: {}", info.base_dir.display()));
        print_info(&format!(
            "Language={}, Toolchain={}",
            info.language_name, info.toolchain_name
        ));
        let auto_push = if info.auto_push { "enabled" } else { "disabled" };
        print_info(&format!(
            "Running on git branch \"{}\" with auto-push {auto_push}",
            info.branch
        ));
    }

    fn confirm(&self, message: &str, default_answer: bool) -> bool {
        let _raw = RawModeGuard::acquire();
        print_warning(message);
        let advice = if default_answer { "[Y/n]" } else { "[y/N]" };
        print_warning(&format!("Do you want to proceed? {advice}"));
        while let Some(key) = self.read_key() {
            match key {
                b'y' | b'Y' => return true,
                b'n' | b'N' => return false,
                ENTER_KEY | CARRIAGE_RETURN_KEY => return default_answer,
                _ => continue,
            }
        }
        default_answer
    }

    fn start_reporting(&self) {
        let mut slot = self.reporting.lock().expect("reporting lock poisoned");
        if slot.is_some() {
            return;
        }
        let muted = Arc::clone(&self.notifications_muted);
        *slot = Some(report::subscribe(move |msg| render_message(msg, &muted)));
    }

    fn stop_reporting(&self) {
        if let Some(sub) = self.reporting.lock().expect("reporting lock poisoned").take() {
            sub.unsubscribe();
        }
    }

    fn mute_desktop_notifications(&self, muted: bool) {
        self.notifications_muted.store(muted, Ordering::SeqCst);
    }
}

/// Saves the terminal state via `stty -g`, switches to raw single-key
/// input, and restores the saved state (or a sane fallback) on drop.
struct RawModeGuard {
    #[cfg(unix)]
    saved: Option<String>,
}

impl RawModeGuard {
    #[cfg(unix)]
    fn acquire() -> RawModeGuard {
        let saved = std::process::Command::new("stty")
            .arg("-g")
            .output()
            .ok()
            .and_then(|o| {
                o.status
                    .success()
                    .then(|| String::from_utf8_lossy(&o.stdout).trim().to_string())
            });
        let _ = std::process::Command::new("stty")
            .args(["-icanon", "min", "1", "-echo"])
            .status();
        RawModeGuard { saved }
    }

    #[cfg(not(unix))]
    fn acquire() -> RawModeGuard {
        RawModeGuard {}
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(state) = &self.saved {
                let _ = std::process::Command::new("stty").arg(state).status();
            } else {
                let _ = std::process::Command::new("stty").arg("sane").status();
            }
        }
    }
}
