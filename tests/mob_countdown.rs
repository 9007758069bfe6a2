//! Mob turn countdown wired to the report bus.
//!
//! The bus is process-global, so these tests serialise themselves and
//! unsubscribe before releasing the lock.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tcr::report::{self, Message, MessageKind};
use tcr::timer::{self, ReminderState};
use tcr::RunMode;

static BUS_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn collect() -> (Arc<Mutex<Vec<Message>>>, report::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = report::subscribe(move |m| sink.lock().unwrap().push(m.clone()));
    (seen, sub)
}

#[test]
fn countdown_announces_start_and_rings_at_timeout() {
    let _serial = BUS_LOCK.lock().unwrap();
    let (seen, sub) = collect();

    let countdown =
        timer::mob_turn_countdown(RunMode::Mob, Duration::from_millis(300)).unwrap();
    countdown.start();
    thread::sleep(Duration::from_millis(700));
    sub.unsubscribe();

    assert_eq!(countdown.state(), ReminderState::StoppedAfterTimeOut);
    let seen = seen.lock().unwrap();
    assert!(seen
        .iter()
        .any(|m| m.kind == MessageKind::Info && m.text.starts_with("Starting driver turn countdown")));
    assert!(seen
        .iter()
        .any(|m| m.kind == MessageKind::Notification && m.text.contains("rotate")));
}

#[test]
fn interrupted_countdown_does_not_ring() {
    let _serial = BUS_LOCK.lock().unwrap();
    let (seen, sub) = collect();

    let countdown =
        timer::mob_turn_countdown(RunMode::Mob, Duration::from_millis(300)).unwrap();
    countdown.start();
    thread::sleep(Duration::from_millis(50));
    countdown.stop();
    thread::sleep(Duration::from_millis(500));
    sub.unsubscribe();

    assert_eq!(countdown.state(), ReminderState::StoppedAfterInterruption);
    let seen = seen.lock().unwrap();
    assert!(seen
        .iter()
        .all(|m| m.kind != MessageKind::Notification));
}

#[test]
fn countdown_status_projection_reports_progress() {
    let _serial = BUS_LOCK.lock().unwrap();
    let (seen, sub) = collect();

    let countdown =
        timer::mob_turn_countdown(RunMode::Mob, Duration::from_secs(300)).unwrap();
    timer::report_countdown_status(&countdown);
    countdown.start();
    timer::report_countdown_status(&countdown);
    countdown.stop();
    timer::report_countdown_status(&countdown);
    sub.unsubscribe();

    let texts: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m.kind == MessageKind::Info)
        .map(|m| m.text.clone())
        .collect();
    assert!(texts.iter().any(|t| t.contains("not started")));
    assert!(texts.iter().any(|t| t.starts_with("Mob turn:")));
    assert!(texts.iter().any(|t| t.contains("over")));
}
