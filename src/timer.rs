//! Periodic reminders: a dual-deadline timer ticking every period until an
//! overall timeout expires, whichever of timeout or interruption comes
//! first. Used for the mob turn countdown and the driver inactivity
//! teaser.

use crate::report;
use crate::runmode::RunMode;
use chrono::{DateTime, Local};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(60);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReminderState {
    NotStarted,
    Running,
    StoppedAfterTimeOut,
    StoppedAfterInterruption,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReminderEventType {
    Start,
    Periodic,
    Timeout,
    Interrupt,
}

/// Snapshot handed to the callback on every reminder event.
///
/// The callback runs on the reminder's internal threads while its state is
/// locked; it must not call back into the reminder and should use the
/// snapshot fields instead.
#[derive(Clone, Debug)]
pub struct ReminderContext {
    pub event_type: ReminderEventType,
    pub index: i64,
    pub index_max: i64,
    pub timestamp: DateTime<Local>,
    pub elapsed: Duration,
    pub remaining: Duration,
}

type OnEvent = Arc<dyn Fn(&ReminderContext) + Send + Sync>;

struct Inner {
    state: ReminderState,
    tick_counter: i64,
    start_time: Option<Instant>,
    stop_time: Option<Instant>,
    ticker_stop: Option<Sender<()>>,
    deadline_stop: Option<Sender<()>>,
}

pub struct PeriodicReminder {
    timeout: Duration,
    tick_period: Duration,
    index_max: i64,
    on_event: OnEvent,
    inner: Mutex<Inner>,
}

impl PeriodicReminder {
    /// Build a reminder firing `on_event` every `tick_period` until
    /// `timeout` expires. Zero durations select the defaults (5 minutes /
    /// 1 minute). The reminder is ready but not counting yet.
    pub fn new(
        timeout: Duration,
        tick_period: Duration,
        on_event: impl Fn(&ReminderContext) + Send + Sync + 'static,
    ) -> Arc<PeriodicReminder> {
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        let tick_period = if tick_period.is_zero() {
            DEFAULT_TICK_PERIOD
        } else {
            tick_period
        };
        let index_max = (timeout.as_millis() / tick_period.as_millis()) as i64 - 1;
        Arc::new(PeriodicReminder {
            timeout,
            tick_period,
            index_max,
            on_event: Arc::new(on_event),
            inner: Mutex::new(Inner {
                state: ReminderState::NotStarted,
                tick_counter: 0,
                start_time: None,
                stop_time: None,
                ticker_stop: None,
                deadline_stop: None,
            }),
        })
    }

    /// Begin counting: emits the Start event, then launches the ticker and
    /// deadline tasks.
    pub fn start(self: &Arc<Self>) {
        let (ticker_tx, ticker_rx) = mpsc::channel();
        let (deadline_tx, deadline_rx) = mpsc::channel();
        {
            let mut inner = self.inner.lock().expect("reminder lock poisoned");
            if inner.state != ReminderState::NotStarted {
                return;
            }
            inner.state = ReminderState::Running;
            inner.start_time = Some(Instant::now());
            inner.ticker_stop = Some(ticker_tx);
            inner.deadline_stop = Some(deadline_tx);
            self.emit(
                ReminderEventType::Start,
                0,
                Duration::ZERO,
                self.timeout,
            );
        }

        let ticker = Arc::clone(self);
        thread::spawn(move || loop {
            match ticker_rx.recv_timeout(ticker.tick_period) {
                Err(RecvTimeoutError::Timeout) => {
                    let mut inner = ticker.inner.lock().expect("reminder lock poisoned");
                    if inner.state != ReminderState::Running {
                        return;
                    }
                    let index = inner.tick_counter;
                    if index > ticker.index_max {
                        continue;
                    }
                    inner.tick_counter += 1;
                    let elapsed = ticker.tick_period * (index as u32 + 1);
                    ticker.emit(
                        ReminderEventType::Periodic,
                        index,
                        elapsed,
                        ticker.timeout.saturating_sub(elapsed),
                    );
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        });

        let deadline = Arc::clone(self);
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = deadline_rx.recv_timeout(deadline.timeout) {
                deadline.stop_ticking(ReminderState::StoppedAfterTimeOut);
            }
        });
    }

    /// Interrupt the reminder before its timeout. No-op once terminated.
    pub fn stop(&self) {
        self.stop_ticking(ReminderState::StoppedAfterInterruption);
    }

    /// Terminate with the given reason. Only the first of timeout or
    /// interruption wins; later calls are no-ops.
    fn stop_ticking(&self, reason: ReminderState) {
        let mut inner = self.inner.lock().expect("reminder lock poisoned");
        if inner.state != ReminderState::Running {
            return;
        }
        inner.state = reason;
        inner.stop_time = Some(Instant::now());
        if let Some(tx) = inner.ticker_stop.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = inner.deadline_stop.take() {
            let _ = tx.send(());
        }
        match reason {
            ReminderState::StoppedAfterTimeOut => {
                self.emit(
                    ReminderEventType::Timeout,
                    inner.tick_counter,
                    self.timeout,
                    Duration::ZERO,
                );
            }
            ReminderState::StoppedAfterInterruption => {
                let elapsed = self.elapsed_locked(&inner);
                self.emit(
                    ReminderEventType::Interrupt,
                    inner.tick_counter,
                    elapsed,
                    self.timeout.saturating_sub(elapsed),
                );
            }
            _ => {}
        }
    }

    /// Emit an event. Callers hold the state lock, which serialises events
    /// and keeps their timestamps strictly increasing.
    fn emit(&self, event_type: ReminderEventType, index: i64, elapsed: Duration, remaining: Duration) {
        let ctx = ReminderContext {
            event_type,
            index,
            index_max: self.index_max,
            timestamp: Local::now(),
            elapsed,
            remaining,
        };
        (self.on_event)(&ctx);
    }

    pub fn state(&self) -> ReminderState {
        self.inner.lock().expect("reminder lock poisoned").state
    }

    /// Time spent counting; frozen at the stop time after termination.
    pub fn elapsed_time(&self) -> Duration {
        let inner = self.inner.lock().expect("reminder lock poisoned");
        self.elapsed_locked(&inner)
    }

    fn elapsed_locked(&self, inner: &MutexGuard<'_, Inner>) -> Duration {
        match inner.state {
            ReminderState::NotStarted => Duration::ZERO,
            ReminderState::Running => inner
                .start_time
                .map(|t| t.elapsed())
                .unwrap_or(Duration::ZERO),
            _ => match (inner.start_time, inner.stop_time) {
                (Some(start), Some(stop)) => stop.duration_since(start),
                _ => Duration::ZERO,
            },
        }
    }

    /// Time left until the timeout; zero once terminated.
    pub fn remaining_time(&self) -> Duration {
        let inner = self.inner.lock().expect("reminder lock poisoned");
        match inner.state {
            ReminderState::NotStarted => self.timeout,
            ReminderState::Running => self.timeout.saturating_sub(self.elapsed_locked(&inner)),
            _ => Duration::ZERO,
        }
    }
}

/// Render a duration in compact "XmYs" form for countdown messages.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Build the countdown reminding the mob to rotate the driver. Returns
/// None when the run mode does not use a countdown.
pub fn mob_turn_countdown(mode: RunMode, turn_duration: Duration) -> Option<Arc<PeriodicReminder>> {
    if !mode.needs_countdown_timer() {
        return None;
    }
    Some(PeriodicReminder::new(
        turn_duration,
        Duration::ZERO,
        |ctx| match ctx.event_type {
            ReminderEventType::Start => report::post_info(format!(
                "Starting driver turn countdown ({})",
                format_duration(ctx.remaining)
            )),
            ReminderEventType::Periodic => report::post_info(format!(
                "Driver turn: {} remaining",
                format_duration(ctx.remaining)
            )),
            ReminderEventType::Timeout => {
                report::post_notification("Time's up: time to rotate the driver!")
            }
            ReminderEventType::Interrupt => {}
        },
    ))
}

/// On-demand projection of a countdown's progress, posted to the report
/// bus.
pub fn report_countdown_status(reminder: &PeriodicReminder) {
    match reminder.state() {
        ReminderState::NotStarted => report::post_info("Mob turn countdown has not started"),
        ReminderState::Running => report::post_info(format!(
            "Mob turn: {} elapsed, {} remaining",
            format_duration(reminder.elapsed_time()),
            format_duration(reminder.remaining_time())
        )),
        ReminderState::StoppedAfterTimeOut | ReminderState::StoppedAfterInterruption => {
            report::post_info("Mob turn is over")
        }
    }
}

/// Nudges the driver while no file change shows up. Restarted around every
/// watch and reset whenever a change is seen.
pub struct InactivityTeaser {
    timeout: Duration,
    tick_period: Duration,
    current: Mutex<Option<Arc<PeriodicReminder>>>,
}

impl InactivityTeaser {
    pub fn new(timeout: Duration, tick_period: Duration) -> InactivityTeaser {
        InactivityTeaser {
            timeout,
            tick_period,
            current: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let reminder = PeriodicReminder::new(self.timeout, self.tick_period, |ctx| {
            if ctx.event_type == ReminderEventType::Periodic {
                report::post_info(format!(
                    "No changes detected for {}",
                    format_duration(ctx.elapsed)
                ));
            }
        });
        reminder.start();
        let previous = self
            .current
            .lock()
            .expect("teaser lock poisoned")
            .replace(reminder);
        if let Some(old) = previous {
            old.stop();
        }
    }

    pub fn reset(&self) {
        if let Some(reminder) = self.current.lock().expect("teaser lock poisoned").take() {
            reminder.stop();
        }
    }
}
