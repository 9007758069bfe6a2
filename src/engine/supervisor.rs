//! Role worker lifecycle: birth, repeated daily life, death.
//!
//! One worker thread runs a role from birth till death. Interruption goes
//! through a rendezvous channel: `stop` hands exactly one value to the
//! worker, which observes it at its next suspension point. Whatever the
//! daily-life outcome, the worker always reaches `death`.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use tracing::debug;

pub struct RoleWorker {
    shoot: SyncSender<bool>,
    handle: JoinHandle<()>,
}

impl RoleWorker {
    /// Spawn a worker: `birth` once, `daily_life` until it declines one
    /// more day, then `death`.
    pub fn spawn(
        birth: impl FnOnce() + Send + 'static,
        daily_life: impl FnMut(&Receiver<bool>) -> bool + Send + 'static,
        death: impl FnOnce() + Send + 'static,
    ) -> RoleWorker {
        let (shoot, interrupt) = sync_channel::<bool>(0);
        let mut daily_life = daily_life;
        let handle = thread::spawn(move || {
            debug!("role worker born");
            birth();
            while daily_life(&interrupt) {}
            death();
            debug!("role worker died");
        });
        RoleWorker { shoot, handle }
    }

    /// Hand one interruption value to the worker. Blocks until the worker
    /// drains it, or returns at once when the worker is already gone.
    pub fn stop(&self) {
        let _ = self.shoot.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to complete its death.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}
