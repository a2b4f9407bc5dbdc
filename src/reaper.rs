//! Background cleanup of abandoned subscriptions.
//!
//! A subscription that nobody polls would otherwise keep queuing forever.
//! The reaper wakes up every `reap_interval` and removes subscriptions whose
//! last subscribe or poll is older than `idle_timeout`.

use crate::broker::PubSub;
use crate::error::Result;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Handle to a running reaper thread. Stops the thread when dropped.
pub struct ReaperHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    /// Signal the thread to exit and wait for it.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop_inner(&mut self) {
        // The signal or the dropped sender, whichever lands first, ends the wait
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

impl PubSub {
    /// Start the idle reaper for this broker.
    ///
    /// Returns `None` when the configuration disables idle reaping. The
    /// thread holds only a weak reference and exits once the broker is gone.
    pub fn spawn_reaper(self: &Arc<Self>) -> Result<Option<ReaperHandle>> {
        if self.config().idle_timeout().is_none() {
            return Ok(None);
        }
        let interval = self.config().reap_interval();
        let broker = Arc::downgrade(self);
        let (sender, receiver) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("pubsub-reaper".to_string())
            .spawn(move || run(broker, receiver, interval))?;

        info!(?interval, "idle subscription reaper started");

        Ok(Some(ReaperHandle {
            shutdown: Some(sender),
            thread: Some(thread),
        }))
    }
}

fn run(broker: Weak<PubSub>, shutdown: crossbeam_channel::Receiver<()>, interval: Duration) {
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let Some(pubsub) = broker.upgrade() else {
            break;
        };
        let reaped = pubsub.reap_idle();
        if !reaped.is_empty() {
            debug!(count = reaped.len(), "reaper pass removed subscriptions");
        }
    }

    info!("idle subscription reaper stopped");
}
