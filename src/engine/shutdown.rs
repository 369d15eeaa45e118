// src/engine/shutdown.rs

//! Run-wide shutdown signal.
//!
//! A single [`ShutdownTrigger`] fans out to any number of [`Shutdown`]
//! listeners: the scheduler stops dispatching, and every running command
//! gets the grace period before it is killed.

use tokio::sync::watch;
use tracing::{info, warn};

/// Sending half, held by whoever decides the run should stop.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // `send_replace` never fails, even with no listeners left.
        self.tx.send_replace(true);
    }
}

/// Receiving half, cheap to clone into every worker.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A listener that never fires.
    pub fn never() -> Shutdown {
        let (_trigger, shutdown) = Self::channel();
        shutdown
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Fire `trigger` on Ctrl-C.
pub fn listen_for_ctrl_c(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; shutting down run");
        trigger.trigger();
    });
}
