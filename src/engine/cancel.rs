//! Cancellation signal shared between the keyboard listener and the
//! render/poll loop.
//!
//! The flag is the source of truth; the channel only exists so a cancel can
//! cut the inter-poll sleep short instead of waiting out the interval.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

/// Cloneable, thread-safe cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    /// Request cancellation. Idempotent; only the first call wakes a sleeper.
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            let _ = self.wake_tx.try_send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `interval` or until cancelled. Returns whether cancellation
    /// was requested.
    pub fn sleep(&self, interval: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.wake_rx.recv_timeout(interval) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => self.is_cancelled(),
        }
    }

    /// Route SIGINT/SIGTERM into this token.
    ///
    /// Signals only set the flag, so a pending sleep notices at the end of its
    /// interval. Registration failures are reported, not fatal.
    #[cfg(feature = "signals")]
    pub fn register_signals(&self) -> Vec<String> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let mut failures = Vec::new();
        for (name, signal) in [("SIGINT", SIGINT), ("SIGTERM", SIGTERM)] {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&self.flag)) {
                failures.push(format!("failed to register {name}: {e}"));
            }
        }
        failures
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
