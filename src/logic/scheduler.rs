//! Timers
//!
//! - `RepeatingTimer`: interval handle for scheduled scans. Cancelling stops the
//!   next tick only; a tick already running finishes.
//! - `Debouncer`: re-armable one-shot used by the panic gesture window.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

// ============================================================================
// REPEATING TIMER
// ============================================================================

pub struct RepeatingTimer {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl RepeatingTimer {
    /// Run `tick` every `period`, first run after one period.
    /// Ticks never overlap: the next sleep starts after the previous tick returns.
    pub fn spawn<F, Fut>(period: Duration, tick: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                tick().await;
            }
        });

        Self { cancelled, handle }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// DEBOUNCER
// ============================================================================

#[derive(Default)]
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re-)arm: any pending callback is dropped, `fire` runs after `delay`
    /// of no further arming.
    pub fn arm<F>(&self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// TESTS
// ============================================================================
