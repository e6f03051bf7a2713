use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// A single one-shot timer slot.
///
/// Each arm bumps `generation`; the fire callback receives the generation it
/// was armed with and must `claim` it before acting. A callback whose
/// generation no longer matches belongs to a superseded or cancelled timer.
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer and arm a new one firing after `after`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&mut self, after: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        // Fix the deadline now, not when the task is first polled
        let deadline = Instant::now() + after;
        self.handle = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            on_fire(generation).await;
        }));
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Accept a fire callback if it belongs to the armed timer.
    ///
    /// On success the slot is emptied without aborting the task, which is
    /// the caller itself.
    pub fn claim(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
