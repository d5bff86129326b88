//! Cooperative cancellation.
//!
//! One token is shared by the signal handler, the menu loop and every
//! playback activity. The real-time threads observe it at their periodic
//! wait points; the signal handler does nothing but trip it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shutdown flag observed at thread wait points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call from a signal handler.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
