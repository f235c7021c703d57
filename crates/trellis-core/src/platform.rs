//! Platform abstraction for frame scheduling.
//!
//! The runtime never flushes on its own. When the first instance of a batch
//! is marked dirty it asks the host, through [`FrameScheduler`], to call
//! [`Runtime::flush`](crate::Runtime::flush) at the next frame boundary.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Requests frames from the host platform.
pub trait FrameScheduler: Send + Sync {
    /// Request that the host call `flush` at its next frame boundary.
    fn schedule_frame(&self);
}

/// Scheduler that drops every request; the embedder flushes explicitly.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl FrameScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

/// Scheduler that counts frame requests without acting on them.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    requests: AtomicUsize,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl FrameScheduler for RecordingScheduler {
    fn schedule_frame(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}
