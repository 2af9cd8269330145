//! Marshalling work onto the UI context.
//!
//! Background threads (the playback sync loop, the sensor worker) never touch
//! UI-owned state directly. They post closures to a [`UiExecutor`], and the
//! UI thread runs them.

use crossbeam_channel::{Receiver, Sender, unbounded};

pub type UiTask = Box<dyn FnOnce() + Send>;

/// Something that runs posted tasks on the UI context.
///
/// `post` must not block: it is called from the sync loop and sensor threads.
pub trait UiExecutor: Send + Sync {
    fn post(&self, task: UiTask);
}

/// Runs tasks immediately on the posting thread.
///
/// For headless use and tests, where there is no separate UI thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl UiExecutor for ImmediateExecutor {
    fn post(&self, task: UiTask) {
        task();
    }
}

/// Queues tasks until the UI thread drains them with [`run_pending`](Self::run_pending).
pub struct ChannelExecutor {
    sender: Sender<UiTask>,
    receiver: Receiver<UiTask>,
    waker: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ChannelExecutor {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            waker: None,
        }
    }

    /// Calls `waker` after each post, e.g. to request a repaint.
    pub fn with_waker<F>(waker: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            waker: Some(Box::new(waker)),
            ..Self::new()
        }
    }

    /// Runs every queued task on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            count += 1;
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for ChannelExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl UiExecutor for ChannelExecutor {
    fn post(&self, task: UiTask) {
        // Both ends live in self, so the channel cannot be disconnected here
        let _ = self.sender.send(task);
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}
