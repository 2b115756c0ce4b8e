use tokio::task::JoinHandle;
use tracing::debug;

/// Holder for a single background task.
///
/// Storing a new handle aborts the previous one first, and dropping the
/// slot aborts whatever it holds, so a flow can never leak a poller.
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the current task, if any, and hold `handle` instead.
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        self.abort();
        self.handle = Some(handle);
    }

    /// Abort the held task. Returns whether there was one.
    pub fn abort(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                if !handle.is_finished() {
                    debug!("Aborting background task");
                }
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// A task is held and has not finished.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.abort();
    }
}
