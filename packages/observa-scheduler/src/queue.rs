use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Action, SchedulerError};

/// A serial work queue: the delivery context of an [`AsyncQueueScheduler`].
///
/// Implementors must run actions one at a time, in the order `execute` was
/// called. Handing a scheduler an executor that runs actions concurrently
/// (a thread pool, for example) is a misuse: fresh values could then be
/// delivered out of order, a stale value after a newer one.
///
/// [`AsyncQueueScheduler`]: crate::AsyncQueueScheduler
pub trait SerialExecutor: Send + Sync {
    /// Enqueue an action. Must not block the caller.
    fn execute(&self, action: Action);

    /// Human-readable queue name, used in logs.
    fn label(&self) -> &str;
}

/// A labelled serial queue backed by one dedicated thread.
///
/// Clones share the same queue. When the last clone is dropped the thread
/// still runs every action already enqueued, then exits. Enqueued actions
/// cannot be retracted.
#[derive(Clone)]
pub struct SerialQueue {
    label: Arc<str>,
    sender: mpsc::UnboundedSender<Action>,
}

impl SerialQueue {
    pub fn new(label: impl Into<String>) -> Result<Self, SchedulerError> {
        let label: Arc<str> = Arc::from(label.into());
        let (sender, mut receiver) = mpsc::unbounded_channel::<Action>();

        let thread_label = label.clone();
        thread::Builder::new()
            .name(format!("observa-queue:{label}"))
            .spawn(move || {
                let mut executed: u64 = 0;
                while let Some(action) = receiver.blocking_recv() {
                    action();
                    executed = executed.saturating_add(1);
                }
                debug!(label = %thread_label, executed, "serial queue closed");
            })?;

        debug!(label = %label, "serial queue started");
        Ok(Self { label, sender })
    }
}

impl SerialExecutor for SerialQueue {
    fn execute(&self, action: Action) {
        // Only fails once the queue thread died from a panicking action.
        if self.sender.send(action).is_err() {
            warn!(label = %self.label, "serial queue thread is gone; action dropped");
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
