use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::{Action, Scheduler, SchedulerError};

/// CPU scheduling hint for a [`TaskScheduler`] worker.
///
/// Never affects the order in which actions run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPriority {
    High,
    UserInitiated,
    #[default]
    Medium,
    Utility,
    Low,
    Background,
}

impl WorkerPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::UserInitiated => "user_initiated",
            Self::Medium => "medium",
            Self::Utility => "utility",
            Self::Low => "low",
            Self::Background => "background",
        }
    }

    pub fn worker_thread_name(self) -> String {
        format!("observa-task-worker:{}", self.as_str())
    }

    /// Low priority workers give up the CPU after every action.
    pub fn yields_between_actions(self) -> bool {
        matches!(self, Self::Utility | Self::Low | Self::Background)
    }
}

impl fmt::Display for WorkerPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers every value from one dedicated background worker.
///
/// Actions travel through an unbounded channel, so [`schedule`] never blocks,
/// and the single worker runs them one at a time in submission order.
///
/// The worker is a thread owned by the scheduler, named after its priority
/// (`observa-task-worker:<priority>`). It does not depend on any tokio
/// runtime the caller happens to run in, so blocking the calling thread or
/// shutting that runtime down never stalls or drops deliveries.
///
/// Dropping the scheduler (or calling [`cancel`](Self::cancel)) stops the
/// worker: an action already running finishes, actions still queued are
/// dropped without running.
///
/// [`schedule`]: Scheduler::schedule
pub struct TaskScheduler {
    sender: mpsc::UnboundedSender<Action>,
    token: CancellationToken,
    priority: WorkerPriority,
    worker: thread::JoinHandle<()>,
}

impl TaskScheduler {
    pub fn new() -> Result<Self, SchedulerError> {
        Self::with_priority(WorkerPriority::default())
    }

    pub fn with_priority(priority: WorkerPriority) -> Result<Self, SchedulerError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let span = debug_span!("task_worker", priority = priority.as_str());
        let work = drain(receiver, token.clone(), priority).instrument(span);

        let worker = thread::Builder::new()
            .name(priority.worker_thread_name())
            .spawn(move || futures::executor::block_on(work))?;
        debug!(%priority, "task scheduler started");

        Ok(Self {
            sender,
            token,
            priority,
            worker,
        })
    }

    pub fn priority(&self) -> WorkerPriority {
        self.priority
    }

    /// Stop the worker now. Later actions are dropped.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the worker loop has exited.
    pub fn is_worker_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

async fn drain(
    mut receiver: mpsc::UnboundedReceiver<Action>,
    token: CancellationToken,
    priority: WorkerPriority,
) {
    let mut executed: u64 = 0;
    loop {
        let action = tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(executed, "task worker cancelled; dropping pending actions");
                break;
            }
            next = receiver.recv() => match next {
                Some(action) => action,
                None => {
                    debug!(executed, "task worker channel closed");
                    break;
                }
            },
        };

        action();
        executed = executed.saturating_add(1);

        if priority.yields_between_actions() {
            thread::yield_now();
        }
    }
}

impl Scheduler for TaskScheduler {
    fn wants_immediate_initial_delivery(&self) -> bool {
        false
    }

    fn schedule(&self, action: Action) {
        if self.sender.send(action).is_err() {
            trace!("task worker is gone; action dropped");
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // The worker handle is detached, not joined: the last reference may
        // be released from inside an action.
        self.token.cancel();
        trace!(priority = %self.priority, "task scheduler released");
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("priority", &self.priority)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}
