use std::sync::Arc;
use std::thread;

use tracing::trace;

use crate::main_context::{MainContext, require_main_context};
use crate::queue::{SerialExecutor, SerialQueue};
use crate::{Action, Scheduler, SchedulerError, contract_violation};

/// A scheduler whose delivery context is the main context.
pub trait MainScheduler: Scheduler {
    /// Post an action to the main context. Never runs it inline.
    fn schedule_on_main(&self, action: Action);
}

/// Delivers the initial value synchronously, then posts every later value to
/// the main context.
///
/// The observation must be started from the main context:
/// [`wants_immediate_initial_delivery`](Scheduler::wants_immediate_initial_delivery)
/// panics on any other thread.
///
/// Actions already posted to the main context still run after the scheduler
/// is dropped. Only [`TaskScheduler`](crate::TaskScheduler) discards pending
/// work on release.
#[derive(Clone)]
pub struct ImmediateMainScheduler {
    context: Arc<dyn MainContext>,
}

impl ImmediateMainScheduler {
    /// Target the process-wide main context.
    ///
    /// Panics if the host has not called
    /// [`install_main_context`](crate::install_main_context).
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_context(require_main_context())
    }

    pub fn with_context(context: Arc<dyn MainContext>) -> Self {
        Self { context }
    }
}

impl Scheduler for ImmediateMainScheduler {
    fn wants_immediate_initial_delivery(&self) -> bool {
        if !self.context.is_current() {
            let current = thread::current();
            contract_violation(&format!(
                "observation must be started from the main context (called from thread '{}')",
                current.name().unwrap_or("<unnamed>")
            ));
        }
        true
    }

    fn schedule(&self, action: Action) {
        self.schedule_on_main(action);
    }
}

impl MainScheduler for ImmediateMainScheduler {
    fn schedule_on_main(&self, action: Action) {
        self.context.execute(action);
    }
}

/// Posts every value, including the initial one, to the main context.
///
/// Never delivers synchronously, even when the observation starts on the
/// main context. Same release semantics as [`ImmediateMainScheduler`].
#[derive(Clone)]
pub struct DeferredMainScheduler {
    context: Arc<dyn MainContext>,
}

impl DeferredMainScheduler {
    /// Target the process-wide main context.
    ///
    /// Panics if the host has not called
    /// [`install_main_context`](crate::install_main_context).
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_context(require_main_context())
    }

    pub fn with_context(context: Arc<dyn MainContext>) -> Self {
        Self { context }
    }
}

impl Scheduler for DeferredMainScheduler {
    fn wants_immediate_initial_delivery(&self) -> bool {
        false
    }

    fn schedule(&self, action: Action) {
        self.schedule_on_main(action);
    }
}

impl MainScheduler for DeferredMainScheduler {
    fn schedule_on_main(&self, action: Action) {
        self.context.execute(action);
    }
}

/// Posts every value to a serial queue.
///
/// The queue must be serial, see [`SerialExecutor`]. Actions already handed
/// to the queue still run after the scheduler is dropped.
#[derive(Clone)]
pub struct AsyncQueueScheduler {
    queue: Arc<dyn SerialExecutor>,
}

impl AsyncQueueScheduler {
    pub fn new<Q: SerialExecutor + 'static>(queue: Q) -> Self {
        Self::from_shared(Arc::new(queue))
    }

    pub fn from_shared(queue: Arc<dyn SerialExecutor>) -> Self {
        Self { queue }
    }

    /// Deliver on a private [`SerialQueue`] with the given label.
    pub fn on_serial_queue(label: impl Into<String>) -> Result<Self, SchedulerError> {
        Ok(Self::new(SerialQueue::new(label)?))
    }

    pub fn queue_label(&self) -> &str {
        self.queue.label()
    }
}

impl Scheduler for AsyncQueueScheduler {
    fn wants_immediate_initial_delivery(&self) -> bool {
        false
    }

    fn schedule(&self, action: Action) {
        trace!(queue = self.queue.label(), "scheduling on serial queue");
        self.queue.execute(action);
    }
}
