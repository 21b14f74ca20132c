//! Delivery schedulers for live value observations.
//!
//! An observation computes fresh values somewhere off the caller's thread and
//! hands each one to a [`Scheduler`], which decides *when* and *where* the
//! observer callback runs. Every scheduler delivers the actions of one
//! instance in submission order, one at a time. Nothing is promised about the
//! relative order of two different instances.
//!
//! Built-in schedulers:
//!
//! - [`ImmediateMainScheduler`]: first value synchronously on the main context,
//!   later values posted to it.
//! - [`DeferredMainScheduler`]: every value posted to the main context.
//! - [`AsyncQueueScheduler`]: every value posted to a serial queue.
//! - [`TaskScheduler`]: every value delivered by a dedicated background worker.

pub mod config;
pub mod error;
pub mod main_context;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use config::{SchedulerConfig, SchedulerKind};
pub use error::SchedulerError;
pub use main_context::{MainContext, MainLoop, MainLoopHandle, install_main_context, main_context};
pub use queue::{SerialExecutor, SerialQueue};
pub use scheduler::{
    AsyncQueueScheduler, DeferredMainScheduler, ImmediateMainScheduler, MainScheduler,
};
pub use task::{TaskScheduler, WorkerPriority};

/// A unit of delivery work: "notify the observer with the latest value".
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// The capability every delivery scheduler implements.
///
/// Observation layers hold schedulers as `Arc<dyn Scheduler>` and never
/// depend on a concrete variant.
pub trait Scheduler: Send + Sync {
    /// Whether the initial value should be delivered synchronously, on the
    /// calling thread.
    ///
    /// Schedulers bound to the main context may panic here when called from
    /// another thread: starting such an observation off the main context is a
    /// programming error.
    fn wants_immediate_initial_delivery(&self) -> bool;

    /// Submit an action for eventual execution on the scheduler's context.
    ///
    /// Never blocks. Actions submitted to one instance run in submission
    /// order and never overlap.
    fn schedule(&self, action: Action);
}

/// Helpers derived from [`Scheduler`], available on every scheduler.
pub trait SchedulerExt: Scheduler {
    /// Deliver the initial value: inline when the scheduler asks for
    /// immediate delivery, through [`Scheduler::schedule`] otherwise.
    fn schedule_initial(&self, action: Action) {
        if self.wants_immediate_initial_delivery() {
            action();
        } else {
            self.schedule(action);
        }
    }
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}

/// Abort the current call path on API misuse.
#[cold]
#[track_caller]
pub(crate) fn contract_violation(message: &str) -> ! {
    tracing::error!(%message, "scheduler contract violation");
    panic!("contract violation: {message}");
}

#[cfg(test)]
mod test_utils;
