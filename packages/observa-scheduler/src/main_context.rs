//! The process-wide main context.
//!
//! Some observers must be notified on one privileged thread, typically the
//! thread running the application's UI event loop. The host owns that thread
//! and installs a [`MainContext`] describing it; schedulers only query and
//! target it.

use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::queue::SerialExecutor;
use crate::{Action, SchedulerError, contract_violation};

/// A serial executor bound to one thread, which can tell whether the caller
/// is running on it.
pub trait MainContext: SerialExecutor {
    fn is_current(&self) -> bool;
}

static MAIN_CONTEXT: OnceLock<Arc<dyn MainContext>> = OnceLock::new();

/// Register the main context of this process. Can only succeed once.
pub fn install_main_context(context: Arc<dyn MainContext>) -> Result<(), SchedulerError> {
    let label = context.label().to_owned();
    MAIN_CONTEXT
        .set(context)
        .map_err(|_| SchedulerError::MainContextAlreadyInstalled)?;
    debug!(label = %label, "main context installed");
    Ok(())
}

/// The installed main context, if any.
pub fn main_context() -> Option<Arc<dyn MainContext>> {
    MAIN_CONTEXT.get().cloned()
}

pub(crate) fn require_main_context() -> Arc<dyn MainContext> {
    match main_context() {
        Some(context) => context,
        None => contract_violation(
            "no main context is installed; the host must call install_main_context \
             before creating main-context schedulers",
        ),
    }
}

/// A minimal main-thread run loop.
///
/// Create it on the thread that should act as the main context, hand out
/// [`MainLoopHandle`]s, and drive it from that same thread with
/// [`run_pending`](Self::run_pending) or [`run`](Self::run). `MainLoop` is
/// `!Send`, so it cannot be driven from anywhere else.
pub struct MainLoop {
    thread: ThreadId,
    sender: mpsc::UnboundedSender<Action>,
    receiver: mpsc::UnboundedReceiver<Action>,
    _not_send: PhantomData<*const ()>,
}

impl MainLoop {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            thread: thread::current().id(),
            sender,
            receiver,
            _not_send: PhantomData,
        }
    }

    pub fn handle(&self) -> MainLoopHandle {
        MainLoopHandle {
            thread: self.thread,
            sender: self.sender.clone(),
        }
    }

    /// Run every queued action, including actions enqueued while draining,
    /// without waiting for more. Returns how many actions ran.
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(action) = self.receiver.try_recv() {
            action();
            executed += 1;
        }
        executed
    }

    /// Run actions until every [`MainLoopHandle`] has been dropped.
    ///
    /// Blocks the thread; must not be called from within an async runtime.
    pub fn run(self) {
        let Self {
            sender,
            mut receiver,
            ..
        } = self;
        drop(sender);

        let mut executed: u64 = 0;
        while let Some(action) = receiver.blocking_recv() {
            action();
            executed = executed.saturating_add(1);
        }
        debug!(executed, "main loop finished");
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe reference to a [`MainLoop`].
#[derive(Clone, Debug)]
pub struct MainLoopHandle {
    thread: ThreadId,
    sender: mpsc::UnboundedSender<Action>,
}

impl SerialExecutor for MainLoopHandle {
    fn execute(&self, action: Action) {
        if self.sender.send(action).is_err() {
            warn!("main loop has shut down; action dropped");
        }
    }

    fn label(&self) -> &str {
        "main"
    }
}

impl MainContext for MainLoopHandle {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }
}
