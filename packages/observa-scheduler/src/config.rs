//! Selecting a scheduler from host settings.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::main_context::main_context;
use crate::scheduler::{AsyncQueueScheduler, DeferredMainScheduler, ImmediateMainScheduler};
use crate::task::{TaskScheduler, WorkerPriority};
use crate::{Scheduler, SchedulerError};

/// Label of the private serial queue created for [`SchedulerKind::AsyncQueue`].
pub const DEFAULT_QUEUE_LABEL: &str = "observa.delivery";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// [`ImmediateMainScheduler`]
    Immediate,
    /// [`DeferredMainScheduler`]
    #[default]
    MainActor,
    /// [`TaskScheduler`]
    Task,
    /// [`AsyncQueueScheduler`] on a private serial queue
    AsyncQueue,
}

impl SchedulerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::MainActor => "main_actor",
            Self::Task => "task",
            Self::AsyncQueue => "async_queue",
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulerKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "immediate" => Ok(Self::Immediate),
            "main_actor" | "main" => Ok(Self::MainActor),
            "task" => Ok(Self::Task),
            "async_queue" | "async" => Ok(Self::AsyncQueue),
            _ => Err(SchedulerError::UnknownKind(s.to_string())),
        }
    }
}

/// Serializable description of the scheduler an observation should use.
///
/// ```json
/// { "kind": "task", "priority": "background" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub kind: SchedulerKind,
    /// Only used by [`SchedulerKind::Task`].
    pub priority: Option<WorkerPriority>,
    /// Only used by [`SchedulerKind::AsyncQueue`].
    pub queue_label: Option<String>,
}

impl SchedulerConfig {
    pub fn new(kind: SchedulerKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: WorkerPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_queue_label(mut self, label: impl Into<String>) -> Self {
        self.queue_label = Some(label.into());
        self
    }

    /// Build the described scheduler.
    ///
    /// Main-context kinds require an installed main context.
    pub fn build(&self) -> Result<Arc<dyn Scheduler>, SchedulerError> {
        let scheduler: Arc<dyn Scheduler> = match self.kind {
            SchedulerKind::Immediate => {
                let context = main_context().ok_or(SchedulerError::MainContextMissing)?;
                Arc::new(ImmediateMainScheduler::with_context(context))
            }
            SchedulerKind::MainActor => {
                let context = main_context().ok_or(SchedulerError::MainContextMissing)?;
                Arc::new(DeferredMainScheduler::with_context(context))
            }
            SchedulerKind::Task => {
                Arc::new(TaskScheduler::with_priority(self.priority.unwrap_or_default())?)
            }
            SchedulerKind::AsyncQueue => Arc::new(AsyncQueueScheduler::on_serial_queue(
                self.queue_label.as_deref().unwrap_or(DEFAULT_QUEUE_LABEL),
            )?),
        };

        debug!(kind = %self.kind, "scheduler built from config");
        Ok(scheduler)
    }
}
