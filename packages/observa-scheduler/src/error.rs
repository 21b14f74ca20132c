//! Recoverable scheduler setup errors.
//!
//! Misuse of a scheduler (wrong thread, missing main context on a direct
//! constructor) is not represented here: it panics, see the crate docs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("a main context is already installed for this process")]
    MainContextAlreadyInstalled,

    #[error("no main context is installed; call install_main_context first")]
    MainContextMissing,

    #[error("unknown scheduler kind: {0}")]
    UnknownKind(String),

    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}
