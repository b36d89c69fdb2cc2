//! 命令引擎错误定义

use thiserror::Error;
use zdraft_core::patch::PatchError;
use zdraft_core::validation::ValidationError;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No active command")]
    NoActiveCommand,

    #[error("No pending acquisition")]
    NoPendingAcquisition,

    #[error("Acquisition mismatch: expected {expected}")]
    AcquisitionMismatch { expected: &'static str },

    #[error("Expected {expected} contents, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Content not selectable: {0:?}")]
    NotSelectable(Vec<usize>),

    #[error("Content {0} cannot be deleted")]
    NotDeletable(usize),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
