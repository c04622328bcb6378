//! Floor error types

use crate::db::{CommitteeStatus, DbError};
use thiserror::Error;

/// A referenced row that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("Committee not found: {0}")]
    Committee(i64),
    #[error("Committee session not found: {0}")]
    Session(i64),
    #[error("No active session for committee {0}")]
    ActiveSession(i64),
    #[error("Speaker list not found: {0}")]
    SpeakerList(i64),
    #[error("No speaker lists available for committee {0}")]
    SpeakerLists(i64),
    #[error("Motion not found: {0}")]
    Motion(i64),
    #[error("Delegate not found: {0}")]
    Delegate(i64),
}

/// An operation that is valid in general but not against the current floor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateViolation {
    #[error("No waiting speakers in list {0}")]
    NoWaitingSpeaker(i64),
    #[error("No current speaker in list {0}")]
    NoCurrentSpeaker(i64),
    #[error("Speaker list {0} would have more than one speaker")]
    MultipleSpeakers(i64),
    #[error("Committee must be in preparation or paused status (is {0})")]
    CommitteeNotStartable(CommitteeStatus),
}

/// Errors surfaced by floor operations
#[derive(Debug, Error)]
pub enum FloorError {
    #[error(transparent)]
    NotFound(#[from] Missing),
    #[error("Speaker list {list_id} does not belong to motion {motion_id}")]
    ListMismatch { motion_id: i64, list_id: i64 },
    #[error(transparent)]
    InvalidState(#[from] StateViolation),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] DbError),
}

impl FloorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> FloorErrorKind {
        match self {
            Self::NotFound(_) => FloorErrorKind::NotFound,
            Self::ListMismatch { .. } => FloorErrorKind::Conflict,
            Self::InvalidState(_) => FloorErrorKind::InvalidState,
            Self::Validation(_) => FloorErrorKind::Validation,
            Self::Store(_) => FloorErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for FloorError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(DbError::from(err))
    }
}

/// Error classification for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorErrorKind {
    /// Referenced committee/session/list/motion/delegate absent
    NotFound,
    /// List does not belong to the motion
    Conflict,
    /// Re-poll the board and decide again
    InvalidState,
    /// Malformed request
    Validation,
    /// Store failure or lock contention; the write did not happen
    Internal,
}

impl FloorErrorKind {
    /// Every write is all-or-nothing, so only store failures are worth
    /// resubmitting unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Internal)
    }
}
