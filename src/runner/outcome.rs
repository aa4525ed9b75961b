//! Captured result of one unit of work

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use super::TaskCallback;
use crate::context::panic_message;

/// Why a unit of work did not produce a value
#[derive(Debug, Error)]
pub enum WorkError<E> {
    /// The work returned `Err`; the original value is kept as-is
    #[error("{0}")]
    Failed(E),

    /// The work panicked
    #[error("work panicked: {message}")]
    Panicked { message: String },
}

impl<E> WorkError<E> {
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// The error the work returned, if it returned one
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Panicked { .. } => None,
        }
    }

    pub fn panic_message(&self) -> Option<&str> {
        match self {
            Self::Failed(_) => None,
            Self::Panicked { message } => Some(message),
        }
    }
}

/// Exactly one of a value or a [`WorkError`]
#[derive(Debug)]
pub enum TaskOutcome<R, E> {
    Success(R),
    Failure(WorkError<E>),
}

impl<R, E> TaskOutcome<R, E> {
    /// Run `work` and capture whatever it produces, panics included
    pub fn capture<W>(work: W) -> Self
    where
        W: FnOnce() -> std::result::Result<R, E>,
    {
        match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Self::Success(value),
            Ok(Err(e)) => Self::Failure(WorkError::Failed(e)),
            Err(payload) => Self::Failure(WorkError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> std::result::Result<R, WorkError<E>> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(e) => Err(e),
        }
    }

    /// Hand the outcome to exactly one terminal callback
    pub fn deliver<C>(self, callback: C)
    where
        C: TaskCallback<R, E>,
    {
        match self {
            Self::Success(value) => callback.on_success(value),
            Self::Failure(e) => callback.on_failure(e),
        }
    }
}

impl<R, E> From<std::result::Result<R, E>> for TaskOutcome<R, E> {
    fn from(result: std::result::Result<R, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Failure(WorkError::Failed(e)),
        }
    }
}
