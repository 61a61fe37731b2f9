/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the exam engine.
//!
//! Two layers, matching the two places things can fail:
//!
//! * [`StoreError`](crate::store::StoreError): the entity store could not
//!   read or write a record.
//! * [`EngineError`]: an engine operation could not run for its target
//!   (unknown exam / hall / instructor, or a store failure outside a batch).
//!
//! Unparseable availability tokens and exhausted constraints (no free day, no
//! seats left) are **not** errors: they surface as "no match" or as the
//! entity staying unscheduled / unseated.
//!
//! | Variant | Request-layer status |
//! |---|---|
//! | `ExamNotFound` / `HallNotFound` / `InstructorNotFound` | not found |
//! | `ExamNotScheduled` | not found |
//! | `Store` | internal error |

use thiserror::Error;

use crate::model::{ExamId, HallId, InstructorId};
use crate::store::StoreError;

/// Result alias used by every engine operation.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error returned from [`ExamEngine`](crate::engine::ExamEngine)
/// operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),

    /// The operation needs the exam's date and time, and at least one is
    /// missing.
    #[error("exam {0} has no date or time")]
    ExamNotScheduled(ExamId),

    #[error("hall {0} not found")]
    HallNotFound(HallId),

    #[error("instructor {0} not found")]
    InstructorNotFound(InstructorId),

    #[error("entity store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// `true` for every variant the request layer reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::ExamNotFound(_)
                | EngineError::ExamNotScheduled(_)
                | EngineError::HallNotFound(_)
                | EngineError::InstructorNotFound(_)
                | EngineError::Store(StoreError::NotFound(_))
        )
    }
}
