/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Entity store abstraction.
//!
//! The engine never touches persistence directly: every read and write goes
//! through [`EntityStore`].  Production deployments back it with their
//! database; [`InMemoryStore`] backs tests, demos and the CLI.
//!
//! Every method is a suspension point (`async`); the allocation algorithms
//! themselves are synchronous and run between store calls.
//!
//! # Idempotent writes
//! `ensure_*` methods insert only when the natural key is absent and report
//! whether a row was created, so every engine operation can be retried from
//! scratch without duplicating Schedule rows or invigilator assignments.

pub mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::{Dataset, InMemoryStore};

use async_trait::async_trait;

use crate::model::{
    CourseId, Exam, ExamId, Hall, HallId, Instructor, InstructorId, InvigilatorAssignment,
    ScheduleRow, Slot, Student, StudentId,
};

/// Read/write access to the records the engine works on.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ==================== Exams ====================

    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>>;

    /// All exams, ordered by id.
    async fn list_exams(&self) -> StoreResult<Vec<Exam>>;

    /// Exams with no date, ordered by id.
    async fn list_unscheduled_exams(&self) -> StoreResult<Vec<Exam>>;

    /// Exams sitting at exactly `slot`, ordered by id.
    async fn exams_at(&self, slot: Slot) -> StoreResult<Vec<Exam>>;

    /// Exams set for `course`, ordered by id.
    async fn exams_for_course(&self, course: CourseId) -> StoreResult<Vec<Exam>>;

    /// Set (`Some`) or clear (`None`) an exam's date and time.
    ///
    /// # Errors
    /// `StoreError::NotFound` if the exam does not exist.
    async fn set_exam_slot(&self, id: ExamId, slot: Option<Slot>) -> StoreResult<()>;

    // ==================== Enrollment & equivalence ====================

    /// Students enrolled in `course`, ordered by id.
    async fn enrolled_students(&self, course: CourseId) -> StoreResult<Vec<StudentId>>;

    /// Every course sharing an equivalence group with `course`, excluding
    /// `course` itself, deduplicated and ordered by id.
    async fn equivalent_courses(&self, course: CourseId) -> StoreResult<Vec<CourseId>>;

    // ==================== Students ====================

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>>;

    // ==================== Halls ====================

    async fn get_hall(&self, id: HallId) -> StoreResult<Option<Hall>>;

    // ==================== Schedule rows ====================

    /// Rows of `exam`, ordered by student id.
    async fn schedule_rows_for_exam(&self, exam: ExamId) -> StoreResult<Vec<ScheduleRow>>;

    /// Create the (exam, student) row if absent.  Returns `true` if created.
    async fn ensure_schedule_row(
        &self,
        exam: ExamId,
        student: StudentId,
        college: Option<String>,
    ) -> StoreResult<bool>;

    /// Seat the given students of `exam` in `hall`.
    ///
    /// # Errors
    /// `StoreError::NotFound` if any (exam, student) row is missing; no row
    /// is changed in that case.
    async fn seat_students(
        &self,
        exam: ExamId,
        hall: HallId,
        students: &[StudentId],
    ) -> StoreResult<()>;

    /// Delete every row of `exam`.  Returns the number removed.
    async fn delete_schedule_rows(&self, exam: ExamId) -> StoreResult<usize>;

    // ==================== Instructors ====================

    async fn get_instructor(&self, id: InstructorId) -> StoreResult<Option<Instructor>>;

    /// All instructors with their availability, ordered by id.
    async fn list_instructors(&self) -> StoreResult<Vec<Instructor>>;

    // ==================== Invigilator assignments ====================

    /// Assignments of `exam`, ordered by (hall, instructor).
    async fn assignments_for_exam(&self, exam: ExamId) -> StoreResult<Vec<InvigilatorAssignment>>;

    /// Create the assignment if absent.  Returns `true` if created.
    async fn ensure_assignment(&self, assignment: InvigilatorAssignment) -> StoreResult<bool>;

    /// Remove one assignment.  Returns `true` if it existed.
    async fn delete_assignment(&self, assignment: InvigilatorAssignment) -> StoreResult<bool>;

    /// Remove every assignment of `exam`.  Returns the number removed.
    async fn delete_assignments_for_exam(&self, exam: ExamId) -> StoreResult<usize>;
}
