/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Equivalent-course propagation.
//!
//! Courses in one equivalence group sit their exams together: whenever an
//! exam is placed or reset, the exams of every equivalent course follow, and
//! their Schedule rows are created or removed to match.  Propagation is one
//! level deep (direct group members only) and every write is idempotent.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::model::{Exam, ExamId, Slot};
use crate::store::{EntityStore, StoreResult};

pub struct EquivalencePropagator<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> EquivalencePropagator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Exams of every course equivalent to `exam`'s course, `exam` excluded,
    /// ordered by id.
    pub async fn equivalent_exams(&self, exam: &Exam) -> StoreResult<Vec<Exam>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for course in self.store.equivalent_courses(exam.course).await? {
            for other in self.store.exams_for_course(course).await? {
                if other.id != exam.id && seen.insert(other.id) {
                    out.push(other);
                }
            }
        }
        out.sort_by_key(|e| e.id);
        Ok(out)
    }

    /// Create one Schedule row per student enrolled in `exam`'s course.
    /// Returns the number of rows created.
    pub async fn ensure_rows(&self, exam: &Exam) -> StoreResult<usize> {
        let mut created = 0;
        for student in self.store.enrolled_students(exam.course).await? {
            if self
                .store
                .ensure_schedule_row(exam.id, student, Some(exam.college.clone()))
                .await?
            {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Create `exam`'s Schedule rows, then set its slot, without touching
    /// equivalent exams.
    ///
    /// The slot is written last: if a row write fails the exam stays
    /// unscheduled and a later run picks it up again.
    pub async fn place_one(&self, exam: &Exam, slot: Slot) -> StoreResult<()> {
        self.place_group(&[exam], slot).await
    }

    /// Place every exam of `members` at `slot`, or none of them.
    ///
    /// Rows for all members are created first; slots are set afterwards.  A
    /// slot write failure clears the slots already set in this call.  Rows
    /// created before a failure stay (they are idempotent and unseated).
    pub async fn place_group(&self, members: &[&Exam], slot: Slot) -> StoreResult<()> {
        for exam in members {
            let created = self.ensure_rows(exam).await?;
            debug!(exam = %exam.id, rows_created = created, "schedule rows ready");
        }

        for (i, exam) in members.iter().enumerate() {
            if let Err(error) = self.store.set_exam_slot(exam.id, Some(slot)).await {
                for placed in &members[..i] {
                    if let Err(undo) = self.store.set_exam_slot(placed.id, None).await {
                        warn!(exam = %placed.id, error = %undo, "could not clear slot after failed group commit");
                    }
                }
                return Err(error);
            }
            debug!(exam = %exam.id, slot = %slot, "exam placed");
        }
        Ok(())
    }

    /// Place `exam` at `slot` together with every equivalent exam.
    ///
    /// Returns the ids of all exams placed, `exam` first.
    pub async fn place(&self, exam: &Exam, slot: Slot) -> StoreResult<Vec<ExamId>> {
        let equivalents = self.equivalent_exams(exam).await?;
        let members: Vec<&Exam> = std::iter::once(exam).chain(equivalents.iter()).collect();
        self.place_group(&members, slot).await?;

        if !equivalents.is_empty() {
            info!(
                exam = %exam.id,
                slot = %slot,
                equivalents = equivalents.len(),
                "slot propagated to equivalent exams"
            );
        }
        Ok(members.iter().map(|e| e.id).collect())
    }

    /// Clear `exam`'s slot and delete its Schedule rows and invigilator
    /// assignments, then do the same for every equivalent exam.
    ///
    /// Returns the ids of all exams reset, `exam` first.
    pub async fn reset(&self, exam: &Exam) -> StoreResult<Vec<ExamId>> {
        let equivalents = self.equivalent_exams(exam).await?;
        let mut reset = Vec::with_capacity(equivalents.len() + 1);
        for target in std::iter::once(exam).chain(equivalents.iter()) {
            self.store.set_exam_slot(target.id, None).await?;
            let rows = self.store.delete_schedule_rows(target.id).await?;
            let postings = self.store.delete_assignments_for_exam(target.id).await?;
            debug!(exam = %target.id, rows, postings, "exam reset");
            reset.push(target.id);
        }
        info!(exam = %exam.id, reset = reset.len(), "exam reset with equivalents");
        Ok(reset)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
