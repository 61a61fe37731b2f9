/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Invigilator matching and propagation.
//!
//! * [`InvigilatorMatcher`] lists the instructors who can watch an exam: free
//!   on its day and hour according to their availability records, and not
//!   already watching a different exam at that slot.
//! * [`InvigilatorPropagator`] posts instructors to (exam, hall) and fans the
//!   posting out to every other exam sharing the hall at that slot.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::halls::co_located;
use crate::model::{
    Exam, ExamId, HallId, Instructor, InstructorContact, InstructorId, InvigilatorAssignment, Slot,
};
use crate::parse::{clock_matches, day_matches};
use crate::store::EntityStore;

/// `true` when one of `instructor`'s availability days names the slot's day
/// and month and lists its hour and minute.
///
/// Tokens that cannot be parsed never match.
pub fn is_available(instructor: &Instructor, slot: Slot) -> bool {
    instructor
        .availability
        .iter()
        .filter(|day| day_matches(&day.date, slot.date))
        .any(|day| day.times.iter().any(|t| clock_matches(t, slot.time)))
}

async fn require_exam<S: EntityStore + ?Sized>(store: &S, id: ExamId) -> EngineResult<Exam> {
    store
        .get_exam(id)
        .await?
        .ok_or(EngineError::ExamNotFound(id))
}

// ── InvigilatorMatcher ────────────────────────────────────────────────────────

pub struct InvigilatorMatcher<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> InvigilatorMatcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Instructors available for `exam_id`, ordered by id.
    ///
    /// # Errors
    /// `ExamNotFound` if the exam does not exist, `ExamNotScheduled` if it
    /// has no date or time.
    pub async fn find_available(&self, exam_id: ExamId) -> EngineResult<Vec<InstructorContact>> {
        let exam = require_exam(self.store, exam_id).await?;
        let slot = exam.slot().ok_or(EngineError::ExamNotScheduled(exam_id))?;

        let mut busy: BTreeSet<InstructorId> = BTreeSet::new();
        for other in self.store.exams_at(slot).await? {
            if other.id == exam_id {
                continue;
            }
            busy.extend(
                self.store
                    .assignments_for_exam(other.id)
                    .await?
                    .into_iter()
                    .map(|a| a.instructor),
            );
        }
        let already_here: BTreeSet<InstructorId> = self
            .store
            .assignments_for_exam(exam_id)
            .await?
            .into_iter()
            .map(|a| a.instructor)
            .collect();

        let instructors = self.store.list_instructors().await?;
        let total = instructors.len();
        let found: Vec<InstructorContact> = instructors
            .iter()
            .filter(|i| is_available(i, slot))
            .filter(|i| !busy.contains(&i.id) || already_here.contains(&i.id))
            .map(InstructorContact::from)
            .collect();

        info!(
            exam = %exam_id,
            slot = %slot,
            instructors = total,
            busy = busy.len(),
            available = found.len(),
            "invigilator search"
        );
        Ok(found)
    }
}

// ── InvigilatorPropagator ─────────────────────────────────────────────────────

pub struct InvigilatorPropagator<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> InvigilatorPropagator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn require_hall(&self, hall: HallId) -> EngineResult<()> {
        match self.store.get_hall(hall).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::HallNotFound(hall)),
        }
    }

    /// Post each of `instructors` to (`exam_id`, `hall`) and to every other
    /// exam at the same slot with at least one examinee seated in `hall`.
    ///
    /// Returns every assignment ensured, created or already present.
    /// Unknown instructor ids are skipped.
    ///
    /// # Errors
    /// `ExamNotFound` / `HallNotFound` for an unknown exam or hall.
    pub async fn assign(
        &self,
        exam_id: ExamId,
        hall: HallId,
        instructors: &[InstructorId],
    ) -> EngineResult<Vec<InvigilatorAssignment>> {
        let exam = require_exam(self.store, exam_id).await?;
        self.require_hall(hall).await?;

        let sharing: Vec<ExamId> = co_located(self.store, &exam)
            .await?
            .into_iter()
            .filter(|(_, rows)| rows.iter().any(|r| r.is_seated_in(hall)))
            .map(|(other, _)| other.id)
            .collect();

        info!(
            exam = %exam_id,
            hall = %hall,
            instructors = instructors.len(),
            sharing = sharing.len(),
            "=== InvigilatorPropagator::assign() ==="
        );

        let mut ensured: BTreeSet<InvigilatorAssignment> = BTreeSet::new();
        for &instructor in instructors {
            if self.store.get_instructor(instructor).await?.is_none() {
                warn!(exam = %exam_id, instructor = %instructor, "unknown instructor — skipped");
                continue;
            }
            for target in std::iter::once(exam_id).chain(sharing.iter().copied()) {
                let assignment = InvigilatorAssignment {
                    exam: target,
                    hall,
                    instructor,
                };
                let created = self.store.ensure_assignment(assignment).await?;
                debug!(exam = %target, hall = %hall, instructor = %instructor, created, "posted");
                ensured.insert(assignment);
            }
        }
        Ok(ensured.into_iter().collect())
    }

    /// Remove one posting.  Returns `true` if it existed.
    ///
    /// Postings made on co-located exams are left alone.
    pub async fn remove(
        &self,
        exam_id: ExamId,
        hall: HallId,
        instructor: InstructorId,
    ) -> EngineResult<bool> {
        require_exam(self.store, exam_id).await?;
        let removed = self
            .store
            .delete_assignment(InvigilatorAssignment {
                exam: exam_id,
                hall,
                instructor,
            })
            .await?;
        info!(exam = %exam_id, hall = %hall, instructor = %instructor, removed, "invigilator removed");
        Ok(removed)
    }

    /// Instructors posted to (`exam_id`, `hall`), ordered by id.
    pub async fn posted(&self, exam_id: ExamId, hall: HallId) -> EngineResult<Vec<InstructorContact>> {
        require_exam(self.store, exam_id).await?;
        self.require_hall(hall).await?;

        let mut out = Vec::new();
        for a in self.store.assignments_for_exam(exam_id).await? {
            if a.hall != hall {
                continue;
            }
            if let Some(instructor) = self.store.get_instructor(a.instructor).await? {
                out.push(InstructorContact::from(&instructor));
            }
        }
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
