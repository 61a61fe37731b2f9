/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Engine facade.
//!
//! [`ExamEngine`] is the single entry point callers use.  Each public
//! operation takes the engine's transaction lock for its whole duration, so
//! two operations never interleave their store reads and writes (two hall
//! allocations for one exam cannot both see the same unseated rows).
//!
//! # Operation table
//!
//! | Operation | Writes |
//! |---|---|
//! | [`schedule_unassigned_exams`](ExamEngine::schedule_unassigned_exams) | exam slots, Schedule rows |
//! | [`allocate_halls`](ExamEngine::allocate_halls) | seats, copied postings |
//! | [`find_available_invigilators`](ExamEngine::find_available_invigilators) | none |
//! | [`assign_invigilators`](ExamEngine::assign_invigilators) | postings |
//! | [`place_exam`](ExamEngine::place_exam) / [`reset_exam`](ExamEngine::reset_exam) | exam slots, rows, postings |
//! | [`remove_invigilator`](ExamEngine::remove_invigilator) | postings |
//! | reports | none |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::equivalence::EquivalencePropagator;
use crate::error::{EngineError, EngineResult};
use crate::halls::{HallAllocation, HallAllocator, HallUsageReport};
use crate::invigilators::{InvigilatorMatcher, InvigilatorPropagator};
use crate::model::{
    CourseId, Exam, ExamId, HallId, InstructorContact, InstructorId, InvigilatorAssignment, Slot,
    Student,
};
use crate::reports::{self, HallPosting, StudentConflict};
use crate::scheduler::{Candidate, TimetableScheduler};
use crate::store::EntityStore;

// ── Scheduling outcome ────────────────────────────────────────────────────────

/// An exam whose commit failed during a batch run.
#[derive(Debug)]
pub struct ExamFailure {
    pub exam: ExamId,
    pub error: EngineError,
}

/// Result of one scheduling run.
#[derive(Debug, Default)]
pub struct SchedulingOutcome {
    /// Every exam given a slot in this run, equivalent exams included.
    pub placements: BTreeMap<ExamId, Slot>,
    /// Exams for which no exam day was acceptable.
    pub unplaced: Vec<ExamId>,
    /// Exams whose slot could not be read or written.
    pub failures: Vec<ExamFailure>,
}

impl SchedulingOutcome {
    /// `true` when no exam failed to commit.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How an unscheduled exam enters a run.
enum Intake {
    /// An equivalent exam already sits at this slot; follow it.
    Adopt(Slot),
    /// Plan it, with its unscheduled equivalents in tow.
    Plan(Candidate),
}

// ── ExamEngine ────────────────────────────────────────────────────────────────

pub struct ExamEngine<S: EntityStore + ?Sized> {
    store: Arc<S>,
    config: EngineConfig,
    scheduler: TimetableScheduler,
    txn: Mutex<()>,
}

impl<S: EntityStore + ?Sized> ExamEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let scheduler = TimetableScheduler::new(config.scheduling.clone());
        Self {
            store,
            config,
            scheduler,
            txn: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Timetable scheduling ──────────────────────────────────────────────────

    /// Schedule every exam without a date, starting tomorrow (local time).
    pub async fn schedule_unassigned_exams(&self) -> EngineResult<SchedulingOutcome> {
        let today = chrono::Local::now().date_naive();
        self.schedule_unassigned_exams_from(today).await
    }

    /// Schedule every exam without a date on the exam days after `today`.
    ///
    /// A failure to read or commit one exam is logged and recorded in the
    /// outcome; the run carries on with the others.
    ///
    /// # Errors
    /// `Store` only when the list of unscheduled exams cannot be read.
    pub async fn schedule_unassigned_exams_from(
        &self,
        today: NaiveDate,
    ) -> EngineResult<SchedulingOutcome> {
        let _txn = self.txn.lock().await;
        let store = self.store.as_ref();
        let equiv = EquivalencePropagator::new(store);

        let unscheduled = store.list_unscheduled_exams().await?;
        info!(
            unscheduled = unscheduled.len(),
            today = %today,
            "=== ExamEngine::schedule_unassigned_exams() ==="
        );

        let by_id: BTreeMap<ExamId, &Exam> = unscheduled.iter().map(|e| (e.id, e)).collect();
        let mut outcome = SchedulingOutcome::default();
        let mut claimed: BTreeSet<ExamId> = BTreeSet::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut adopters: Vec<(&Exam, Slot)> = Vec::new();

        // ── Intake ────────────────────────────────────────────────────────────
        for exam in &unscheduled {
            if claimed.contains(&exam.id) {
                continue;
            }
            let intake = self.intake(&equiv, exam, &claimed).await;
            match intake {
                Ok(Intake::Adopt(slot)) => {
                    claimed.insert(exam.id);
                    adopters.push((exam, slot));
                }
                Ok(Intake::Plan(cand)) => {
                    claimed.extend(cand.members());
                    candidates.push(cand);
                }
                Err(error) => {
                    warn!(exam = %exam.id, error = %error, "could not prepare exam — skipped");
                    outcome.failures.push(ExamFailure {
                        exam: exam.id,
                        error: error.into(),
                    });
                }
            }
        }

        // ── Adopt equivalents' slots ──────────────────────────────────────────
        for (exam, slot) in adopters {
            match equiv.place_one(exam, slot).await {
                Ok(()) => {
                    info!(exam = %exam.id, slot = %slot, "✓ follows equivalent exam");
                    outcome.placements.insert(exam.id, slot);
                }
                Err(error) => {
                    warn!(exam = %exam.id, error = %error, "commit failed");
                    outcome.failures.push(ExamFailure {
                        exam: exam.id,
                        error: error.into(),
                    });
                }
            }
        }

        // ── Plan & commit ─────────────────────────────────────────────────────
        let followers_of: BTreeMap<ExamId, Vec<ExamId>> = candidates
            .iter()
            .map(|c| (c.lead, c.followers.clone()))
            .collect();
        let plan = self.scheduler.plan(candidates, today);

        for placement in &plan.placements {
            let slot = placement.slot();
            // Members of one candidate are committed together or not at all
            let members: Vec<&Exam> = std::iter::once(placement.lead)
                .chain(placement.followers.iter().copied())
                .filter_map(|id| by_id.get(&id).copied())
                .collect();
            match equiv.place_group(&members, slot).await {
                Ok(()) => {
                    for exam in &members {
                        outcome.placements.insert(exam.id, slot);
                    }
                }
                Err(error) => {
                    warn!(exam = %placement.lead, slot = %slot, error = %error, "commit failed");
                    for exam in &members {
                        outcome.failures.push(ExamFailure {
                            exam: exam.id,
                            error: error.clone().into(),
                        });
                    }
                }
            }
        }
        for lead in &plan.unplaced {
            outcome.unplaced.push(*lead);
            if let Some(followers) = followers_of.get(lead) {
                outcome.unplaced.extend(followers.iter().copied());
            }
        }

        info!(
            placed = outcome.placements.len(),
            unplaced = outcome.unplaced.len(),
            failed = outcome.failures.len(),
            "=== Scheduling run complete ==="
        );
        Ok(outcome)
    }

    /// Decide how `exam` enters the run and gather its students.
    async fn intake(
        &self,
        equiv: &EquivalencePropagator<'_, S>,
        exam: &Exam,
        claimed: &BTreeSet<ExamId>,
    ) -> crate::store::StoreResult<Intake> {
        let store = self.store.as_ref();
        let equivalents = equiv.equivalent_exams(exam).await?;

        if let Some(slot) = equivalents.iter().find_map(Exam::slot) {
            return Ok(Intake::Adopt(slot));
        }

        let mut cand = Candidate::single(
            exam.id,
            exam.college.clone(),
            store.enrolled_students(exam.course).await?.into_iter().collect(),
        );
        for other in equivalents
            .iter()
            .filter(|e| !e.is_scheduled() && !claimed.contains(&e.id))
        {
            cand.students
                .extend(store.enrolled_students(other.course).await?);
            cand.followers.push(other.id);
            cand.colleges.push(other.college.clone());
        }
        Ok(Intake::Plan(cand))
    }

    // ── Halls ─────────────────────────────────────────────────────────────────

    /// Seat `exam`'s unseated examinees in `halls`, in order.
    pub async fn allocate_halls(
        &self,
        exam: ExamId,
        halls: &[HallId],
    ) -> EngineResult<HallAllocation> {
        let _txn = self.txn.lock().await;
        HallAllocator::new(self.store.as_ref())
            .allocate(exam, halls)
            .await
    }

    pub async fn hall_usage(&self, exam: ExamId) -> EngineResult<HallUsageReport> {
        let _txn = self.txn.lock().await;
        HallAllocator::new(self.store.as_ref()).usage(exam).await
    }

    // ── Invigilators ──────────────────────────────────────────────────────────

    pub async fn find_available_invigilators(
        &self,
        exam: ExamId,
    ) -> EngineResult<Vec<InstructorContact>> {
        let _txn = self.txn.lock().await;
        InvigilatorMatcher::new(self.store.as_ref())
            .find_available(exam)
            .await
    }

    /// Post `instructors` to (`exam`, `hall`) and to every co-located exam
    /// seated in that hall.
    pub async fn assign_invigilators(
        &self,
        exam: ExamId,
        hall: HallId,
        instructors: &[InstructorId],
    ) -> EngineResult<Vec<InvigilatorAssignment>> {
        let _txn = self.txn.lock().await;
        InvigilatorPropagator::new(self.store.as_ref())
            .assign(exam, hall, instructors)
            .await
    }

    pub async fn remove_invigilator(
        &self,
        exam: ExamId,
        hall: HallId,
        instructor: InstructorId,
    ) -> EngineResult<bool> {
        let _txn = self.txn.lock().await;
        InvigilatorPropagator::new(self.store.as_ref())
            .remove(exam, hall, instructor)
            .await
    }

    pub async fn invigilators_for(
        &self,
        exam: ExamId,
        hall: HallId,
    ) -> EngineResult<Vec<InstructorContact>> {
        let _txn = self.txn.lock().await;
        InvigilatorPropagator::new(self.store.as_ref())
            .posted(exam, hall)
            .await
    }

    // ── Manual placement ──────────────────────────────────────────────────────

    /// Put `exam` at (`date`, `time`) along with its equivalent exams.
    /// Returns the ids of every exam placed.
    pub async fn place_exam(
        &self,
        exam: ExamId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> EngineResult<Vec<ExamId>> {
        let _txn = self.txn.lock().await;
        let store = self.store.as_ref();
        let target = store
            .get_exam(exam)
            .await?
            .ok_or(EngineError::ExamNotFound(exam))?;
        let slot = Slot::new(date, time);
        let placed = EquivalencePropagator::new(store).place(&target, slot).await?;
        info!(exam = %exam, slot = %slot, placed = placed.len(), "exam placed by hand");
        Ok(placed)
    }

    /// Unschedule `exam` and its equivalent exams, dropping their Schedule
    /// rows and invigilator postings.  Returns the ids of every exam reset.
    pub async fn reset_exam(&self, exam: ExamId) -> EngineResult<Vec<ExamId>> {
        let _txn = self.txn.lock().await;
        let store = self.store.as_ref();
        let target = store
            .get_exam(exam)
            .await?
            .ok_or(EngineError::ExamNotFound(exam))?;
        Ok(EquivalencePropagator::new(store).reset(&target).await?)
    }

    // ── Reports ───────────────────────────────────────────────────────────────

    pub async fn student_conflicts(&self) -> EngineResult<Vec<StudentConflict>> {
        let _txn = self.txn.lock().await;
        Ok(reports::student_conflicts(self.store.as_ref()).await?)
    }

    pub async fn conflicting_student_count(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> EngineResult<usize> {
        let _txn = self.txn.lock().await;
        Ok(reports::conflicting_student_count(self.store.as_ref(), Slot::new(date, time)).await?)
    }

    pub async fn timetable(&self) -> EngineResult<Vec<Exam>> {
        let _txn = self.txn.lock().await;
        Ok(reports::timetable(self.store.as_ref()).await?)
    }

    pub async fn slot_invigilation(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> EngineResult<Vec<HallPosting>> {
        let _txn = self.txn.lock().await;
        Ok(reports::slot_invigilation(self.store.as_ref(), Slot::new(date, time)).await?)
    }

    /// Students enrolled in both courses.
    pub async fn shared_students(&self, a: CourseId, b: CourseId) -> EngineResult<Vec<Student>> {
        let _txn = self.txn.lock().await;
        Ok(reports::shared_students(self.store.as_ref(), a, b).await?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
