/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hall allocation for one exam.
//!
//! [`HallAllocator`] seats an exam's unseated examinees across an ordered
//! list of halls.  A hall may already be shared by other exams sitting at the
//! same date and time; the seats they (and this exam) already occupy are
//! subtracted from its capacity, and the invigilators already posted to the
//! hall for those exams are copied onto this exam.
//!
//! ```text
//!   halls: [A(20), B(15)]      exam: 30 unseated
//!
//!   A: consumed 0  → effective 20 → seat 20 → remaining 10
//!   B: consumed 0  → effective 15 → seat 10 → remaining 0  (5 seats left)
//! ```
//!
//! Unknown hall ids and halls with no free seat are skipped; the request
//! carries on with the next hall.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::model::{Exam, ExamId, HallId, InstructorId, InvigilatorAssignment, ScheduleRow, StudentId};
use crate::store::{EntityStore, StoreResult};

// ── Result types ──────────────────────────────────────────────────────────────

/// Seats given to the exam in one hall during one allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallSeating {
    pub hall: HallId,
    pub seated: usize,
    /// Hall capacity minus every seat taken at this slot, after seating.
    pub seats_left: u32,
}

/// Outcome of [`HallAllocator::allocate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HallAllocation {
    pub exam: ExamId,
    /// Halls that received examinees, in request order.
    pub seatings: Vec<HallSeating>,
    /// Requested hall ids that do not exist.
    pub unknown_halls: Vec<HallId>,
    /// Invigilator assignments copied from co-located exams.
    pub copied_invigilators: Vec<InvigilatorAssignment>,
    /// Examinees still without a hall.
    pub unseated: usize,
}

impl HallAllocation {
    pub fn total_seated(&self) -> usize {
        self.seatings.iter().map(|s| s.seated).sum()
    }
}

/// Per-hall line of a [`HallUsageReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallUsage {
    pub hall: HallId,
    pub name: String,
    pub capacity: u32,
    /// Examinees of this exam seated in the hall.
    pub seated: usize,
    /// Seats still free at this slot across every exam sharing the hall.
    pub seats_left: u32,
    /// Names of the instructors posted to (exam, hall).
    pub invigilators: Vec<String>,
}

/// Where an exam's examinees currently sit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HallUsageReport {
    pub exam: ExamId,
    pub total: usize,
    pub unseated: usize,
    pub halls: Vec<HallUsage>,
}

// ── Co-location helpers ───────────────────────────────────────────────────────

/// Other exams sitting at exactly the same date and time as `exam`, with
/// their Schedule rows.  Empty when `exam` has no slot.
pub(crate) async fn co_located<S>(
    store: &S,
    exam: &Exam,
) -> StoreResult<Vec<(Exam, Vec<ScheduleRow>)>>
where
    S: EntityStore + ?Sized,
{
    let Some(slot) = exam.slot() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for other in store.exams_at(slot).await? {
        if other.id == exam.id {
            continue;
        }
        let rows = store.schedule_rows_for_exam(other.id).await?;
        out.push((other, rows));
    }
    Ok(out)
}

fn seated_in(rows: &[ScheduleRow], hall: HallId) -> usize {
    rows.iter().filter(|r| r.is_seated_in(hall)).count()
}

// ── HallAllocator ─────────────────────────────────────────────────────────────

pub struct HallAllocator<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> HallAllocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Seat the unseated examinees of `exam_id` in `halls`, in order.
    ///
    /// # Errors
    /// `ExamNotFound` if the exam does not exist; `Store` on any store
    /// failure (seats written before the failure stay written).
    pub async fn allocate(&self, exam_id: ExamId, halls: &[HallId]) -> EngineResult<HallAllocation> {
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .ok_or(EngineError::ExamNotFound(exam_id))?;

        let rows = self.store.schedule_rows_for_exam(exam_id).await?;
        // Rows arrive ordered by student id
        let mut unseated: VecDeque<StudentId> = rows
            .iter()
            .filter(|r| !r.is_seated())
            .map(|r| r.student)
            .collect();
        let mut own_seated: BTreeMap<HallId, usize> = BTreeMap::new();
        for row in &rows {
            if let Some(h) = row.hall {
                *own_seated.entry(h).or_default() += 1;
            }
        }

        let neighbours = co_located(self.store, &exam).await?;

        info!(
            exam = %exam_id,
            unseated = unseated.len(),
            halls = halls.len(),
            co_located = neighbours.len(),
            "=== HallAllocator::allocate() ==="
        );

        let mut allocation = HallAllocation {
            exam: exam_id,
            ..Default::default()
        };
        let mut copied: BTreeSet<InvigilatorAssignment> = BTreeSet::new();

        for &hall_id in halls {
            if unseated.is_empty() {
                break;
            }

            let Some(hall) = self.store.get_hall(hall_id).await? else {
                warn!(exam = %exam_id, hall = %hall_id, "unknown hall — skipped");
                allocation.unknown_halls.push(hall_id);
                continue;
            };

            let others: usize = neighbours.iter().map(|(_, r)| seated_in(r, hall_id)).sum();
            let own = own_seated.get(&hall_id).copied().unwrap_or(0);
            let consumed = u32::try_from(others + own).unwrap_or(u32::MAX);
            let effective = hall.capacity.saturating_sub(consumed) as usize;
            let assign = unseated.len().min(effective);

            if assign == 0 {
                debug!(
                    exam = %exam_id,
                    hall = %hall_id,
                    capacity = hall.capacity,
                    consumed,
                    "hall full — skipped"
                );
                continue;
            }

            let batch: Vec<StudentId> = unseated.drain(..assign).collect();
            self.store.seat_students(exam_id, hall_id, &batch).await?;
            *own_seated.entry(hall_id).or_default() += assign;

            let seats_left = u32::try_from(effective - assign).unwrap_or(0);
            debug!(
                exam = %exam_id,
                hall = %hall_id,
                seated = assign,
                seats_left,
                shared = others > 0,
                "seated"
            );
            allocation.seatings.push(HallSeating {
                hall: hall_id,
                seated: assign,
                seats_left,
            });

            if others > 0 {
                for instructor in self.posted_instructors(&neighbours, hall_id).await? {
                    let assignment = InvigilatorAssignment {
                        exam: exam_id,
                        hall: hall_id,
                        instructor,
                    };
                    if self.store.ensure_assignment(assignment).await? {
                        debug!(exam = %exam_id, hall = %hall_id, instructor = %instructor, "invigilator copied");
                    }
                    copied.insert(assignment);
                }
            }
        }

        allocation.unseated = unseated.len();
        allocation.copied_invigilators = copied.into_iter().collect();

        info!(
            exam = %exam_id,
            seated = allocation.total_seated(),
            unseated = allocation.unseated,
            copied = allocation.copied_invigilators.len(),
            "=== Allocation complete ==="
        );
        Ok(allocation)
    }

    /// Distinct instructors assigned to `hall` for any co-located exam.
    async fn posted_instructors(
        &self,
        neighbours: &[(Exam, Vec<ScheduleRow>)],
        hall: HallId,
    ) -> StoreResult<BTreeSet<InstructorId>> {
        let mut ids = BTreeSet::new();
        for (other, _) in neighbours {
            for a in self.store.assignments_for_exam(other.id).await? {
                if a.hall == hall {
                    ids.insert(a.instructor);
                }
            }
        }
        Ok(ids)
    }

    /// Per-hall seating of `exam_id`, with the seats still free at its slot
    /// and the instructors posted to each hall.
    pub async fn usage(&self, exam_id: ExamId) -> EngineResult<HallUsageReport> {
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .ok_or(EngineError::ExamNotFound(exam_id))?;
        let rows = self.store.schedule_rows_for_exam(exam_id).await?;
        let neighbours = co_located(self.store, &exam).await?;
        let assignments = self.store.assignments_for_exam(exam_id).await?;

        let mut hall_ids: BTreeSet<HallId> = rows.iter().filter_map(|r| r.hall).collect();
        hall_ids.extend(assignments.iter().map(|a| a.hall));

        let mut report = HallUsageReport {
            exam: exam_id,
            total: rows.len(),
            unseated: rows.iter().filter(|r| !r.is_seated()).count(),
            halls: Vec::with_capacity(hall_ids.len()),
        };

        for hall_id in hall_ids {
            let Some(hall) = self.store.get_hall(hall_id).await? else {
                continue;
            };
            let seated = seated_in(&rows, hall_id);
            let others: usize = neighbours.iter().map(|(_, r)| seated_in(r, hall_id)).sum();
            let consumed = u32::try_from(seated + others).unwrap_or(u32::MAX);

            let mut invigilators = Vec::new();
            for a in assignments.iter().filter(|a| a.hall == hall_id) {
                if let Some(instructor) = self.store.get_instructor(a.instructor).await? {
                    invigilators.push(instructor.name);
                }
            }

            report.halls.push(HallUsage {
                hall: hall_id,
                name: hall.name,
                capacity: hall.capacity,
                seated,
                seats_left: hall.capacity.saturating_sub(consumed),
                invigilators,
            });
        }
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Slot;
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn slot() -> Slot {
        Slot::new(
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
    }

    /// Exam with `n` enrolled students, placed at `slot()` with one
    /// unseated row per student.
    async fn placed_exam(store: &InMemoryStore, name: &str, n: usize) -> ExamId {
        let course = store.add_course(name, "Science");
        let exam = store.add_exam(name, course);
        store.set_exam_slot(exam, Some(slot())).await.unwrap();
        for i in 0..n {
            let s = store.add_student(&format!("{name}-{i}"), &format!("{name}{i}@uni.edu"));
            store.enroll(s, course);
            store.ensure_schedule_row(exam, s, None).await.unwrap();
        }
        exam
    }

    #[tokio::test]
    async fn thirty_students_over_twenty_and_fifteen() {
        let store = InMemoryStore::new();
        let exam = placed_exam(&store, "Algebra", 30).await;
        let h1 = store.add_hall("Hall 1", 20);
        let h2 = store.add_hall("Hall 2", 15);

        let alloc = HallAllocator::new(&store).allocate(exam, &[h1, h2]).await.unwrap();

        assert_eq!(
            alloc.seatings,
            vec![
                HallSeating { hall: h1, seated: 20, seats_left: 0 },
                HallSeating { hall: h2, seated: 10, seats_left: 5 },
            ]
        );
        assert_eq!(alloc.unseated, 0);
        assert!(store.schedule_rows().iter().all(|r| r.is_seated()));
    }

    #[tokio::test]
    async fn shared_hall_only_offers_remaining_seats() {
        let store = InMemoryStore::new();
        let a = placed_exam(&store, "A", 10).await;
        let b = placed_exam(&store, "B", 8).await;
        let hall = store.add_hall("Hall H", 15);

        HallAllocator::new(&store).allocate(a, &[hall]).await.unwrap();
        let alloc = HallAllocator::new(&store).allocate(b, &[hall]).await.unwrap();

        assert_eq!(alloc.seatings[0].seated, 5, "15 seats minus A's 10");
        assert_eq!(alloc.seatings[0].seats_left, 0);
        assert_eq!(alloc.unseated, 3);
    }

    #[tokio::test]
    async fn first_seated_students_are_lowest_ids() {
        let store = InMemoryStore::new();
        let exam = placed_exam(&store, "Algebra", 5).await;
        let hall = store.add_hall("Small", 2);

        HallAllocator::new(&store).allocate(exam, &[hall]).await.unwrap();

        let rows = store.schedule_rows_for_exam(exam).await.unwrap();
        let seated: Vec<bool> = rows.iter().map(|r| r.is_seated()).collect();
        assert_eq!(seated, vec![true, true, false, false, false]);
    }

    #[tokio::test]
    async fn unknown_and_empty_halls_are_skipped() {
        let store = InMemoryStore::new();
        let exam = placed_exam(&store, "Algebra", 4).await;
        let closed = store.add_hall("Closed", 0);
        let open = store.add_hall("Open", 10);

        let alloc = HallAllocator::new(&store)
            .allocate(exam, &[HallId(9999), closed, open])
            .await
            .unwrap();

        assert_eq!(alloc.unknown_halls, vec![HallId(9999)]);
        assert_eq!(alloc.seatings.len(), 1);
        assert_eq!(alloc.seatings[0].hall, open);
        assert_eq!(alloc.unseated, 0);
    }

    #[tokio::test]
    async fn rerun_never_exceeds_capacity() {
        let store = InMemoryStore::new();
        let exam = placed_exam(&store, "Algebra", 12).await;
        let hall = store.add_hall("Hall", 10);
        let alloc = HallAllocator::new(&store);

        alloc.allocate(exam, &[hall]).await.unwrap();
        let second = alloc.allocate(exam, &[hall]).await.unwrap();

        assert!(second.seatings.is_empty(), "hall already full with own rows");
        assert_eq!(second.unseated, 2);
        let in_hall = store
            .schedule_rows()
            .iter()
            .filter(|r| r.is_seated_in(hall))
            .count();
        assert_eq!(in_hall, 10);
    }

    #[tokio::test]
    async fn invigilators_of_a_shared_hall_are_copied() {
        let store = InMemoryStore::new();
        let a = placed_exam(&store, "A", 3).await;
        let b = placed_exam(&store, "B", 3).await;
        let hall = store.add_hall("Hall H", 20);
        let lee = store.add_instructor("Dr. Lee", "lee@uni.edu", vec![]);

        let allocator = HallAllocator::new(&store);
        allocator.allocate(a, &[hall]).await.unwrap();
        store
            .ensure_assignment(InvigilatorAssignment { exam: a, hall, instructor: lee })
            .await
            .unwrap();

        let alloc = allocator.allocate(b, &[hall]).await.unwrap();
        let expected = InvigilatorAssignment { exam: b, hall, instructor: lee };
        assert_eq!(alloc.copied_invigilators, vec![expected]);
        assert!(store.assignments().contains(&expected));
    }

    #[tokio::test]
    async fn unknown_exam_is_not_found() {
        let store = InMemoryStore::new();
        let err = HallAllocator::new(&store)
            .allocate(ExamId(1), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExamNotFound(ExamId(1))));
    }

    #[tokio::test]
    async fn usage_reports_seats_and_invigilators() {
        let store = InMemoryStore::new();
        let a = placed_exam(&store, "A", 10).await;
        let b = placed_exam(&store, "B", 4).await;
        let hall = store.add_hall("Hall H", 15);
        let lee = store.add_instructor("Dr. Lee", "lee@uni.edu", vec![]);
        let allocator = HallAllocator::new(&store);
        allocator.allocate(a, &[hall]).await.unwrap();
        allocator.allocate(b, &[hall]).await.unwrap();
        store
            .ensure_assignment(InvigilatorAssignment { exam: b, hall, instructor: lee })
            .await
            .unwrap();

        let report = allocator.usage(b).await.unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.unseated, 0);
        assert_eq!(report.halls.len(), 1);
        assert_eq!(report.halls[0].seated, 4);
        assert_eq!(report.halls[0].seats_left, 1);
        assert_eq!(report.halls[0].invigilators, vec!["Dr. Lee".to_string()]);
    }
}
