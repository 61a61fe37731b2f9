/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Read-only views over the committed timetable.
//!
//! Nothing here writes to the store.  Conflicts are counted from Schedule
//! rows at exact slots, so exams placed by hand at clashing times show up
//! even though the scheduler itself never produces them.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{CourseId, Exam, ExamId, HallId, ScheduleRow, Slot, Student, StudentId};
use crate::store::{EntityStore, StoreResult};

/// Students of one exam who also sit another exam at the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentConflict {
    pub exam: ExamId,
    pub slot: Slot,
    pub students: Vec<StudentId>,
}

/// One (exam, hall) line of a slot invigilation sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HallPosting {
    pub exam: ExamId,
    pub exam_name: String,
    pub hall: HallId,
    pub hall_name: String,
    pub seated: usize,
    pub invigilators: Vec<String>,
}

/// Student -> exams they sit, over the rows of exams at one slot.
fn exams_per_student(rows: &[(ExamId, Vec<ScheduleRow>)]) -> BTreeMap<StudentId, BTreeSet<ExamId>> {
    let mut map: BTreeMap<StudentId, BTreeSet<ExamId>> = BTreeMap::new();
    for (exam, exam_rows) in rows {
        for row in exam_rows {
            map.entry(row.student).or_default().insert(*exam);
        }
    }
    map
}

async fn rows_at<S: EntityStore + ?Sized>(
    store: &S,
    slot: Slot,
) -> StoreResult<Vec<(ExamId, Vec<ScheduleRow>)>> {
    let mut out = Vec::new();
    for exam in store.exams_at(slot).await? {
        let rows = store.schedule_rows_for_exam(exam.id).await?;
        out.push((exam.id, rows));
    }
    Ok(out)
}

/// Every scheduled exam with at least one student double-booked at its slot.
pub async fn student_conflicts<S: EntityStore + ?Sized>(
    store: &S,
) -> StoreResult<Vec<StudentConflict>> {
    let slots: BTreeSet<Slot> = store
        .list_exams()
        .await?
        .iter()
        .filter_map(Exam::slot)
        .collect();

    let mut out = Vec::new();
    for slot in slots {
        let rows = rows_at(store, slot).await?;
        if rows.len() < 2 {
            continue;
        }
        let per_student = exams_per_student(&rows);
        for (exam, _) in &rows {
            let students: Vec<StudentId> = per_student
                .iter()
                .filter(|(_, exams)| exams.len() > 1 && exams.contains(exam))
                .map(|(s, _)| *s)
                .collect();
            if !students.is_empty() {
                out.push(StudentConflict {
                    exam: *exam,
                    slot,
                    students,
                });
            }
        }
    }
    Ok(out)
}

/// Number of distinct students sitting more than one exam at `slot`.
pub async fn conflicting_student_count<S: EntityStore + ?Sized>(
    store: &S,
    slot: Slot,
) -> StoreResult<usize> {
    let rows = rows_at(store, slot).await?;
    Ok(exams_per_student(&rows)
        .values()
        .filter(|exams| exams.len() > 1)
        .count())
}

/// Scheduled exams ordered by date, then time, then id.
pub async fn timetable<S: EntityStore + ?Sized>(store: &S) -> StoreResult<Vec<Exam>> {
    let mut exams: Vec<(Slot, Exam)> = store
        .list_exams()
        .await?
        .into_iter()
        .filter_map(|e| e.slot().map(|s| (s, e)))
        .collect();
    exams.sort_by(|(sa, a), (sb, b)| sa.cmp(sb).then(a.id.cmp(&b.id)));
    Ok(exams.into_iter().map(|(_, e)| e).collect())
}

/// For each exam at `slot` and each hall it uses, the seated count and the
/// names of the posted instructors.
pub async fn slot_invigilation<S: EntityStore + ?Sized>(
    store: &S,
    slot: Slot,
) -> StoreResult<Vec<HallPosting>> {
    let mut out = Vec::new();
    for exam in store.exams_at(slot).await? {
        let rows = store.schedule_rows_for_exam(exam.id).await?;
        let assignments = store.assignments_for_exam(exam.id).await?;

        let mut halls: BTreeSet<HallId> = rows.iter().filter_map(|r| r.hall).collect();
        halls.extend(assignments.iter().map(|a| a.hall));

        for hall_id in halls {
            let hall_name = match store.get_hall(hall_id).await? {
                Some(h) => h.name,
                None => continue,
            };
            let mut invigilators = Vec::new();
            for a in assignments.iter().filter(|a| a.hall == hall_id) {
                if let Some(i) = store.get_instructor(a.instructor).await? {
                    invigilators.push(i.name);
                }
            }
            out.push(HallPosting {
                exam: exam.id,
                exam_name: exam.name.clone(),
                hall: hall_id,
                hall_name,
                seated: rows.iter().filter(|r| r.is_seated_in(hall_id)).count(),
                invigilators,
            });
        }
    }
    Ok(out)
}

/// Students enrolled in both courses, by id.
pub async fn shared_students<S: EntityStore + ?Sized>(
    store: &S,
    a: CourseId,
    b: CourseId,
) -> StoreResult<Vec<Student>> {
    let in_a: BTreeSet<StudentId> = store.enrolled_students(a).await?.into_iter().collect();
    let in_b: BTreeSet<StudentId> = store.enrolled_students(b).await?.into_iter().collect();

    let mut out = Vec::new();
    for id in in_a.intersection(&in_b) {
        if let Some(student) = store.get_student(*id).await? {
            out.push(student);
        }
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvigilatorAssignment;
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn at(day: u32, hour: u32) -> Slot {
        Slot::new(
            NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        )
    }

    async fn exam_with(store: &InMemoryStore, name: &str, slot: Slot, students: &[StudentId]) -> ExamId {
        let course = store.add_course(name, "Science");
        let exam = store.add_exam(name, course);
        store.set_exam_slot(exam, Some(slot)).await.unwrap();
        for s in students {
            store.ensure_schedule_row(exam, *s, None).await.unwrap();
        }
        exam
    }

    #[tokio::test]
    async fn clashing_students_are_reported_on_both_exams() {
        let store = InMemoryStore::new();
        let s1 = store.add_student("s1", "s1@uni.edu");
        let s2 = store.add_student("s2", "s2@uni.edu");
        let s3 = store.add_student("s3", "s3@uni.edu");
        let a = exam_with(&store, "A", at(20, 9), &[s1, s2]).await;
        let b = exam_with(&store, "B", at(20, 9), &[s2, s3]).await;
        exam_with(&store, "C", at(20, 11), &[s1]).await;

        let conflicts = student_conflicts(&store).await.unwrap();
        assert_eq!(
            conflicts,
            vec![
                StudentConflict { exam: a, slot: at(20, 9), students: vec![s2] },
                StudentConflict { exam: b, slot: at(20, 9), students: vec![s2] },
            ]
        );
        assert_eq!(conflicting_student_count(&store, at(20, 9)).await.unwrap(), 1);
        assert_eq!(conflicting_student_count(&store, at(20, 11)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn timetable_is_chronological() {
        let store = InMemoryStore::new();
        let late = exam_with(&store, "Late", at(21, 11), &[]).await;
        let early = exam_with(&store, "Early", at(21, 9), &[]).await;
        let first = exam_with(&store, "First", at(20, 11), &[]).await;
        let course = store.add_course("Unplaced", "Arts");
        store.add_exam("Unplaced", course);

        let ids: Vec<ExamId> = timetable(&store).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first, early, late]);
    }

    #[tokio::test]
    async fn slot_sheet_lists_halls_and_invigilators() {
        let store = InMemoryStore::new();
        let s1 = store.add_student("s1", "s1@uni.edu");
        let a = exam_with(&store, "A", at(20, 9), &[s1]).await;
        let hall = store.add_hall("Main Hall", 30);
        store.seat_students(a, hall, &[s1]).await.unwrap();
        let lee = store.add_instructor("Dr. Lee", "lee@uni.edu", vec![]);
        store
            .ensure_assignment(InvigilatorAssignment { exam: a, hall, instructor: lee })
            .await
            .unwrap();

        let sheet = slot_invigilation(&store, at(20, 9)).await.unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].hall_name, "Main Hall");
        assert_eq!(sheet[0].seated, 1);
        assert_eq!(sheet[0].invigilators, vec!["Dr. Lee".to_string()]);
        assert!(slot_invigilation(&store, at(20, 11)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shared_students_are_those_in_both_courses() {
        let store = InMemoryStore::new();
        let physics = store.add_course("Physics", "Science");
        let chemistry = store.add_course("Chemistry", "Science");
        let history = store.add_course("History", "Arts");
        let s1 = store.add_student("s1", "s1@uni.edu");
        let s2 = store.add_student("s2", "s2@uni.edu");
        let s3 = store.add_student("s3", "s3@uni.edu");
        for s in [s1, s2] {
            store.enroll(s, physics);
        }
        for s in [s2, s3, s1] {
            store.enroll(s, chemistry);
        }
        store.enroll(s3, history);

        let shared = shared_students(&store, chemistry, physics).await.unwrap();
        let ids: Vec<StudentId> = shared.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![s1, s2]);
        assert_eq!(shared[1].email, "s2@uni.edu");
        assert!(shared_students(&store, physics, history).await.unwrap().is_empty());
    }
}
