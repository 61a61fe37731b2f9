/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-memory entity store.
//!
//! Keeps every table in ordered maps behind one lock, which makes iteration
//! order (and therefore every engine decision) deterministic.  Used by the
//! unit tests, the demos and the CLI, which loads and saves the whole store
//! as a YAML [`Dataset`] snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EntityStore, StoreError, StoreResult};
use crate::model::{
    AvailabilityDay, Course, CourseId, Enrollment, EquivalenceGroup, Exam, ExamId, GroupId, Hall,
    HallId, Instructor, InstructorId, InvigilatorAssignment, ScheduleRow, Slot, Student,
    StudentId,
};

// ── Snapshot format ───────────────────────────────────────────────────────────

/// Whole-store snapshot, as written to and read from YAML.
///
/// ```yaml
/// students:    [{ id: 1, name: Ada, email: ada@uni.edu }]
/// courses:     [{ id: 10, name: Algebra, college: Science }]
/// enrollments: [{ student: 1, course: 10 }]
/// equivalence_groups: [{ id: 50, name: Algebra cross-list, courses: [10, 11] }]
/// exams:       [{ id: 100, name: Algebra final, course: 10, college: Science }]
/// halls:       [{ id: 200, name: Hall A, capacity: 40 }]
/// instructors:
///   - id: 300
///     name: Dr. Lee
///     email: lee@uni.edu
///     availability: [{ date: 01Jan, times: ["9:00AM", "11:00AM"] }]
/// schedules:   []
/// invigilators: []
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub equivalence_groups: Vec<EquivalenceGroup>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub halls: Vec<Hall>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub schedules: Vec<ScheduleRow>,
    #[serde(default)]
    pub invigilators: Vec<InvigilatorAssignment>,
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// In-memory [`EntityStore`].
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    students: BTreeMap<StudentId, Student>,
    courses: BTreeMap<CourseId, Course>,
    enrollments: BTreeSet<Enrollment>,
    groups: BTreeMap<GroupId, EquivalenceGroup>,
    exams: BTreeMap<ExamId, Exam>,
    halls: BTreeMap<HallId, Hall>,
    instructors: BTreeMap<InstructorId, Instructor>,
    schedules: BTreeMap<(ExamId, StudentId), ScheduleRow>,
    assignments: BTreeSet<InvigilatorAssignment>,

    // ID counter shared by every table
    last_id: i64,

    // Failure injection
    unhealthy: bool,
    failing_exams: BTreeSet<ExamId>,
    row_write_budget: Option<usize>,
}

impl MemoryData {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn check_health(&self) -> StoreResult<()> {
        if self.unhealthy {
            return Err(StoreError::Connection("store is not healthy".to_string()));
        }
        Ok(())
    }

    fn check_exam_writable(&self, exam: ExamId) -> StoreResult<()> {
        self.check_health()?;
        if self.failing_exams.contains(&exam) {
            return Err(StoreError::Connection(format!(
                "write rejected for exam {exam}"
            )));
        }
        Ok(())
    }
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, rejecting duplicate ids and rows that
    /// reference unknown entities.
    pub fn from_dataset(dataset: Dataset) -> StoreResult<Self> {
        let mut data = MemoryData::default();
        let mut max_id = 0_i64;

        fn insert_unique<K: Ord + Copy + std::fmt::Display, V>(
            table: &mut BTreeMap<K, V>,
            kind: &str,
            key: K,
            value: V,
        ) -> StoreResult<()> {
            if table.insert(key, value).is_some() {
                return Err(StoreError::Conflict(format!("duplicate {kind} id {key}")));
            }
            Ok(())
        }

        for s in dataset.students {
            max_id = max_id.max(s.id.0);
            insert_unique(&mut data.students, "student", s.id, s)?;
        }
        for c in dataset.courses {
            max_id = max_id.max(c.id.0);
            insert_unique(&mut data.courses, "course", c.id, c)?;
        }
        for g in dataset.equivalence_groups {
            max_id = max_id.max(g.id.0);
            if let Some(missing) = g.courses.iter().find(|c| !data.courses.contains_key(c)) {
                return Err(StoreError::Conflict(format!(
                    "equivalence group {} references unknown course {missing}",
                    g.id
                )));
            }
            insert_unique(&mut data.groups, "equivalence group", g.id, g)?;
        }
        for e in dataset.exams {
            max_id = max_id.max(e.id.0);
            if !data.courses.contains_key(&e.course) {
                return Err(StoreError::Conflict(format!(
                    "exam {} references unknown course {}",
                    e.id, e.course
                )));
            }
            insert_unique(&mut data.exams, "exam", e.id, e)?;
        }
        for h in dataset.halls {
            max_id = max_id.max(h.id.0);
            insert_unique(&mut data.halls, "hall", h.id, h)?;
        }
        for i in dataset.instructors {
            max_id = max_id.max(i.id.0);
            insert_unique(&mut data.instructors, "instructor", i.id, i)?;
        }
        for en in dataset.enrollments {
            if !data.students.contains_key(&en.student) || !data.courses.contains_key(&en.course) {
                return Err(StoreError::Conflict(format!(
                    "enrollment ({}, {}) references an unknown student or course",
                    en.student, en.course
                )));
            }
            data.enrollments.insert(en);
        }
        for row in dataset.schedules {
            if !data.exams.contains_key(&row.exam) || !data.students.contains_key(&row.student) {
                return Err(StoreError::Conflict(format!(
                    "schedule row ({}, {}) references an unknown exam or student",
                    row.exam, row.student
                )));
            }
            if let Some(hall) = row.hall {
                if !data.halls.contains_key(&hall) {
                    return Err(StoreError::Conflict(format!(
                        "schedule row ({}, {}) references unknown hall {hall}",
                        row.exam, row.student
                    )));
                }
            }
            if data.schedules.insert((row.exam, row.student), row.clone()).is_some() {
                return Err(StoreError::Conflict(format!(
                    "duplicate schedule row ({}, {})",
                    row.exam, row.student
                )));
            }
        }
        for a in dataset.invigilators {
            if !data.exams.contains_key(&a.exam)
                || !data.halls.contains_key(&a.hall)
                || !data.instructors.contains_key(&a.instructor)
            {
                return Err(StoreError::Conflict(format!(
                    "invigilator assignment ({}, {}, {}) references an unknown entity",
                    a.exam, a.hall, a.instructor
                )));
            }
            data.assignments.insert(a);
        }

        data.last_id = max_id;
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Snapshot of every table.
    pub fn to_dataset(&self) -> Dataset {
        let data = self.data.read();
        Dataset {
            students: data.students.values().cloned().collect(),
            courses: data.courses.values().cloned().collect(),
            enrollments: data.enrollments.iter().copied().collect(),
            equivalence_groups: data.groups.values().cloned().collect(),
            exams: data.exams.values().cloned().collect(),
            halls: data.halls.values().cloned().collect(),
            instructors: data.instructors.values().cloned().collect(),
            schedules: data.schedules.values().cloned().collect(),
            invigilators: data.assignments.iter().copied().collect(),
        }
    }

    /// Load a YAML [`Dataset`] snapshot.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// contains inconsistent records.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading dataset from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open dataset file: {}", path.display()))?;

        let dataset: Dataset = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        debug!(
            students = dataset.students.len(),
            courses = dataset.courses.len(),
            exams = dataset.exams.len(),
            halls = dataset.halls.len(),
            instructors = dataset.instructors.len(),
            "dataset parsed"
        );

        Self::from_dataset(dataset)
            .with_context(|| format!("Inconsistent dataset: {}", path.display()))
    }

    /// Write the current tables as a YAML [`Dataset`] snapshot.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.to_dataset())
            .context("Failed to serialise dataset")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Cannot write dataset file: {}", path.display()))?;
        info!("Dataset written to: {}", path.display());
        Ok(())
    }

    // ── Fixture helpers ───────────────────────────────────────────────────────

    pub fn add_student(&self, name: &str, email: &str) -> StudentId {
        let mut data = self.data.write();
        let id = StudentId(data.next_id());
        data.students.insert(
            id,
            Student {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        id
    }

    pub fn add_course(&self, name: &str, college: &str) -> CourseId {
        let mut data = self.data.write();
        let id = CourseId(data.next_id());
        data.courses.insert(
            id,
            Course {
                id,
                name: name.to_string(),
                college: college.to_string(),
            },
        );
        id
    }

    pub fn enroll(&self, student: StudentId, course: CourseId) {
        self.data
            .write()
            .enrollments
            .insert(Enrollment { student, course });
    }

    /// Add an unscheduled exam for `course`, inheriting the course's college.
    pub fn add_exam(&self, name: &str, course: CourseId) -> ExamId {
        let mut data = self.data.write();
        let college = data
            .courses
            .get(&course)
            .map(|c| c.college.clone())
            .unwrap_or_default();
        let id = ExamId(data.next_id());
        data.exams.insert(
            id,
            Exam {
                id,
                name: name.to_string(),
                course,
                college,
                date: None,
                time: None,
            },
        );
        id
    }

    pub fn add_equivalence_group(&self, name: &str, courses: &[CourseId]) -> GroupId {
        let mut data = self.data.write();
        let id = GroupId(data.next_id());
        data.groups.insert(
            id,
            EquivalenceGroup {
                id,
                name: name.to_string(),
                courses: courses.to_vec(),
            },
        );
        id
    }

    pub fn add_hall(&self, name: &str, capacity: u32) -> HallId {
        let mut data = self.data.write();
        let id = HallId(data.next_id());
        data.halls.insert(
            id,
            Hall {
                id,
                name: name.to_string(),
                capacity,
            },
        );
        id
    }

    pub fn add_instructor(
        &self,
        name: &str,
        email: &str,
        availability: Vec<AvailabilityDay>,
    ) -> InstructorId {
        let mut data = self.data.write();
        let id = InstructorId(data.next_id());
        data.instructors.insert(
            id,
            Instructor {
                id,
                name: name.to_string(),
                email: email.to_string(),
                availability,
            },
        );
        id
    }

    // ── Synchronous inspection ────────────────────────────────────────────────

    pub fn exam(&self, id: ExamId) -> Option<Exam> {
        self.data.read().exams.get(&id).cloned()
    }

    pub fn schedule_rows(&self) -> Vec<ScheduleRow> {
        self.data.read().schedules.values().cloned().collect()
    }

    pub fn assignments(&self) -> Vec<InvigilatorAssignment> {
        self.data.read().assignments.iter().copied().collect()
    }

    // ── Failure injection ─────────────────────────────────────────────────────

    /// Make every call fail with a connection error while `false`.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().unhealthy = !healthy;
    }

    /// Make every write touching `exam` fail with a connection error.
    pub fn fail_writes_for_exam(&self, exam: ExamId) {
        self.data.write().failing_exams.insert(exam);
    }

    /// Let `n` more Schedule rows be created, then fail every further
    /// row creation with a connection error.
    pub fn fail_schedule_rows_after(&self, n: usize) {
        self.data.write().row_write_budget = Some(n);
    }

    /// Lift every injected failure.
    pub fn clear_failures(&self) {
        let mut data = self.data.write();
        data.unhealthy = false;
        data.failing_exams.clear();
        data.row_write_budget = None;
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.exams.get(&id).cloned())
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.exams.values().cloned().collect())
    }

    async fn list_unscheduled_exams(&self) -> StoreResult<Vec<Exam>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data
            .exams
            .values()
            .filter(|e| !e.is_scheduled())
            .cloned()
            .collect())
    }

    async fn exams_at(&self, slot: Slot) -> StoreResult<Vec<Exam>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data
            .exams
            .values()
            .filter(|e| e.slot() == Some(slot))
            .cloned()
            .collect())
    }

    async fn exams_for_course(&self, course: CourseId) -> StoreResult<Vec<Exam>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data
            .exams
            .values()
            .filter(|e| e.course == course)
            .cloned()
            .collect())
    }

    async fn set_exam_slot(&self, id: ExamId, slot: Option<Slot>) -> StoreResult<()> {
        let mut data = self.data.write();
        data.check_exam_writable(id)?;
        let exam = data
            .exams
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("exam {id}")))?;
        exam.date = slot.map(|s| s.date);
        exam.time = slot.map(|s| s.time);
        Ok(())
    }

    async fn enrolled_students(&self, course: CourseId) -> StoreResult<Vec<StudentId>> {
        let data = self.data.read();
        data.check_health()?;
        let students: BTreeSet<StudentId> = data
            .enrollments
            .iter()
            .filter(|en| en.course == course)
            .map(|en| en.student)
            .collect();
        Ok(students.into_iter().collect())
    }

    async fn equivalent_courses(&self, course: CourseId) -> StoreResult<Vec<CourseId>> {
        let data = self.data.read();
        data.check_health()?;
        let others: BTreeSet<CourseId> = data
            .groups
            .values()
            .filter(|g| g.courses.contains(&course))
            .flat_map(|g| g.courses.iter().copied())
            .filter(|c| *c != course)
            .collect();
        Ok(others.into_iter().collect())
    }

    async fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.students.get(&id).cloned())
    }

    async fn get_hall(&self, id: HallId) -> StoreResult<Option<Hall>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.halls.get(&id).cloned())
    }

    async fn schedule_rows_for_exam(&self, exam: ExamId) -> StoreResult<Vec<ScheduleRow>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data
            .schedules
            .range((exam, StudentId(i64::MIN))..=(exam, StudentId(i64::MAX)))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn ensure_schedule_row(
        &self,
        exam: ExamId,
        student: StudentId,
        college: Option<String>,
    ) -> StoreResult<bool> {
        let mut data = self.data.write();
        data.check_health()?;
        if !data.exams.contains_key(&exam) {
            return Err(StoreError::NotFound(format!("exam {exam}")));
        }
        if !data.students.contains_key(&student) {
            return Err(StoreError::NotFound(format!("student {student}")));
        }
        // An existing row means nothing is written
        if data.schedules.contains_key(&(exam, student)) {
            return Ok(false);
        }
        data.check_exam_writable(exam)?;
        let budget = data.row_write_budget;
        match budget {
            Some(0) => {
                return Err(StoreError::Connection(format!(
                    "schedule row ({exam}, {student}) rejected"
                )))
            }
            Some(n) => data.row_write_budget = Some(n - 1),
            None => {}
        }
        data.schedules.insert(
            (exam, student),
            ScheduleRow {
                exam,
                student,
                hall: None,
                college,
            },
        );
        Ok(true)
    }

    async fn seat_students(
        &self,
        exam: ExamId,
        hall: HallId,
        students: &[StudentId],
    ) -> StoreResult<()> {
        let mut data = self.data.write();
        data.check_exam_writable(exam)?;
        if !data.halls.contains_key(&hall) {
            return Err(StoreError::NotFound(format!("hall {hall}")));
        }
        if let Some(missing) = students
            .iter()
            .find(|s| !data.schedules.contains_key(&(exam, **s)))
        {
            return Err(StoreError::NotFound(format!(
                "schedule row ({exam}, {missing})"
            )));
        }
        for student in students {
            if let Some(row) = data.schedules.get_mut(&(exam, *student)) {
                row.hall = Some(hall);
            }
        }
        Ok(())
    }

    async fn delete_schedule_rows(&self, exam: ExamId) -> StoreResult<usize> {
        let mut data = self.data.write();
        data.check_exam_writable(exam)?;
        let before = data.schedules.len();
        data.schedules.retain(|(e, _), _| *e != exam);
        Ok(before - data.schedules.len())
    }

    async fn get_instructor(&self, id: InstructorId) -> StoreResult<Option<Instructor>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.instructors.get(&id).cloned())
    }

    async fn list_instructors(&self) -> StoreResult<Vec<Instructor>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data.instructors.values().cloned().collect())
    }

    async fn assignments_for_exam(&self, exam: ExamId) -> StoreResult<Vec<InvigilatorAssignment>> {
        let data = self.data.read();
        data.check_health()?;
        Ok(data
            .assignments
            .iter()
            .filter(|a| a.exam == exam)
            .copied()
            .collect())
    }

    async fn ensure_assignment(&self, assignment: InvigilatorAssignment) -> StoreResult<bool> {
        let mut data = self.data.write();
        data.check_exam_writable(assignment.exam)?;
        if !data.exams.contains_key(&assignment.exam) {
            return Err(StoreError::NotFound(format!("exam {}", assignment.exam)));
        }
        if !data.halls.contains_key(&assignment.hall) {
            return Err(StoreError::NotFound(format!("hall {}", assignment.hall)));
        }
        if !data.instructors.contains_key(&assignment.instructor) {
            return Err(StoreError::NotFound(format!(
                "instructor {}",
                assignment.instructor
            )));
        }
        Ok(data.assignments.insert(assignment))
    }

    async fn delete_assignment(&self, assignment: InvigilatorAssignment) -> StoreResult<bool> {
        let mut data = self.data.write();
        data.check_exam_writable(assignment.exam)?;
        Ok(data.assignments.remove(&assignment))
    }

    async fn delete_assignments_for_exam(&self, exam: ExamId) -> StoreResult<usize> {
        let mut data = self.data.write();
        data.check_exam_writable(exam)?;
        let before = data.assignments.len();
        data.assignments.retain(|a| a.exam != exam);
        Ok(before - data.assignments.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn slot(day: u32, hour: u32) -> Slot {
        Slot::new(
            NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn schedule_rows_are_unique_per_exam_and_student() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let student = store.add_student("Ada", "ada@uni.edu");
        let exam = store.add_exam("Algebra final", course);

        assert!(store.ensure_schedule_row(exam, student, None).await.unwrap());
        assert!(!store.ensure_schedule_row(exam, student, None).await.unwrap());
        assert_eq!(store.schedule_rows_for_exam(exam).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn assignments_are_unique_per_triple() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let exam = store.add_exam("Algebra final", course);
        let hall = store.add_hall("Hall A", 30);
        let lee = store.add_instructor("Lee", "lee@uni.edu", vec![]);
        let a = InvigilatorAssignment {
            exam,
            hall,
            instructor: lee,
        };

        assert!(store.ensure_assignment(a).await.unwrap());
        assert!(!store.ensure_assignment(a).await.unwrap());
        assert_eq!(store.assignments().len(), 1);
        assert!(store.delete_assignment(a).await.unwrap());
        assert!(!store.delete_assignment(a).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_assignment_rejects_unknown_instructor() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let exam = store.add_exam("Algebra final", course);
        let hall = store.add_hall("Hall A", 30);
        let err = store
            .ensure_assignment(InvigilatorAssignment {
                exam,
                hall,
                instructor: InstructorId(999),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn exams_at_matches_exact_slot_only() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let a = store.add_exam("A", course);
        let b = store.add_exam("B", course);
        let c = store.add_exam("C", course);
        store.set_exam_slot(a, Some(slot(2, 9))).await.unwrap();
        store.set_exam_slot(b, Some(slot(2, 9))).await.unwrap();
        store.set_exam_slot(c, Some(slot(2, 11))).await.unwrap();

        let ids: Vec<ExamId> = store
            .exams_at(slot(2, 9))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![a, b]);
        assert!(store.list_unscheduled_exams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn equivalent_courses_merges_groups_and_excludes_self() {
        let store = InMemoryStore::new();
        let c1 = store.add_course("Algebra I", "Science");
        let c2 = store.add_course("Algebra I (Eng)", "Engineering");
        let c3 = store.add_course("Algebra I (Ed)", "Education");
        store.add_equivalence_group("g1", &[c1, c2]);
        store.add_equivalence_group("g2", &[c1, c3, c2]);

        assert_eq!(store.equivalent_courses(c1).await.unwrap(), vec![c2, c3]);
        assert_eq!(store.equivalent_courses(c3).await.unwrap(), vec![c1, c2]);
    }

    #[tokio::test]
    async fn seat_students_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let exam = store.add_exam("Algebra final", course);
        let hall = store.add_hall("Hall A", 30);
        let s1 = store.add_student("Ada", "ada@uni.edu");
        store.ensure_schedule_row(exam, s1, None).await.unwrap();

        let err = store
            .seat_students(exam, hall, &[s1, StudentId(999)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.schedule_rows().iter().all(|r| !r.is_seated()));
    }

    #[tokio::test]
    async fn unhealthy_store_fails_reads() {
        let store = InMemoryStore::new();
        store.set_healthy(false);
        let err = store.list_exams().await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
        store.set_healthy(true);
        assert!(store.list_exams().await.is_ok());
    }

    #[tokio::test]
    async fn failing_exam_rejects_writes_but_not_reads() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let exam = store.add_exam("Algebra final", course);
        store.fail_writes_for_exam(exam);

        assert!(store.set_exam_slot(exam, Some(slot(3, 9))).await.is_err());
        assert!(store.get_exam(exam).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn row_budget_fails_only_new_rows() {
        let store = InMemoryStore::new();
        let course = store.add_course("Algebra", "Science");
        let exam = store.add_exam("Algebra final", course);
        let s1 = store.add_student("s1", "s1@uni.edu");
        let s2 = store.add_student("s2", "s2@uni.edu");
        store.fail_schedule_rows_after(1);

        assert!(store.ensure_schedule_row(exam, s1, None).await.unwrap());
        assert!(!store.ensure_schedule_row(exam, s1, None).await.unwrap());
        assert!(store.ensure_schedule_row(exam, s2, None).await.is_err());

        store.clear_failures();
        assert!(store.ensure_schedule_row(exam, s2, None).await.unwrap());
        assert_eq!(store.get_student(s2).await.unwrap().unwrap().name, "s2");
    }

    // ── Snapshots ─────────────────────────────────────────────────────────────

    const DATASET: &str = r#"
students:
  - { id: 1, name: Ada, email: ada@uni.edu }
  - { id: 2, name: Bo, email: bo@uni.edu }
courses:
  - { id: 10, name: Algebra, college: Science }
enrollments:
  - { student: 1, course: 10 }
  - { student: 2, course: 10 }
exams:
  - { id: 100, name: Algebra final, course: 10, college: Science }
halls:
  - { id: 200, name: Hall A, capacity: 40 }
instructors:
  - id: 300
    name: Dr. Lee
    email: lee@uni.edu
    availability:
      - date: 01Jan
        times: ["9:00AM", "11:00AM"]
"#;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn load_dataset_from_yaml() {
        let f = yaml_tempfile(DATASET);
        let store = InMemoryStore::load_from_file(f.path()).unwrap();

        assert_eq!(
            store.enrolled_students(CourseId(10)).await.unwrap(),
            vec![StudentId(1), StudentId(2)]
        );
        let lee = store.get_instructor(InstructorId(300)).await.unwrap().unwrap();
        assert_eq!(lee.availability[0].times.len(), 2);

        // New ids never collide with loaded ones
        let hall = store.add_hall("Hall B", 10);
        assert!(hall.0 > 300);
    }

    #[tokio::test]
    async fn save_then_load_preserves_slots_and_seats() {
        let f = yaml_tempfile(DATASET);
        let store = InMemoryStore::load_from_file(f.path()).unwrap();
        store
            .set_exam_slot(ExamId(100), Some(slot(5, 9)))
            .await
            .unwrap();
        store
            .ensure_schedule_row(ExamId(100), StudentId(1), Some("Science".into()))
            .await
            .unwrap();
        store
            .seat_students(ExamId(100), HallId(200), &[StudentId(1)])
            .await
            .unwrap();

        let out = NamedTempFile::new().unwrap();
        store.save_to_file(out.path()).unwrap();
        let reloaded = InMemoryStore::load_from_file(out.path()).unwrap();

        assert_eq!(reloaded.to_dataset(), store.to_dataset());
        assert_eq!(reloaded.exam(ExamId(100)).unwrap().slot(), Some(slot(5, 9)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = "halls:\n  - { id: 1, name: A, capacity: 1 }\n  - { id: 1, name: B, capacity: 2 }\n";
        let f = yaml_tempfile(yaml);
        assert!(InMemoryStore::load_from_file(f.path()).is_err());
    }

    #[test]
    fn dangling_enrollment_is_rejected() {
        let yaml = "enrollments:\n  - { student: 1, course: 2 }\n";
        let f = yaml_tempfile(yaml);
        assert!(InMemoryStore::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        assert!(InMemoryStore::load_from_file(Path::new("/nonexistent/dataset.yaml")).is_err());
    }
}
