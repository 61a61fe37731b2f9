/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Entity records read and written through the [`EntityStore`].
//!
//! ```text
//! Course ──< Enrollment >── Student
//!   │  └──< EquivalenceGroup (cross-listed courses)
//!   └── Exam ──< ScheduleRow (exam, student) ──> Hall?
//!         └──< InvigilatorAssignment (exam, hall, instructor)
//! ```
//!
//! # Ownership model
//! The store owns canonical state.  The engine works on owned copies fetched
//! at the start of each operation and writes back through the store; it never
//! keeps an entity across operations.
//!
//! [`EntityStore`]: crate::store::EntityStore

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ── Identities ────────────────────────────────────────────────────────────────

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Opaque exam identity.
    ExamId
);
entity_id!(
    /// Opaque course identity.
    CourseId
);
entity_id!(
    /// Opaque student identity.
    StudentId
);
entity_id!(
    /// Opaque hall identity.
    HallId
);
entity_id!(
    /// Opaque instructor identity.
    InstructorId
);
entity_id!(
    /// Opaque course-equivalence group identity.
    GroupId
);

// ── Slots ─────────────────────────────────────────────────────────────────────

/// One of the two fixed daily exam positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePosition {
    Early,
    Late,
}

/// The exact (date, time) an exam sits at.  Exams with equal slots are
/// co-located and may share hall space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time.format("%H:%M"))
    }
}

// ── Exam ──────────────────────────────────────────────────────────────────────

/// An exam for one course.  Unscheduled exactly when `date` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub name: String,
    pub course: CourseId,
    pub college: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_opt")]
    pub time: Option<NaiveTime>,
}

impl Exam {
    pub fn is_scheduled(&self) -> bool {
        self.date.is_some()
    }

    /// The exam's slot, if both date and time are set.
    pub fn slot(&self) -> Option<Slot> {
        Some(Slot::new(self.date?, self.time?))
    }
}

// ── Courses & students ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub college: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
}

/// A student's enrollment in a course; unique per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Enrollment {
    pub student: StudentId,
    pub course: CourseId,
}

/// A named set of cross-listed courses whose exams always share a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    pub id: GroupId,
    pub name: String,
    pub courses: Vec<CourseId>,
}

// ── Halls ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hall {
    pub id: HallId,
    pub name: String,
    /// Seats available to all exams sitting in the hall at one slot.
    pub capacity: u32,
}

// ── Instructors ───────────────────────────────────────────────────────────────

/// One day an instructor can invigilate.  Both `date` and `times` are free
/// text; see [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub date: String,
    #[serde(default)]
    pub times: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityDay>,
}

/// Identity and contact details handed back to callers choosing invigilators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructorContact {
    pub id: InstructorId,
    pub name: String,
    pub email: String,
}

impl From<&Instructor> for InstructorContact {
    fn from(i: &Instructor) -> Self {
        Self {
            id: i.id,
            name: i.name.clone(),
            email: i.email.clone(),
        }
    }
}

// ── Seating & invigilation ────────────────────────────────────────────────────

/// A student's seat for one exam.  `hall == None` means unseated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub exam: ExamId,
    pub student: StudentId,
    #[serde(default)]
    pub hall: Option<HallId>,
    /// College recorded when the row was created.
    #[serde(default)]
    pub college: Option<String>,
}

impl ScheduleRow {
    pub fn is_seated(&self) -> bool {
        self.hall.is_some()
    }

    pub fn is_seated_in(&self, hall: HallId) -> bool {
        self.hall == Some(hall)
    }
}

/// "This instructor monitors this hall for this exam."  Unique per triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvigilatorAssignment {
    pub exam: ExamId,
    pub hall: HallId,
    pub instructor: InstructorId,
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

/// Times are written as `HH:MM`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format("%H:%M"))
    }
}

/// Optional times: written as `HH:MM`, any clock marker accepted on input.
mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.collect_str(&t.format("%H:%M")),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) => crate::parse::parse_clock_time(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognised time '{raw}'"))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Exam {
        Exam {
            id: ExamId(1),
            name: "Algebra".into(),
            course: CourseId(10),
            college: "Science".into(),
            date,
            time,
        }
    }

    #[test]
    fn exam_without_date_is_unscheduled() {
        let e = exam(None, NaiveTime::from_hms_opt(9, 0, 0));
        assert!(!e.is_scheduled());
        assert_eq!(e.slot(), None);
    }

    #[test]
    fn slot_requires_both_date_and_time() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 20);
        assert_eq!(exam(d, None).slot(), None);

        let t = NaiveTime::from_hms_opt(11, 0, 0);
        let slot = exam(d, t).slot().unwrap();
        assert_eq!(slot.to_string(), "2026-10-20 11:00");
    }

    #[test]
    fn schedule_row_seating() {
        let mut row = ScheduleRow {
            exam: ExamId(1),
            student: StudentId(2),
            hall: None,
            college: None,
        };
        assert!(!row.is_seated());
        row.hall = Some(HallId(7));
        assert!(row.is_seated());
        assert!(row.is_seated_in(HallId(7)));
        assert!(!row.is_seated_in(HallId(8)));
    }

    #[test]
    fn exam_yaml_accepts_lenient_time_and_writes_hh_mm() {
        let yaml = "id: 3\nname: Physics\ncourse: 4\ncollege: Science\ndate: 2026-10-21\ntime: 9:00AM\n";
        let e: Exam = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(e.time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(e.id, ExamId(3));

        let out = serde_yaml::to_string(&e).unwrap();
        assert!(out.contains("09:00"), "got: {out}");
    }

    #[test]
    fn exam_yaml_without_slot_is_unscheduled() {
        let yaml = "id: 3\nname: Physics\ncourse: 4\ncollege: Science\n";
        let e: Exam = serde_yaml::from_str(yaml).unwrap();
        assert!(!e.is_scheduled());
        assert_eq!(e.time, None);
    }
}
