/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Student conflict index.
//!
//! Maps every student placed so far in a run to the exam days they already
//! sit on.  Conflicts are day-granular: a student may not sit two exams on
//! the same day, whichever sitting each is in.
//!
//! The index is built empty at the start of each run and dropped at the end;
//! nothing survives between runs.

use std::collections::{BTreeSet, HashMap};

use crate::model::StudentId;

/// Day index into the run's slot universe.
pub type DayIndex = usize;

#[derive(Debug, Default)]
pub struct ConflictIndex {
    occupied: HashMap<StudentId, BTreeSet<DayIndex>>,
}

impl ConflictIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if any of `students` already sits an exam on `day`.
    pub fn conflicts<'a>(
        &self,
        students: impl IntoIterator<Item = &'a StudentId>,
        day: DayIndex,
    ) -> bool {
        students.into_iter().any(|s| {
            self.occupied
                .get(s)
                .map(|days| days.contains(&day))
                .unwrap_or(false)
        })
    }

    /// Mark `students` as sitting an exam on `day`.
    pub fn book<'a>(&mut self, students: impl IntoIterator<Item = &'a StudentId>, day: DayIndex) {
        for s in students {
            self.occupied.entry(*s).or_default().insert(day);
        }
    }

    /// Number of exam days booked for `student`.
    pub fn days_booked(&self, student: StudentId) -> usize {
        self.occupied.get(&student).map(|d| d.len()).unwrap_or(0)
    }
}

/// `true` if the two student sets share at least one student.
pub fn overlaps(a: &BTreeSet<StudentId>, b: &BTreeSet<StudentId>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|s| large.contains(s))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
