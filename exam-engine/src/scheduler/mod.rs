//! Timetable scheduler.
//!
//! [`TimetableScheduler`] places unscheduled exams on exam days with a greedy
//! first-fit pass.  It works purely on in-memory [`Candidate`]s and returns a
//! [`TimetablePlan`]; committing the plan to the entity store (and fanning it
//! out to equivalent exams) is the engine's job.
//!
//! # Placement policy
//!
//! | Step | Rule |
//! |---|---|
//! | Order | Largest enrollment first; ties keep exam-id order |
//! | Scan | Exam days in chronological order, first acceptable day wins |
//! | Quota | A college may hold at most `college_daily_quota` exams per day |
//! | Conflict | No student may sit two exams on the same day |
//! | Sitting | Early, unless early is taken and late is free |
//! | Late guard | A late exam may not share students with a same-college early exam |
//!
//! An exam with no acceptable day stays unplaced; that is not an error.
//!
//! # Example
//! ```rust
//! use std::collections::BTreeSet;
//! use chrono::NaiveDate;
//! use exam_engine::config::SchedulingConfig;
//! use exam_engine::model::{ExamId, StudentId};
//! use exam_engine::scheduler::{Candidate, TimetableScheduler};
//!
//! let scheduler = TimetableScheduler::new(SchedulingConfig::default());
//! let students: BTreeSet<StudentId> = [StudentId(1), StudentId(2)].into_iter().collect();
//! let plan = scheduler.plan(
//!     vec![Candidate::single(ExamId(7), "Science", students)],
//!     NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
//! );
//! assert_eq!(plan.placements.len(), 1);
//! assert_eq!(plan.placements[0].date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
//! ```

pub mod conflict;
pub mod slots;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

use crate::config::SchedulingConfig;
use crate::model::{ExamId, Slot, StudentId, TimePosition};

use conflict::{overlaps, ConflictIndex};
use slots::{exam_days, DayTable};

// ── Input / output types ──────────────────────────────────────────────────────

/// One unit of placement: an exam, plus any unscheduled exams of equivalent
/// courses that must share its slot.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Exam the placement is reported under.
    pub lead: ExamId,
    /// Equivalent unscheduled exams placed together with `lead`.
    pub followers: Vec<ExamId>,
    /// College of every member exam (lead first); each entry counts against
    /// that college's daily quota.
    pub colleges: Vec<String>,
    /// Union of the members' enrolled students.
    pub students: BTreeSet<StudentId>,
}

impl Candidate {
    /// A candidate made of a single exam.
    pub fn single(exam: ExamId, college: impl Into<String>, students: BTreeSet<StudentId>) -> Self {
        Self {
            lead: exam,
            followers: Vec::new(),
            colleges: vec![college.into()],
            students,
        }
    }

    /// Every exam placed by this candidate, lead first.
    pub fn members(&self) -> impl Iterator<Item = ExamId> + '_ {
        std::iter::once(self.lead).chain(self.followers.iter().copied())
    }

    /// Member exams per college.
    fn college_load(&self) -> BTreeMap<&str, u32> {
        let mut load = BTreeMap::new();
        for c in &self.colleges {
            *load.entry(c.as_str()).or_insert(0) += 1;
        }
        load
    }

    fn shares_college_with(&self, other: &Candidate) -> bool {
        self.colleges.iter().any(|c| other.colleges.contains(c))
    }
}

/// Where one candidate landed.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub lead: ExamId,
    pub followers: Vec<ExamId>,
    pub date: NaiveDate,
    pub position: TimePosition,
    pub time: NaiveTime,
}

impl Placement {
    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.time)
    }
}

/// Result of a planning pass.
#[derive(Debug, Clone, Default)]
pub struct TimetablePlan {
    /// Placements in the order they were made (largest candidates first).
    pub placements: Vec<Placement>,
    /// Lead exams for which no day was acceptable.
    pub unplaced: Vec<ExamId>,
}

// ── TimetableScheduler ────────────────────────────────────────────────────────

/// Greedy exam-day scheduler.
///
/// Holds only the policy.  All per-run state (day tables, conflict index) is
/// allocated inside [`plan`](Self::plan) and dropped at the end of the call,
/// so one scheduler can serve any number of runs.
#[derive(Debug, Clone, Default)]
pub struct TimetableScheduler {
    config: SchedulingConfig,
}

impl TimetableScheduler {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Clock time of a sitting.
    pub fn time_of(&self, position: TimePosition) -> NaiveTime {
        match position {
            TimePosition::Early => self.config.early_time,
            TimePosition::Late => self.config.late_time,
        }
    }

    /// Place `candidates` on the exam days following `today`.
    pub fn plan(&self, candidates: Vec<Candidate>, today: NaiveDate) -> TimetablePlan {
        // ── Per-run state ─────────────────────────────────────────────────────
        let mut days: Vec<DayTable> = exam_days(today, &self.config)
            .into_iter()
            .map(DayTable::new)
            .collect();
        let mut index = ConflictIndex::new();

        info!(
            candidates = candidates.len(),
            days = days.len(),
            first_day = ?days.first().map(|d| d.date),
            "=== TimetableScheduler::plan() ==="
        );

        // Largest first; sort_by is stable so ties keep input order
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| {
            candidates[b]
                .students
                .len()
                .cmp(&candidates[a].students.len())
        });

        let mut plan = TimetablePlan::default();

        for idx in order {
            let cand = &candidates[idx];
            let mut placed = false;

            for (day_idx, day) in days.iter_mut().enumerate() {
                if !self.within_quota(day, cand) {
                    debug!(exam = %cand.lead, date = %day.date, "college quota reached");
                    continue;
                }
                if index.conflicts(&cand.students, day_idx) {
                    debug!(exam = %cand.lead, date = %day.date, "student already sits an exam");
                    continue;
                }

                let position = day.next_position();
                if position == TimePosition::Late
                    && Self::late_sitting_clashes(day, cand, &candidates)
                {
                    debug!(
                        exam = %cand.lead,
                        date = %day.date,
                        "late sitting shares students with a same-college early exam"
                    );
                    continue;
                }

                day.place(idx, position, &cand.colleges);
                index.book(&cand.students, day_idx);

                let placement = Placement {
                    lead: cand.lead,
                    followers: cand.followers.clone(),
                    date: day.date,
                    position,
                    time: self.time_of(position),
                };
                info!(
                    exam = %cand.lead,
                    followers = cand.followers.len(),
                    students = cand.students.len(),
                    slot = %placement.slot(),
                    "✓ placed"
                );
                plan.placements.push(placement);
                placed = true;
                break;
            }

            if !placed {
                warn!(
                    exam = %cand.lead,
                    students = cand.students.len(),
                    "no acceptable exam day — left unscheduled"
                );
                plan.unplaced.push(cand.lead);
            }
        }

        info!(
            placed = plan.placements.len(),
            unplaced = plan.unplaced.len(),
            "=== Planning complete ==="
        );
        plan
    }

    /// `true` if every member college of `cand` still has room on `day`.
    fn within_quota(&self, day: &DayTable, cand: &Candidate) -> bool {
        cand.college_load()
            .into_iter()
            .all(|(college, n)| day.college_count(college) + n <= self.config.college_daily_quota)
    }

    /// Late-sitting guard: a same-college exam in the early sitting must not
    /// share students with `cand`.
    fn late_sitting_clashes(day: &DayTable, cand: &Candidate, all: &[Candidate]) -> bool {
        day.early()
            .iter()
            .map(|&i| &all[i])
            .filter(|early| early.shares_college_with(cand))
            .any(|early| overlaps(&early.students, &cand.students))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
