/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Slot universe and per-day placement tables.
//!
//! The universe is a fixed list of exam days counted forward from tomorrow,
//! skipping the weekly rest days.  Each day carries a [`DayTable`] recording
//! which candidates sit in which position and how many exams each college
//! already has that day.  Tables live for one scheduling run only.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::config::SchedulingConfig;
use crate::model::TimePosition;

/// The exam days available to a run starting on `today`.
///
/// Returns exactly `planning_days` dates (fewer only at the end of the
/// representable calendar), strictly after `today`, none on a rest day.
pub fn exam_days(today: NaiveDate, config: &SchedulingConfig) -> Vec<NaiveDate> {
    let wanted = config.planning_days as usize;
    let mut days = Vec::with_capacity(wanted);
    let mut cursor = today.succ_opt();

    while let Some(date) = cursor {
        if days.len() >= wanted {
            break;
        }
        if config.is_exam_day(date.weekday()) {
            days.push(date);
        }
        cursor = date.succ_opt();
    }
    days
}

/// Placement state for one exam day during a run.
#[derive(Debug, Clone)]
pub struct DayTable {
    pub date: NaiveDate,
    /// Candidate indices placed in the early sitting, in placement order.
    early: Vec<usize>,
    /// Candidate indices placed in the late sitting, in placement order.
    late: Vec<usize>,
    /// College → exams placed this day (both sittings).
    college_counts: BTreeMap<String, u32>,
}

impl DayTable {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            early: Vec::new(),
            late: Vec::new(),
            college_counts: BTreeMap::new(),
        }
    }

    /// Exams of `college` already placed on this day.
    pub fn college_count(&self, college: &str) -> u32 {
        self.college_counts.get(college).copied().unwrap_or(0)
    }

    /// Position the next exam on this day would take.
    ///
    /// Early, unless early is occupied and late is still empty.  Once both
    /// sittings hold an exam every further exam goes to early again; the
    /// late sitting is never filled twice.
    pub fn next_position(&self) -> TimePosition {
        if !self.early.is_empty() && self.late.is_empty() {
            TimePosition::Late
        } else {
            TimePosition::Early
        }
    }

    pub fn early(&self) -> &[usize] {
        &self.early
    }

    pub fn late(&self) -> &[usize] {
        &self.late
    }

    pub fn exam_count(&self) -> usize {
        self.early.len() + self.late.len()
    }

    /// Record candidate `idx` at `position`, charging one exam per entry of
    /// `colleges` against the day's quota.
    pub fn place(&mut self, idx: usize, position: TimePosition, colleges: &[String]) {
        match position {
            TimePosition::Early => self.early.push(idx),
            TimePosition::Late => self.late.push(idx),
        }
        for college in colleges {
            *self.college_counts.entry(college.clone()).or_insert(0) += 1;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
