/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exam engine – timetabling, hall seating and invigilation
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – YAML scheduling policy
//! ├── model           – entity records and ids
//! ├── parse           – lenient day / time token parsing
//! ├── store/          – EntityStore trait + in-memory store
//! ├── scheduler/      – greedy exam-day placement
//! ├── equivalence     – cross-listed course propagation
//! ├── halls/          – hall seating for one exam
//! ├── invigilators/   – instructor matching and posting
//! ├── reports         – conflicts, timetable, slot sheets
//! ├── error           – engine error types
//! └── engine          – ExamEngine facade
//! ```

pub mod config;
pub mod engine;
pub mod equivalence;
pub mod error;
pub mod halls;
pub mod invigilators;
pub mod model;
pub mod parse;
pub mod reports;
pub mod scheduler;
pub mod store;
