/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use exam_engine::config::EngineConfig;
use exam_engine::engine::ExamEngine;
use exam_engine::model::{CourseId, ExamId, HallId, InstructorId};
use exam_engine::parse::{parse_clock_time, parse_exam_date};
use exam_engine::store::InMemoryStore;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Exam timetabling engine.
///
/// Example:
///   exam-engine --dataset demos/dataset.yaml --config demos/engine.yaml schedule
///   exam-engine --dataset demos/dataset.yaml allocate-halls --exam 100 --hall 200 --hall 201
#[derive(Debug, Parser)]
#[command(
    name = "exam-engine",
    about = "Exam timetabling, hall seating and invigilation",
    long_about = None,
)]
struct Cli {
    /// YAML snapshot of the entity store; written back after mutating commands.
    #[arg(short = 'd', long = "dataset")]
    dataset: PathBuf,

    /// YAML engine configuration.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Run the command without saving the dataset.
    #[arg(long = "dry-run", default_value_t = false)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Place every unscheduled exam on the coming exam days.
    Schedule {
        /// Plan as if today were this date (default: local today).
        #[arg(long)]
        today: Option<String>,
    },
    /// Seat an exam's unseated students in the given halls, in order.
    AllocateHalls {
        #[arg(long)]
        exam: i64,
        #[arg(long = "hall", required = true)]
        halls: Vec<i64>,
    },
    /// List instructors available to invigilate an exam.
    Invigilators {
        #[arg(long)]
        exam: i64,
    },
    /// Post instructors to an exam's hall.
    Assign {
        #[arg(long)]
        exam: i64,
        #[arg(long)]
        hall: i64,
        #[arg(long = "instructor", required = true)]
        instructors: Vec<i64>,
    },
    /// Put an exam (and its equivalents) at a date and time.
    Place {
        #[arg(long)]
        exam: i64,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },
    /// Unschedule an exam and its equivalents.
    Reset {
        #[arg(long)]
        exam: i64,
    },
    /// Report students sitting two exams at once.
    Conflicts,
    /// Show where an exam's students sit.
    Usage {
        #[arg(long)]
        exam: i64,
    },
    /// Print the timetable.
    Timetable,
    /// List students enrolled in both courses.
    Shared {
        #[arg(long = "course", required = true)]
        courses: Vec<i64>,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Schedule { .. }
                | Command::AllocateHalls { .. }
                | Command::Assign { .. }
                | Command::Place { .. }
                | Command::Reset { .. }
        )
    }
}

fn date_arg(raw: &str) -> Result<NaiveDate> {
    parse_exam_date(raw).ok_or_else(|| anyhow!("unrecognised date '{raw}'"))
}

fn time_arg(raw: &str) -> Result<NaiveTime> {
    parse_clock_time(raw).ok_or_else(|| anyhow!("unrecognised time '{raw}'"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        dataset = %cli.dataset.display(),
        config  = ?cli.config,
        dry_run = cli.dry_run,
        "Configuration"
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load configuration ────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => {
            warn!("No engine configuration file provided, using default scheduling policy");
            EngineConfig::default()
        }
    };

    let store = Arc::new(InMemoryStore::load_from_file(&cli.dataset)?);
    let engine = ExamEngine::new(Arc::clone(&store), config);

    match &cli.command {
        Command::Schedule { today } => {
            let outcome = match today {
                Some(raw) => engine.schedule_unassigned_exams_from(date_arg(raw)?).await?,
                None => engine.schedule_unassigned_exams().await?,
            };
            for (exam, slot) in &outcome.placements {
                println!("exam {exam:>6}  {slot}");
            }
            for exam in &outcome.unplaced {
                println!("exam {exam:>6}  (no free day)");
            }
            for failure in &outcome.failures {
                println!("exam {:>6}  FAILED: {}", failure.exam, failure.error);
            }
        }
        Command::AllocateHalls { exam, halls } => {
            let halls: Vec<HallId> = halls.iter().copied().map(HallId).collect();
            let alloc = engine.allocate_halls(ExamId(*exam), &halls).await?;
            for s in &alloc.seatings {
                println!("hall {:>6}  seated {:>4}  seats left {:>4}", s.hall, s.seated, s.seats_left);
            }
            for h in &alloc.unknown_halls {
                println!("hall {h:>6}  unknown");
            }
            println!("unseated: {}", alloc.unseated);
        }
        Command::Invigilators { exam } => {
            for c in engine.find_available_invigilators(ExamId(*exam)).await? {
                println!("{:>6}  {}  <{}>", c.id, c.name, c.email);
            }
        }
        Command::Assign { exam, hall, instructors } => {
            let ids: Vec<InstructorId> = instructors.iter().copied().map(InstructorId).collect();
            let ensured = engine
                .assign_invigilators(ExamId(*exam), HallId(*hall), &ids)
                .await?;
            for a in ensured {
                println!("exam {:>6}  hall {:>6}  instructor {:>6}", a.exam, a.hall, a.instructor);
            }
        }
        Command::Place { exam, date, time } => {
            let placed = engine
                .place_exam(ExamId(*exam), date_arg(date)?, time_arg(time)?)
                .await?;
            println!("placed: {placed:?}");
        }
        Command::Reset { exam } => {
            let reset = engine.reset_exam(ExamId(*exam)).await?;
            println!("reset: {reset:?}");
        }
        Command::Conflicts => {
            for c in engine.student_conflicts().await? {
                println!("exam {:>6}  {}  students {:?}", c.exam, c.slot, c.students);
            }
        }
        Command::Usage { exam } => {
            let report = engine.hall_usage(ExamId(*exam)).await?;
            for h in &report.halls {
                println!(
                    "{:<20} seated {:>4}  seats left {:>4}  invigilators {}",
                    h.name,
                    h.seated,
                    h.seats_left,
                    h.invigilators.join(", ")
                );
            }
            println!("unseated {} of {}", report.unseated, report.total);
        }
        Command::Timetable => {
            for exam in engine.timetable().await? {
                let slot = exam
                    .slot()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                println!("{slot}  {:<30} {}", exam.name, exam.college);
            }
        }
        Command::Shared { courses } => {
            let [a, b] = courses[..] else {
                return Err(anyhow!("expected exactly two --course values"));
            };
            for s in engine.shared_students(CourseId(a), CourseId(b)).await? {
                println!("{:>6}  {}  <{}>", s.id, s.name, s.email);
            }
        }
    }

    // ── Save dataset ──────────────────────────────────────────────────────────
    if cli.command.mutates() {
        if cli.dry_run {
            info!("Dry run: dataset not saved");
        } else {
            store
                .save_to_file(&cli.dataset)
                .with_context(|| format!("Cannot save dataset: {}", cli.dataset.display()))?;
            info!("Dataset saved to: {}", cli.dataset.display());
        }
    }
    Ok(())
}
