/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Lenient parsers for the free-text tokens stored on instructor availability
//! records and typed by operators.
//!
//! Availability days are recorded as day/month markers (`"01Jan"`,
//! `"1 January"`, `"Mon, 01 Jan"`, `"01/01"`, `"2024-01-01"`), availability
//! times as clock markers (`"9:00AM"`, `"09:00"`, `"9 am"`, `"21:30:00"`).
//!
//! Every parser returns `Option`: a token that cannot be understood is simply
//! a non-match for the caller, never an error.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

// ── Day / month ───────────────────────────────────────────────────────────────

/// A calendar day without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayMonth {
    pub day: u32,
    pub month: u32,
}

impl DayMonth {
    /// The day/month of a full calendar date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
        }
    }
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Leap year used to validate day/month pairs so that `29Feb` is accepted.
const VALIDATION_YEAR: i32 = 2024;

#[derive(Debug, PartialEq)]
enum Piece {
    Num(u32),
    Word(String),
}

/// Split `token` into runs of digits and runs of letters; everything else is
/// a separator.  Returns `None` on numeric overflow.
fn pieces(token: &str) -> Option<Vec<Piece>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    let mut letters = String::new();

    let flush = |digits: &mut String, letters: &mut String, out: &mut Vec<Piece>| -> Option<()> {
        if !digits.is_empty() {
            out.push(Piece::Num(digits.parse().ok()?));
            digits.clear();
        }
        if !letters.is_empty() {
            out.push(Piece::Word(letters.to_lowercase()));
            letters.clear();
        }
        Some(())
    };

    for c in token.chars() {
        if c.is_ascii_digit() {
            if !letters.is_empty() {
                flush(&mut digits, &mut letters, &mut out)?;
            }
            digits.push(c);
        } else if c.is_alphabetic() {
            if !digits.is_empty() {
                flush(&mut digits, &mut letters, &mut out)?;
            }
            letters.push(c);
        } else {
            flush(&mut digits, &mut letters, &mut out)?;
        }
    }
    flush(&mut digits, &mut letters, &mut out)?;
    Some(out)
}

/// Month number (1–12) for an English month name or any prefix of at least
/// three letters (`"jan"`, `"sept"`, `"December"`).
fn month_from_word(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(word))
        .map(|i| i as u32 + 1)
}

fn is_weekday_word(word: &str) -> bool {
    word.len() >= 3 && WEEKDAYS.iter().any(|d| d.starts_with(word))
}

fn valid_day_month(day: u32, month: u32) -> Option<DayMonth> {
    NaiveDate::from_ymd_opt(VALIDATION_YEAR, month, day)?;
    Some(DayMonth { day, month })
}

/// Parse a free-text availability day into a [`DayMonth`].
///
/// Any year present in the token is ignored.
pub fn parse_day_month(token: &str) -> Option<DayMonth> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(DayMonth::of(date));
    }

    let mut parts = pieces(token)?;

    // "Mon, 01 Jan" → drop the weekday
    let leading_weekday = matches!(
        parts.first(),
        Some(Piece::Word(w)) if is_weekday_word(w) && month_from_word(w).is_none()
    );
    if leading_weekday && parts.len() >= 3 {
        parts.remove(0);
    }

    match parts.as_slice() {
        [Piece::Num(d), Piece::Word(m)] | [Piece::Num(d), Piece::Word(m), Piece::Num(_)] => {
            valid_day_month(*d, month_from_word(m)?)
        }
        [Piece::Word(m), Piece::Num(d)] | [Piece::Word(m), Piece::Num(d), Piece::Num(_)] => {
            valid_day_month(*d, month_from_word(m)?)
        }
        [Piece::Num(d), Piece::Num(m)] | [Piece::Num(d), Piece::Num(m), Piece::Num(_)] => {
            valid_day_month(*d, *m)
        }
        _ => None,
    }
}

// ── Clock time ────────────────────────────────────────────────────────────────

/// Parse a free-text clock marker into a [`NaiveTime`] (seconds dropped).
///
/// Accepts 12-hour markers with an `am`/`pm` suffix (`"9:00AM"`, `"9 pm"`,
/// `"11.30 a.m."`) and 24-hour markers (`"09:00"`, `"21:30:00"`, `"0900"`).
pub fn parse_clock_time(token: &str) -> Option<NaiveTime> {
    let mut s: String = token
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }
    s = s.replace("a.m.", "am").replace("p.m.", "pm").replace('.', ":");

    let (body, meridiem) = if let Some(rest) = s.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = s.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (s.as_str(), None)
    };

    let (hour, minute) = hour_minute(body)?;

    let hour = match meridiem {
        None => hour,
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn hour_minute(body: &str) -> Option<(u32, u32)> {
    let fields: Vec<&str> = body.split(':').collect();
    if fields.iter().any(|f| f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    match fields.as_slice() {
        // "0900" / "930"
        [compact] if compact.len() == 3 || compact.len() == 4 => {
            let split = compact.len() - 2;
            Some((compact[..split].parse().ok()?, compact[split..].parse().ok()?))
        }
        [hour] if hour.len() <= 2 => Some((hour.parse().ok()?, 0)),
        [hour, minute] | [hour, minute, _] if minute.len() == 2 => {
            Some((hour.parse().ok()?, minute.parse().ok()?))
        }
        _ => None,
    }
}

/// `true` when `token` parses to the same hour and minute as `time`.
pub fn clock_matches(token: &str, time: NaiveTime) -> bool {
    parse_clock_time(token)
        .map(|t| t.hour() == time.hour() && t.minute() == time.minute())
        .unwrap_or(false)
}

/// `true` when `token` parses to the same day and month as `date`.
pub fn day_matches(token: &str, date: NaiveDate) -> bool {
    parse_day_month(token) == Some(DayMonth::of(date))
}

// ── Full dates ────────────────────────────────────────────────────────────────

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%a, %d %b %Y", "%d %b %Y"];

/// Parse an operator-supplied exam date (`"2026-10-20"`, `"20/10/2026"`,
/// `"Tue, 20 Oct 2026"`).
pub fn parse_exam_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
