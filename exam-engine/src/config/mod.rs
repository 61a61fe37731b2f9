//! Engine configuration loading.
//!
//! Every field is optional; missing values fall back to the policy the
//! registry office has always used (14 exam days, Friday and Saturday off,
//! sittings at 09:00 and 11:00, at most 3 exams per college per day).
//!
//! The expected YAML structure is:
//! ```yaml
//! scheduling:
//!   planning_days: 14
//!   rest_days: [Fri, Sat]
//!   early_time: "09:00"
//!   late_time: "11:00"
//!   college_daily_quota: 3
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use tracing::{debug, info};

use crate::parse::parse_clock_time;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
struct EngineConfigFile {
    #[serde(default)]
    scheduling: SchedulingEntry,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulingEntry {
    planning_days: Option<u32>,
    rest_days: Option<Vec<Weekday>>,
    early_time: Option<String>,
    late_time: Option<String>,
    college_daily_quota: Option<u32>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Slot-universe and quota policy used by the timetable scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingConfig {
    /// Number of exam days generated, counted from tomorrow.
    pub planning_days: u32,
    /// Weekdays never used for exams.
    pub rest_days: Vec<Weekday>,
    /// Clock time of the early sitting.
    pub early_time: NaiveTime,
    /// Clock time of the late sitting.
    pub late_time: NaiveTime,
    /// Maximum exams of one college on one day, both sittings combined.
    pub college_daily_quota: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            planning_days: 14,
            rest_days: vec![Weekday::Fri, Weekday::Sat],
            early_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            late_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
            college_daily_quota: 3,
        }
    }
}

impl SchedulingConfig {
    /// `true` when exams may be placed on `weekday`.
    pub fn is_exam_day(&self, weekday: Weekday) -> bool {
        !self.rest_days.contains(&weekday)
    }

    fn validate(&self) -> Result<()> {
        if self.planning_days == 0 {
            bail!("scheduling.planning_days must be at least 1");
        }
        if self.college_daily_quota == 0 {
            bail!("scheduling.college_daily_quota must be at least 1");
        }
        let distinct: BTreeSet<u32> = self
            .rest_days
            .iter()
            .map(|d| d.num_days_from_monday())
            .collect();
        if distinct.len() >= 7 {
            bail!("scheduling.rest_days leaves no weekday for exams");
        }
        if self.early_time >= self.late_time {
            bail!(
                "scheduling.early_time ({}) must be before late_time ({})",
                self.early_time.format("%H:%M"),
                self.late_time.format("%H:%M")
            );
        }
        Ok(())
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub scheduling: SchedulingConfig,
}

impl EngineConfig {
    /// Parses `path` into an [`EngineConfig`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, a time marker cannot be parsed, or the resulting policy is
    /// unusable (no exam days, zero quota, late sitting not after early).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading engine configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses a YAML document into an [`EngineConfig`].
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: EngineConfigFile = if content.trim().is_empty() {
            EngineConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        let defaults = SchedulingConfig::default();
        let entry = file.scheduling;

        let early_time = match entry.early_time {
            Some(raw) => parse_clock_time(&raw)
                .with_context(|| format!("scheduling.early_time: unrecognised time '{raw}'"))?,
            None => defaults.early_time,
        };
        let late_time = match entry.late_time {
            Some(raw) => parse_clock_time(&raw)
                .with_context(|| format!("scheduling.late_time: unrecognised time '{raw}'"))?,
            None => defaults.late_time,
        };

        let scheduling = SchedulingConfig {
            planning_days: entry.planning_days.unwrap_or(defaults.planning_days),
            rest_days: entry.rest_days.unwrap_or(defaults.rest_days),
            early_time,
            late_time,
            college_daily_quota: entry
                .college_daily_quota
                .unwrap_or(defaults.college_daily_quota),
        };
        scheduling.validate()?;

        debug!(
            planning_days = scheduling.planning_days,
            rest_days = ?scheduling.rest_days,
            early = %scheduling.early_time.format("%H:%M"),
            late = %scheduling.late_time.format("%H:%M"),
            quota = scheduling.college_daily_quota,
            "scheduling policy"
        );

        Ok(Self { scheduling })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_policy_has_expected_values() {
        let cfg = SchedulingConfig::default();
        assert_eq!(cfg.planning_days, 14);
        assert_eq!(cfg.rest_days, vec![Weekday::Fri, Weekday::Sat]);
        assert_eq!(cfg.early_time, hm(9, 0));
        assert_eq!(cfg.late_time, hm(11, 0));
        assert_eq!(cfg.college_daily_quota, 3);
        assert!(!cfg.is_exam_day(Weekday::Fri));
        assert!(cfg.is_exam_day(Weekday::Sun));
    }

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
scheduling:
  planning_days: 10
  rest_days: [Sat, Sun]
  early_time: "8:30AM"
  late_time: "13:00"
  college_daily_quota: 2
"#;
        let f = yaml_tempfile(yaml);
        let cfg = EngineConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.scheduling.planning_days, 10);
        assert_eq!(cfg.scheduling.rest_days, vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(cfg.scheduling.early_time, hm(8, 30));
        assert_eq!(cfg.scheduling.late_time, hm(13, 0));
        assert_eq!(cfg.scheduling.college_daily_quota, 2);
    }

    #[test]
    fn optional_fields_use_defaults_when_absent() {
        let cfg = EngineConfig::from_yaml_str("scheduling:\n  planning_days: 5\n").unwrap();
        assert_eq!(cfg.scheduling.planning_days, 5);
        assert_eq!(cfg.scheduling.rest_days, vec![Weekday::Fri, Weekday::Sat]);
        assert_eq!(cfg.scheduling.college_daily_quota, 3);
    }

    #[test]
    fn empty_document_is_the_default_policy() {
        let cfg = EngineConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn late_before_early_is_rejected() {
        let yaml = "scheduling:\n  early_time: \"11:00\"\n  late_time: \"09:00\"\n";
        assert!(EngineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn unparseable_time_is_rejected() {
        let yaml = "scheduling:\n  early_time: \"breakfast\"\n";
        assert!(EngineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn all_rest_days_is_rejected() {
        let yaml = "scheduling:\n  rest_days: [Mon, Tue, Wed, Thu, Fri, Sat, Sun]\n";
        assert!(EngineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn zero_quota_is_rejected() {
        let yaml = "scheduling:\n  college_daily_quota: 0\n";
        assert!(EngineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = EngineConfig::load_from_file(Path::new("/nonexistent/path/engine.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(EngineConfig::load_from_file(f.path()).is_err());
    }
}
