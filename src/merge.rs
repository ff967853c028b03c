//! Training report discovery and the nutrition/training merge
//!
//! Weekly training reports live in one directory as `report_<start>_<end>.json`.
//! The current week is the latest report; the next week is the first report
//! starting after the current one ends. Planned next-week training is turned into
//! an energy estimate with a MET table and the athlete's current body weight.

use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::models::{
  ActivityRecord, MergedReport, NextWeekEstimate, NutritionSummary, Period, TrainingSummary,
  TrainingWeek,
};
use crate::output::{read_json, OutputError};

/// Written into every merged report; the critique itself is added by hand
pub const CRITIQUE_NOTE: &str = "Critique to be filled in by the nutrition reviewer.";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
  #[error("No current-week training report found in {0}")]
  NoCurrentWeek(String),

  #[error("No nutrition input available")]
  NoNutrition,

  #[error("Failed to list training reports in {path}: {source}")]
  List {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Read(#[from] OutputError),
}

/// ---------------------------------------------------------------------------
/// Report Discovery
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
  pub path: PathBuf,
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// Dates encoded in a `report_<start>_<end>.json` file name
pub fn parse_report_name(name: &str) -> Option<(NaiveDate, NaiveDate)> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  let pattern = PATTERN
    .get_or_init(|| Regex::new(r"^report_(\d{4}-\d{2}-\d{2})_(\d{4}-\d{2}-\d{2})\.json$").ok())
    .as_ref()?;

  let caps = pattern.captures(name)?;
  let start = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
  let end = NaiveDate::parse_from_str(caps.get(2)?.as_str(), "%Y-%m-%d").ok()?;
  Some((start, end))
}

/// Every correctly named report in `dir`, sorted by start date.
/// A missing directory holds no reports.
pub fn list_training_reports(dir: &Path) -> Result<Vec<ReportRef>, MergeError> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let list_error = |source| MergeError::List {
    path: dir.display().to_string(),
    source,
  };

  let mut reports = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(list_error)? {
    let entry = entry.map_err(list_error)?;
    let name = entry.file_name();
    if let Some((start, end)) = name.to_str().and_then(parse_report_name) {
      reports.push(ReportRef {
        path: entry.path(),
        start,
        end,
      });
    }
  }

  reports.sort_by_key(|r| (r.start, r.end));
  Ok(reports)
}

/// The latest week on record
pub fn select_current(reports: &[ReportRef]) -> Option<&ReportRef> {
  reports.iter().max_by_key(|r| (r.start, r.end))
}

/// First report (by start) beginning strictly after `current_end`
pub fn select_next(reports: &[ReportRef], current_end: NaiveDate) -> Option<&ReportRef> {
  reports
    .iter()
    .filter(|r| r.start > current_end)
    .min_by_key(|r| (r.start, r.end))
}

pub fn load_training_week(path: &Path) -> Result<TrainingWeek, MergeError> {
  Ok(read_json(path)?)
}

/// ---------------------------------------------------------------------------
/// Training Summary
/// ---------------------------------------------------------------------------

fn round1(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

/// Minutes per activity type, rounded to 0.1 after each addition
fn minutes_by_type(activities: &[ActivityRecord]) -> BTreeMap<String, f64> {
  activities.iter().fold(BTreeMap::new(), |mut acc, a| {
    let total = acc.entry(a.type_or_unknown().to_string()).or_insert(0.0);
    *total = round1(*total + a.minutes());
    acc
  })
}

pub fn summarize_training(week: &TrainingWeek) -> TrainingSummary {
  let mut count_by_type = BTreeMap::new();
  for activity in &week.activities {
    *count_by_type.entry(activity.type_or_unknown().to_string()).or_insert(0) += 1;
  }

  TrainingSummary {
    total_hours: week.week.total_hours.unwrap_or(0.0),
    total_tss: week.week.total_tss.unwrap_or(0.0),
    total_distance_km: week.week.total_distance_km.unwrap_or(0.0),
    by_type_minutes: minutes_by_type(&week.activities),
    count_by_type,
  }
}

/// ---------------------------------------------------------------------------
/// MET Estimate
/// ---------------------------------------------------------------------------

/// Metabolic equivalents per activity type. Unlisted types burn nothing.
pub fn met_for(activity_type: &str) -> f64 {
  match activity_type {
    "Ride" => 8.0,
    "Run" => 9.0,
    "Swim" => 8.0,
    "Workout" | "WeightTraining" => 3.5,
    _ => 0.0,
  }
}

/// Energy estimate for the planned week. `None` without a positive body weight.
pub fn estimate_next_week(next: &TrainingWeek, weight_kg: Option<f64>) -> Option<NextWeekEstimate> {
  let weight = weight_kg.filter(|w| *w > 0.0)?;
  let planned = &next.planned_activities;
  let by_type_minutes = minutes_by_type(planned);

  let mut kcal_by_type = BTreeMap::new();
  let mut total_kcal = 0.0;
  for (activity_type, minutes) in &by_type_minutes {
    let kcal = met_for(activity_type) * weight * (minutes / 60.0);
    if kcal > 0.0 {
      kcal_by_type.insert(activity_type.clone(), kcal.round() as i64);
      total_kcal += kcal;
    }
  }

  let estimated_daily_kcal = if planned.is_empty() {
    0
  } else {
    (total_kcal / 7.0).round() as i64
  };

  Some(NextWeekEstimate {
    planned_count: planned.len(),
    by_type_minutes,
    estimated_training_kcal: total_kcal.round() as i64,
    estimated_daily_kcal,
    kcal_by_type,
  })
}

/// ---------------------------------------------------------------------------
/// Merger
/// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct TrainingMerger;

impl TrainingMerger {
  /// Join the current week's training with the nutrition summary. The next-week
  /// estimate uses the current week's body weight.
  pub fn merge(
    current: Option<&TrainingWeek>,
    next: Option<&TrainingWeek>,
    nutrition: Option<NutritionSummary>,
  ) -> Result<MergedReport, MergeError> {
    let current = current.ok_or_else(|| MergeError::NoCurrentWeek("the provided inputs".to_string()))?;
    let nutrition = nutrition.ok_or(MergeError::NoNutrition)?;

    let next_week = next.and_then(|week| estimate_next_week(week, current.weight_kg()));

    Ok(MergedReport {
      period: Period {
        start: current.start(),
        end: current.end(),
      },
      training: summarize_training(current),
      nutrition,
      next_week,
      critique: Vec::new(),
      critique_manual: true,
      critique_note: CRITIQUE_NOTE.to_string(),
    })
  }
}
