//! File writers and readers for diary captures and merged reports
//!
//! Diary JSON and CSV are written with a UTF-8 byte order mark so spreadsheet
//! tools detect the encoding. Every reader strips a leading BOM.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::models::{DiaryDay, MergedReport};

pub const BOM: &str = "\u{FEFF}";

const DIARY_PREFIX: &str = "mfp_diary_";
const CSV_HEADER: &str = "date,meal,name,calories,carbs,fat,protein,sodium,sugar";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid JSON in {path}: {source}")]
  Json {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Serialization failed: {0}")]
  Serialize(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
  move |source| OutputError::Io {
    path: path.display().to_string(),
    source,
  }
}

/// ---------------------------------------------------------------------------
/// Generic Helpers
/// ---------------------------------------------------------------------------

pub fn strip_bom(text: &str) -> &str {
  text.strip_prefix(BOM).unwrap_or(text)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
  let raw = std::fs::read_to_string(path).map_err(io_error(path))?;
  serde_json::from_str(strip_bom(&raw)).map_err(|source| OutputError::Json {
    path: path.display().to_string(),
    source,
  })
}

/// Write `body`, creating parent directories
pub fn write_text(path: &Path, body: &str, with_bom: bool) -> Result<(), OutputError> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).map_err(io_error(parent))?;
  }

  let contents = if with_bom {
    format!("{BOM}{body}")
  } else {
    body.to_string()
  };
  std::fs::write(path, contents).map_err(io_error(path))
}

/// ---------------------------------------------------------------------------
/// Diary Capture
/// ---------------------------------------------------------------------------

/// `mfp_diary_<YYYY-MM-DDTHH-MM-SS>`
pub fn diary_file_stem(timestamp: NaiveDateTime) -> String {
  format!("{}{}", DIARY_PREFIX, timestamp.format("%Y-%m-%dT%H-%M-%S"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiaryOutputs {
  pub json: PathBuf,
  pub csv: PathBuf,
}

impl DiaryOutputs {
  pub fn in_dir(dir: &Path, timestamp: NaiveDateTime) -> Self {
    let stem = diary_file_stem(timestamp);
    Self {
      json: dir.join(format!("{stem}.json")),
      csv: dir.join(format!("{stem}.csv")),
    }
  }
}

pub fn write_diary_json(path: &Path, days: &[DiaryDay]) -> Result<(), OutputError> {
  let body = serde_json::to_string_pretty(days)?;
  write_text(path, &body, true)
}

pub fn read_diary_json(path: &Path) -> Result<Vec<DiaryDay>, OutputError> {
  read_json(path)
}

fn csv_quote(field: &str) -> String {
  format!("\"{}\"", field.replace('"', "\"\""))
}

/// One row per retained food item, meals in fixed order. Failed days add no rows.
pub fn render_diary_csv(days: &[DiaryDay]) -> String {
  let mut lines = vec![CSV_HEADER.to_string()];

  for day in days {
    for (meal, item) in day.meals.iter_all() {
      lines.push(format!(
        "{},{},{},{},{},{},{},{},{}",
        day.date,
        meal.as_str(),
        csv_quote(&item.name),
        item.calories,
        item.carbs,
        item.fat,
        item.protein,
        item.sodium,
        item.sugar
      ));
    }
  }

  lines.join("\n")
}

pub fn write_diary_csv(path: &Path, days: &[DiaryDay]) -> Result<(), OutputError> {
  write_text(path, &render_diary_csv(days), true)
}

/// Most recent `mfp_diary_*.json` in `dir` by name
pub fn latest_diary_file(dir: &Path) -> Result<Option<PathBuf>, OutputError> {
  if !dir.exists() {
    return Ok(None);
  }

  let mut latest: Option<(String, PathBuf)> = None;
  for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
    let entry = entry.map_err(io_error(dir))?;
    let Some(name) = entry.file_name().to_str().map(String::from) else {
      continue;
    };
    if !(name.starts_with(DIARY_PREFIX) && name.ends_with(".json")) {
      continue;
    }
    if latest.as_ref().map_or(true, |(best, _)| name > *best) {
      latest = Some((name, entry.path()));
    }
  }

  Ok(latest.map(|(_, path)| path))
}

/// ---------------------------------------------------------------------------
/// Merged Report
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutputs {
  pub json: PathBuf,
  pub markdown: PathBuf,
}

impl ReportOutputs {
  pub fn in_dir(dir: &Path, report: &MergedReport) -> Self {
    let stem = format!("nutri_report_{}_{}", report.period.start, report.period.end);
    Self {
      json: dir.join(format!("{stem}.json")),
      markdown: dir.join(format!("{stem}.md")),
    }
  }
}

pub fn write_merged_report(outputs: &ReportOutputs, report: &MergedReport) -> Result<(), OutputError> {
  write_text(&outputs.json, &serde_json::to_string_pretty(report)?, false)?;
  write_text(&outputs.markdown, &render_report_markdown(report), false)
}

pub fn render_report_markdown(report: &MergedReport) -> String {
  let mut md = String::new();
  let training = &report.training;
  let nutrition = &report.nutrition;
  let avg = &nutrition.averages;

  // Writing to a String cannot fail
  let _ = writeln!(md, "# Nutrition Report ({} to {})", report.period.start, report.period.end);
  let _ = writeln!(md);
  let _ = writeln!(md, "## Executed Week Summary");
  let _ = writeln!(md, "- Training: {} h, {} TSS", training.total_hours, training.total_tss);
  let _ = writeln!(md, "- Total distance: {} km", training.total_distance_km);
  let _ = writeln!(
    md,
    "- Diary: {}/{} days with data",
    nutrition.days_with_data, nutrition.days_total
  );
  let _ = writeln!(md, "- Average calories: {} kcal", avg.calories);
  let _ = writeln!(md, "- Average protein: {} g", avg.protein);
  let _ = writeln!(md, "- Average carbs: {} g", avg.carbs);
  let _ = writeln!(md, "- Average fat: {} g", avg.fat);
  if avg.burned > 0 {
    let _ = writeln!(md, "- Exercise calories (diary): -{} kcal", avg.burned);
    let _ = writeln!(md, "- Net calories: {} kcal", nutrition.net_average);
  }
  let _ = writeln!(md);

  let _ = writeln!(md, "## Critique");
  if report.critique.is_empty() {
    let _ = writeln!(md, "- (to be filled in)");
  }
  for line in &report.critique {
    let _ = writeln!(md, "- {line}");
  }
  let _ = writeln!(md);

  let _ = writeln!(md, "## Supplement Timing");
  let _ = writeln!(md, "- (to be filled in)");
  let _ = writeln!(md);

  let _ = writeln!(md, "## Next Week (Planned)");
  match &report.next_week {
    Some(next) => {
      let _ = writeln!(md, "- Planned sessions: {}", next.planned_count);
      let _ = writeln!(
        md,
        "- Estimated training expenditure: {} kcal (average {} kcal/day)",
        next.estimated_training_kcal, next.estimated_daily_kcal
      );
    }
    None => {
      let _ = writeln!(md, "- No planning data for next week.");
    }
  }
  let _ = writeln!(md);

  let _ = writeln!(md, "## Notes");
  let _ = write!(md, "- Calorie estimates are MET based (approximate).");

  md
}
