use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ---------------------------------------------------------------------------
/// Nutrition Summary (period aggregate of diary days)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
  pub days_total: usize,
  pub days_with_data: usize,
  pub totals: NutritionFigures,
  pub averages: NutritionFigures,
  /// Average calories minus average calories burned
  pub net_average: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFigures {
  pub calories: i64,
  pub protein: i64,
  pub carbs: i64,
  pub fat: i64,
  pub burned: i64,
}

/// ---------------------------------------------------------------------------
/// Training Summary (completed week)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
  pub total_hours: f64,
  pub total_tss: f64,
  pub total_distance_km: f64,
  pub by_type_minutes: BTreeMap<String, f64>,
  pub count_by_type: BTreeMap<String, u32>,
}

/// ---------------------------------------------------------------------------
/// Next Week Estimate (planned training, MET based)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextWeekEstimate {
  pub planned_count: usize,
  pub by_type_minutes: BTreeMap<String, f64>,
  pub estimated_training_kcal: i64,
  pub estimated_daily_kcal: i64,
  pub kcal_by_type: BTreeMap<String, i64>,
}

/// ---------------------------------------------------------------------------
/// Merged Report
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedReport {
  pub period: Period,
  pub training: TrainingSummary,
  pub nutrition: NutritionSummary,
  #[serde(rename = "nextWeek")]
  pub next_week: Option<NextWeekEstimate>,
  /// Filled in manually downstream
  pub critique: Vec<String>,
  pub critique_manual: bool,
  pub critique_note: String,
}
