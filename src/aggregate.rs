//! Period statistics over a run of diary days

use tracing::info;

use crate::models::{DiaryDay, NutritionFigures, NutritionSummary};

/// Running sums over days with data
#[derive(Debug, Default, Clone, Copy)]
struct Sums {
  calories: f64,
  protein: f64,
  carbs: f64,
  fat: f64,
  burned: f64,
}

impl Sums {
  fn add(mut self, day: &DiaryDay) -> Self {
    self.calories += day.totals.calories;
    self.protein += day.totals.protein;
    self.carbs += day.totals.carbs;
    self.fat += day.totals.fat;
    self.burned += day.totals.calories_burned;
    self
  }

  fn rounded(&self, divisor: f64) -> NutritionFigures {
    let per = |v: f64| (v / divisor).round() as i64;
    NutritionFigures {
      calories: per(self.calories),
      protein: per(self.protein),
      carbs: per(self.carbs),
      fat: per(self.fat),
      burned: per(self.burned),
    }
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportAggregator;

impl ReportAggregator {
  /// Sums and per-day averages over days with calories > 0. Days without data
  /// (including failed days) count toward `days_total` only.
  pub fn summarize(days: &[DiaryDay]) -> NutritionSummary {
    let with_data: Vec<&DiaryDay> = days.iter().filter(|d| d.has_data()).collect();
    let sums = with_data.iter().fold(Sums::default(), |acc, day| acc.add(day));

    let count = with_data.len();
    let averages = if count > 0 {
      sums.rounded(count as f64)
    } else {
      NutritionFigures::default()
    };

    NutritionSummary {
      days_total: days.len(),
      days_with_data: count,
      totals: sums.rounded(1.0),
      net_average: averages.calories - averages.burned,
      averages,
    }
  }

  /// End-of-run summary lines
  pub fn log_summary(summary: &NutritionSummary) {
    info!(
      "Days with data: {}/{}",
      summary.days_with_data, summary.days_total
    );

    if summary.days_with_data == 0 {
      return;
    }

    let avg = &summary.averages;
    info!(
      "Daily average: {} kcal, P {}g, C {}g, F {}g",
      avg.calories, avg.protein, avg.carbs, avg.fat
    );
    if avg.burned > 0 {
      info!("Exercise average: -{} kcal, net {} kcal", avg.burned, summary.net_average);
    }
  }
}
