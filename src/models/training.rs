use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weekly training report as persisted by the training-log exporter.
/// Field names follow the exporter's file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingWeek {
  #[serde(rename = "semana")]
  pub week: WeekTotals,

  #[serde(rename = "metricas", default)]
  pub metrics: WeekMetrics,

  /// Completed activities
  #[serde(rename = "atividades", default)]
  pub activities: Vec<ActivityRecord>,

  /// Planned activities (populated on future weeks)
  #[serde(rename = "treinos_planejados", default)]
  pub planned_activities: Vec<ActivityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekTotals {
  #[serde(rename = "inicio")]
  pub start: NaiveDate,
  #[serde(rename = "fim")]
  pub end: NaiveDate,
  #[serde(rename = "tempo_total_horas", default)]
  pub total_hours: Option<f64>,
  #[serde(rename = "carga_total_tss", default)]
  pub total_tss: Option<f64>,
  #[serde(rename = "distancia_total_km", default)]
  pub total_distance_km: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekMetrics {
  #[serde(rename = "peso_atual", default)]
  pub current_weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
  #[serde(rename = "type", default)]
  pub activity_type: Option<String>,
  #[serde(rename = "moving_time_min", default)]
  pub moving_time_minutes: Option<f64>,
}

impl ActivityRecord {
  pub fn type_or_unknown(&self) -> &str {
    self
      .activity_type
      .as_deref()
      .filter(|t| !t.is_empty())
      .unwrap_or("Unknown")
  }

  pub fn minutes(&self) -> f64 {
    self.moving_time_minutes.unwrap_or(0.0)
  }
}

impl TrainingWeek {
  pub fn start(&self) -> NaiveDate {
    self.week.start
  }

  pub fn end(&self) -> NaiveDate {
    self.week.end
  }

  /// Body weight, only when positive
  pub fn weight_kg(&self) -> Option<f64> {
    self.metrics.current_weight_kg.filter(|w| *w > 0.0)
  }
}
