//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Scripted page and browser fakes
//! - Diary page fixtures (English and Portuguese)
//! - Mock data factories
//! - Helper assertions

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::challenge::ManualIntervention;
use crate::extract::PageSnapshot;
use crate::models::{ActivityRecord, DiaryDay, DiaryPage, TrainingWeek, WeekMetrics, WeekTotals};
use crate::session::{BrowserHandle, PageSession, SessionError};

/// ---------------------------------------------------------------------------
/// Page & Browser Fakes
/// ---------------------------------------------------------------------------

const CHALLENGE_TITLE: &str = "Just a moment...";
const CHALLENGE_HTML: &str =
  "<html><head><title>Just a moment...</title></head><body><div id=\"cf_chl_opt\"></div></body></html>";
const PASSWORD_HTML: &str =
  "<html><body><form><input type=\"password\" name=\"password\"></form></body></html>";

/// In-memory page. Serves a challenge for a number of reads, then an optional
/// password form, then the diary HTML.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
  pub diary_html: String,
  /// Remaining `content()` reads that still see the challenge
  pub challenge_polls: u32,
  /// Password that unlocks the gate, if the diary is protected
  pub gate_password: Option<String>,
  pub gate_open: bool,
  pub submitted_passwords: Vec<String>,
  pub navigations: Vec<String>,
}

impl FakePage {
  pub fn diary(html: impl Into<String>) -> Self {
    Self {
      diary_html: html.into(),
      gate_open: true,
      ..Self::default()
    }
  }

  pub fn with_challenge_polls(mut self, polls: u32) -> Self {
    self.challenge_polls = polls;
    self
  }

  pub fn with_password_gate(mut self, accepted: &str) -> Self {
    self.gate_password = Some(accepted.to_string());
    self.gate_open = false;
    self
  }

  fn challenge_active(&self) -> bool {
    self.challenge_polls > 0
  }

  fn current_html(&self) -> &str {
    if self.challenge_active() {
      CHALLENGE_HTML
    } else if !self.gate_open {
      PASSWORD_HTML
    } else {
      &self.diary_html
    }
  }
}

#[async_trait]
impl PageSession for FakePage {
  async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
    self.navigations.push(url.to_string());
    Ok(())
  }

  async fn title(&mut self) -> Result<String, SessionError> {
    if self.challenge_active() {
      Ok(CHALLENGE_TITLE.to_string())
    } else {
      Ok("Food Diary | MyFitnessPal".to_string())
    }
  }

  async fn content(&mut self) -> Result<String, SessionError> {
    let html = self.current_html().to_string();
    self.challenge_polls = self.challenge_polls.saturating_sub(1);
    Ok(html)
  }

  async fn visible_text(&mut self) -> Result<String, SessionError> {
    Ok(PageSnapshot::from_html(self.current_html()).visible_text)
  }

  async fn has_password_field(&mut self) -> Result<bool, SessionError> {
    Ok(!self.challenge_active() && !self.gate_open)
  }

  async fn submit_password(&mut self, password: &str) -> Result<(), SessionError> {
    self.submitted_passwords.push(password.to_string());
    if self.gate_password.as_deref() == Some(password) {
      self.gate_open = true;
    }
    Ok(())
  }

  async fn settle(&mut self, _duration: std::time::Duration) {}
}

/// Hands out clones of a template page and counts them
#[derive(Debug, Default)]
pub struct FakeBrowser {
  template: FakePage,
  opened: AtomicUsize,
  closed: AtomicBool,
}

impl FakeBrowser {
  pub fn new(template: FakePage) -> Self {
    Self {
      template,
      opened: AtomicUsize::new(0),
      closed: AtomicBool::new(false),
    }
  }

  pub fn pages_opened(&self) -> usize {
    self.opened.load(Ordering::SeqCst)
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
  type Page = FakePage;

  async fn open_page(&self) -> Result<FakePage, SessionError> {
    self.opened.fetch_add(1, Ordering::SeqCst);
    Ok(self.template.clone())
  }

  async fn close(&self) -> Result<(), SessionError> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(())
  }
}

/// Operator that returns immediately and counts how often it was asked
#[derive(Debug, Default)]
pub struct RecordingOperator {
  calls: AtomicUsize,
}

impl RecordingOperator {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ManualIntervention for RecordingOperator {
  async fn wait_for_operator(&self, _reason: &str) {
    self.calls.fetch_add(1, Ordering::SeqCst);
  }
}

/// ---------------------------------------------------------------------------
/// Diary Fixtures
/// ---------------------------------------------------------------------------

/// English diary: 2 breakfast items, 1 lunch item, empty dinner, 1 snack,
/// two exercises burning 450 kcal in total
pub fn sample_diary_html() -> &'static str {
  r##"<!DOCTYPE html>
<html>
<head><title>Food Diary | MyFitnessPal</title></head>
<body>
  <div id="date">Friday, January 5, 2024</div>
  <table id="diary-table" class="table0">
    <tbody>
      <tr class="meal_header">
        <td class="first alt">Breakfast</td>
        <td class="alt">Calories</td><td class="alt">Carbs</td><td class="alt">Fat</td>
        <td class="alt">Protein</td><td class="alt">Sodium</td><td class="alt">Sugar</td>
      </tr>
      <tr>
        <td class="first alt"><a href="#">Oatmeal, rolled oats, 1 cup</a></td>
        <td>300</td><td>54</td><td>5</td><td>10</td><td>0</td><td>1</td>
      </tr>
      <tr>
        <td class="first alt"><a href="#">Whole milk</a></td>
        <td>150</td><td>12</td><td>8</td><td>8</td><td>105</td><td>12</td>
      </tr>
      <tr class="bottom">
        <td class="first alt"><a href="#">Add Food</a> | <a href="#">Quick Tools</a></td>
        <td>450</td><td>66</td><td>13</td><td>18</td><td>105</td><td>13</td>
      </tr>
      <tr class="meal_header">
        <td class="first alt">Lunch</td>
        <td class="alt">Calories</td><td class="alt">Carbs</td><td class="alt">Fat</td>
        <td class="alt">Protein</td><td class="alt">Sodium</td><td class="alt">Sugar</td>
      </tr>
      <tr>
        <td class="first alt"><a href="#">Chicken salad</a></td>
        <td>1,200</td><td>40</td><td>70</td><td>95</td><td>1,450</td><td>9</td>
      </tr>
      <tr class="meal_header">
        <td class="first alt">Dinner</td>
        <td class="alt">Calories</td><td class="alt">Carbs</td><td class="alt">Fat</td>
        <td class="alt">Protein</td><td class="alt">Sodium</td><td class="alt">Sugar</td>
      </tr>
      <tr class="bottom">
        <td class="first alt"><a href="#">Add Food</a></td>
        <td></td><td></td><td></td><td></td><td></td><td></td>
      </tr>
      <tr class="meal_header">
        <td class="first alt">Snacks</td>
        <td class="alt">Calories</td><td class="alt">Carbs</td><td class="alt">Fat</td>
        <td class="alt">Protein</td><td class="alt">Sodium</td><td class="alt">Sugar</td>
      </tr>
      <tr>
        <td class="first alt"><a href="#">Apple</a></td>
        <td>95
          <span class="subtext">kcal</span></td>
        <td>25</td><td>0.3</td><td>0.5</td><td>2</td><td>19</td>
      </tr>
      <tr class="total">
        <td class="first">Totals</td>
        <td>9,999</td><td>131</td><td>83.3</td><td>113.5</td><td>1,557</td><td>41</td>
      </tr>
      <tr class="total alt">
        <td class="first">Your Daily Goal</td>
        <td>2,000</td><td>250</td><td>67</td><td>100</td><td>2,300</td><td>50</td>
      </tr>
      <tr class="total remaining">
        <td class="first">Remaining</td>
        <td>255</td><td>119</td><td>0</td><td>0</td><td>743</td><td>9</td>
      </tr>
    </tbody>
  </table>

  <table id="diary-exercise-table" class="table1">
    <tbody>
      <tr>
        <td class="first">Cardiovascular</td>
        <td>Calories Burned</td><td>Minutes</td>
      </tr>
      <tr>
        <td class="first"><a href="#">Running (jogging), 5 mph</a></td>
        <td>400</td><td>40</td>
      </tr>
      <tr>
        <td class="first"><a href="#">Walking, 3.0 mph</a></td>
        <td>50</td><td>15</td>
      </tr>
      <tr class="total">
        <td class="first">Totals</td>
        <td>450</td><td>55</td>
      </tr>
      <tr class="bottom">
        <td class="first"><a href="#">Add Exercise</a></td>
        <td></td><td></td>
      </tr>
    </tbody>
  </table>
  <script>window.dataLayer = [{"exercise": 999}];</script>
</body>
</html>"##
}

/// Portuguese diary without the English ids: one item per meal, 1925 kcal
pub fn sample_diary_html_pt() -> &'static str {
  r##"<!DOCTYPE html>
<html lang="pt">
<head><title>Diário alimentar | MyFitnessPal</title></head>
<body>
  <table class="table0">
    <tr class="meal_header"><td class="first alt">Café da Manhã</td><td>Calorias</td><td>Carboidratos</td><td>Gorduras</td><td>Proteínas</td><td>Sódio</td><td>Açúcar</td></tr>
    <tr><td class="first alt">Pão de queijo</td><td>280</td><td>34</td><td>12</td><td>7</td><td>410</td><td>1</td></tr>
    <tr class="meal_header"><td class="first alt">Almoço</td><td>Calorias</td><td>Carboidratos</td><td>Gorduras</td><td>Proteínas</td><td>Sódio</td><td>Açúcar</td></tr>
    <tr><td class="first alt">Feijoada</td><td>1200</td><td>90</td><td>60</td><td>70</td><td>2100</td><td>3</td></tr>
    <tr class="meal_header"><td class="first alt">Jantar</td><td>Calorias</td><td>Carboidratos</td><td>Gorduras</td><td>Proteínas</td><td>Sódio</td><td>Açúcar</td></tr>
    <tr><td class="first alt">Sopa de legumes</td><td>350</td><td>40</td><td>12</td><td>15</td><td>800</td><td>8</td></tr>
    <tr class="meal_header"><td class="first alt">Lanches</td><td>Calorias</td><td>Carboidratos</td><td>Gorduras</td><td>Proteínas</td><td>Sódio</td><td>Açúcar</td></tr>
    <tr><td class="first alt">Banana prata</td><td>95</td><td>24</td><td>0.3</td><td>1.2</td><td>1</td><td>14</td></tr>
    <tr class="bottom"><td class="first alt">Adicionar alimento</td><td></td><td></td><td></td><td></td><td></td><td></td></tr>
    <tr class="total"><td class="first">Totais</td><td>1925</td><td>188</td><td>84.3</td><td>93.2</td><td>3311</td><td>26</td></tr>
  </table>
</body>
</html>"##
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn date(s: &str) -> NaiveDate {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("fixture date")
}

/// A successfully captured day with the given calorie and burned totals
pub fn mock_diary_day(day: &str, calories: f64, burned: f64) -> DiaryDay {
  let mut page = DiaryPage::default();
  page.totals.calories = calories;
  page.totals.protein = calories / 20.0;
  page.totals.carbs = calories / 8.0;
  page.totals.fat = calories / 30.0;
  page.totals.calories_burned = burned;
  page.into_day(date(day))
}

pub fn activity(kind: &str, minutes: f64) -> ActivityRecord {
  ActivityRecord {
    activity_type: Some(kind.to_string()),
    moving_time_minutes: Some(minutes),
  }
}

/// Completed week with the given activities
pub fn mock_training_week(start: &str, end: &str, activities: Vec<ActivityRecord>) -> TrainingWeek {
  TrainingWeek {
    week: WeekTotals {
      start: date(start),
      end: date(end),
      total_hours: Some(6.5),
      total_tss: Some(410.0),
      total_distance_km: Some(120.4),
    },
    metrics: WeekMetrics {
      current_weight_kg: Some(70.0),
    },
    activities,
    planned_activities: Vec::new(),
  }
}

/// Future week carrying only planned activities
pub fn mock_planned_week(start: &str, end: &str, weight: Option<f64>, planned: Vec<ActivityRecord>) -> TrainingWeek {
  TrainingWeek {
    week: WeekTotals {
      start: date(start),
      end: date(end),
      total_hours: None,
      total_tss: None,
      total_distance_km: None,
    },
    metrics: WeekMetrics {
      current_weight_kg: weight,
    },
    activities: Vec::new(),
    planned_activities: planned,
  }
}

/// Write a training week as `report_<start>_<end>.json` into `dir`
pub fn write_training_report(dir: &Path, week: &TrainingWeek) -> PathBuf {
  let path = dir.join(format!("report_{}_{}.json", week.start(), week.end()));
  let body = serde_json::to_string_pretty(week).expect("serialize training week");
  std::fs::write(&path, body).expect("write training report");
  path
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_diary_fixtures_are_complete_documents() {
    for html in [sample_diary_html(), sample_diary_html_pt()] {
      assert!(html.starts_with("<!DOCTYPE html>"));
      assert!(html.trim_end().ends_with("</html>"));
    }
    assert!(sample_diary_html().contains(r##"<a href="#">Apple</a>"##));
  }

  #[tokio::test]
  async fn test_fake_page_serves_challenge_then_diary() {
    let mut page = FakePage::diary("<html><body>diary</body></html>").with_challenge_polls(1);

    assert_eq!(page.title().await.unwrap(), CHALLENGE_TITLE);
    assert!(page.content().await.unwrap().contains("cf_chl"));
    assert!(page.content().await.unwrap().contains("diary"));
  }

  #[tokio::test]
  async fn test_fake_page_gate_opens_on_accepted_password() {
    let mut page = FakePage::diary("<html></html>").with_password_gate("pw");

    assert!(page.has_password_field().await.unwrap());
    page.submit_password("nope").await.unwrap();
    assert!(page.has_password_field().await.unwrap());
    page.submit_password("pw").await.unwrap();
    assert!(!page.has_password_field().await.unwrap());
    assert_eq!(page.submitted_passwords.len(), 2);
  }

  #[tokio::test]
  async fn test_fake_browser_counts_pages() {
    let browser = FakeBrowser::new(FakePage::diary("<html></html>"));
    browser.open_page().await.unwrap();
    browser.open_page().await.unwrap();
    browser.close().await.unwrap();

    assert_eq!(browser.pages_opened(), 2);
    assert!(browser.is_closed());
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let day = mock_diary_day("2024-01-01", 2000.0, 300.0);
    assert!(day.has_data());
    assert_eq!(day.totals.calories_burned, 300.0);

    let week = mock_training_week("2024-01-01", "2024-01-07", vec![activity("Run", 45.0)]);
    assert_eq!(week.weight_kg(), Some(70.0));

    let planned = mock_planned_week("2024-01-08", "2024-01-14", None, vec![activity("Ride", 60.0)]);
    assert_eq!(planned.weight_kg(), None);
    assert_eq!(planned.planned_activities.len(), 1);
  }
}
