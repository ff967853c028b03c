use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Meal Categories
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
  Breakfast,
  Lunch,
  Dinner,
  Snacks,
}

impl MealCategory {
  pub const ALL: [MealCategory; 4] = [
    MealCategory::Breakfast,
    MealCategory::Lunch,
    MealCategory::Dinner,
    MealCategory::Snacks,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      MealCategory::Breakfast => "breakfast",
      MealCategory::Lunch => "lunch",
      MealCategory::Dinner => "dinner",
      MealCategory::Snacks => "snacks",
    }
  }
}

/// ---------------------------------------------------------------------------
/// Diary Entries
/// ---------------------------------------------------------------------------

/// One food row from the diary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
  pub name: String,
  pub calories: f64,
  pub carbs: f64,
  pub fat: f64,
  pub protein: f64,
  pub sodium: f64,
  pub sugar: f64,
}

impl MealItem {
  /// Decorative rows render with all macros empty
  pub fn has_nutrition(&self) -> bool {
    self.calories > 0.0 || self.protein > 0.0 || self.carbs > 0.0
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseItem {
  pub name: String,
  pub calories_burned: f64,
}

/// Fixed set of meal buckets, serialized as `{breakfast, lunch, dinner, snacks}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meals {
  #[serde(default)]
  pub breakfast: Vec<MealItem>,
  #[serde(default)]
  pub lunch: Vec<MealItem>,
  #[serde(default)]
  pub dinner: Vec<MealItem>,
  #[serde(default)]
  pub snacks: Vec<MealItem>,
}

impl Meals {
  pub fn get(&self, category: MealCategory) -> &[MealItem] {
    match category {
      MealCategory::Breakfast => &self.breakfast,
      MealCategory::Lunch => &self.lunch,
      MealCategory::Dinner => &self.dinner,
      MealCategory::Snacks => &self.snacks,
    }
  }

  pub fn get_mut(&mut self, category: MealCategory) -> &mut Vec<MealItem> {
    match category {
      MealCategory::Breakfast => &mut self.breakfast,
      MealCategory::Lunch => &mut self.lunch,
      MealCategory::Dinner => &mut self.dinner,
      MealCategory::Snacks => &mut self.snacks,
    }
  }

  /// Items across all categories in breakfast, lunch, dinner, snacks order
  pub fn iter_all(&self) -> impl Iterator<Item = (MealCategory, &MealItem)> {
    MealCategory::ALL
      .into_iter()
      .flat_map(move |category| self.get(category).iter().map(move |item| (category, item)))
  }

  pub fn item_count(&self) -> usize {
    self.breakfast.len() + self.lunch.len() + self.dinner.len() + self.snacks.len()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
  #[serde(default)]
  pub calories: f64,
  #[serde(default)]
  pub carbs: f64,
  #[serde(default)]
  pub fat: f64,
  #[serde(default)]
  pub protein: f64,
  #[serde(default)]
  pub sodium: f64,
  #[serde(default)]
  pub sugar: f64,
  #[serde(default)]
  pub calories_burned: f64,
}

impl DayTotals {
  /// Sum nutrition fields over every retained item. Calories burned is left at zero.
  pub fn from_meals(meals: &Meals) -> Self {
    meals.iter_all().fold(Self::default(), |mut acc, (_, item)| {
      acc.calories += item.calories;
      acc.carbs += item.carbs;
      acc.fat += item.fat;
      acc.protein += item.protein;
      acc.sodium += item.sodium;
      acc.sugar += item.sugar;
      acc
    })
  }
}

/// ---------------------------------------------------------------------------
/// Diary Day
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryDay {
  pub date: NaiveDate,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub error: Option<String>,
  #[serde(default)]
  pub meals: Meals,
  #[serde(default)]
  pub exercise: Vec<ExerciseItem>,
  #[serde(default)]
  pub totals: DayTotals,
}

impl DiaryDay {
  /// Placeholder for a date whose extraction failed
  pub fn failed(date: NaiveDate, error: impl Into<String>) -> Self {
    Self {
      date,
      error: Some(error.into()),
      meals: Meals::default(),
      exercise: Vec::new(),
      totals: DayTotals::default(),
    }
  }

  pub fn has_data(&self) -> bool {
    self.totals.calories > 0.0
  }
}

/// Extractor output before the caller stamps the date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiaryPage {
  pub meals: Meals,
  pub exercise: Vec<ExerciseItem>,
  pub totals: DayTotals,
}

impl DiaryPage {
  pub fn into_day(self, date: NaiveDate) -> DiaryDay {
    DiaryDay {
      date,
      error: None,
      meals: self.meals,
      exercise: self.exercise,
      totals: self.totals,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(name: &str, calories: f64, protein: f64) -> MealItem {
    MealItem {
      name: name.to_string(),
      calories,
      carbs: 10.0,
      fat: 1.0,
      protein,
      sodium: 5.0,
      sugar: 2.0,
    }
  }

  #[test]
  fn test_totals_sum_every_category() {
    let mut meals = Meals::default();
    meals.breakfast.push(item("Oats", 300.0, 10.0));
    meals.dinner.push(item("Rice", 200.0, 4.0));
    meals.snacks.push(item("Apple", 95.0, 0.5));

    let totals = DayTotals::from_meals(&meals);
    assert_eq!(totals.calories, 595.0);
    assert_eq!(totals.protein, 14.5);
    assert_eq!(totals.carbs, 30.0);
    assert_eq!(totals.calories_burned, 0.0);
  }

  #[test]
  fn test_failed_day_is_zeroed() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let day = DiaryDay::failed(date, "navigation timeout");

    assert_eq!(day.error.as_deref(), Some("navigation timeout"));
    assert_eq!(day.meals.item_count(), 0);
    assert_eq!(day.totals, DayTotals::default());
    assert!(!day.has_data());
  }

  #[test]
  fn test_serialized_shape_uses_camel_case_totals() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let day = DiaryDay::failed(date, "boom");
    let json = serde_json::to_value(&day).unwrap();

    assert_eq!(json["date"], "2024-01-02");
    assert!(json["meals"]["breakfast"].as_array().unwrap().is_empty());
    assert!(json["totals"].get("caloriesBurned").is_some());
  }

  #[test]
  fn test_iter_all_keeps_category_order() {
    let mut meals = Meals::default();
    meals.snacks.push(item("Chips", 150.0, 2.0));
    meals.breakfast.push(item("Eggs", 140.0, 12.0));

    let order: Vec<MealCategory> = meals.iter_all().map(|(c, _)| c).collect();
    assert_eq!(order, vec![MealCategory::Breakfast, MealCategory::Snacks]);
  }
}
