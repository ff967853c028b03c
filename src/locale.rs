//! Locale keyword tables for diary row classification
//!
//! Every keyword is stored lower-case and diacritic-free, and is matched against
//! row text folded the same way. Adding a locale means adding keywords here.

use crate::models::MealCategory;

/// ---------------------------------------------------------------------------
/// Keyword Tables
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocaleKeywords {
  /// Header keywords per category, checked in order
  pub categories: Vec<(MealCategory, Vec<&'static str>)>,
  /// Rows containing any of these are never food items
  pub noise: Vec<&'static str>,
  /// Exercise-table labels that are not activities
  pub exercise_noise: Vec<&'static str>,
}

impl Default for LocaleKeywords {
  fn default() -> Self {
    Self {
      categories: vec![
        (MealCategory::Breakfast, vec!["breakfast", "cafe da manha", "cafe"]),
        (MealCategory::Lunch, vec!["lunch", "almoco"]),
        (MealCategory::Dinner, vec!["dinner", "jantar"]),
        (MealCategory::Snacks, vec!["snack", "lanche"]),
      ],
      noise: vec![
        "total",
        "totais",
        "add food",
        "adicionar alimento",
        "goal",
        "remaining",
        "restante",
        "quick tools",
        "your ip",
        "ray id",
      ],
      exercise_noise: vec!["total", "add exercise", "cardiovascular"],
    }
  }
}

impl LocaleKeywords {
  /// First category whose keyword occurs in the folded text
  pub fn category_of(&self, folded: &str) -> Option<MealCategory> {
    self
      .categories
      .iter()
      .find(|(_, words)| words.iter().any(|w| folded.contains(w)))
      .map(|(category, _)| *category)
  }

  pub fn is_noise(&self, folded: &str) -> bool {
    self.noise.iter().any(|w| folded.contains(w))
  }

  pub fn is_exercise_noise(&self, folded: &str) -> bool {
    self.exercise_noise.iter().any(|w| folded.contains(w))
  }
}

/// ---------------------------------------------------------------------------
/// Text Folding
/// ---------------------------------------------------------------------------

/// Lower-case and strip diacritics, so "Café da Manhã" folds to "cafe da manha".
/// Combining marks (decomposed input) are dropped.
pub fn fold(text: &str) -> String {
  text
    .chars()
    .flat_map(char::to_lowercase)
    .filter(|c| !is_combining_mark(*c))
    .map(base_letter)
    .collect()
}

fn is_combining_mark(c: char) -> bool {
  ('\u{0300}'..='\u{036F}').contains(&c)
}

fn base_letter(c: char) -> char {
  match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
    'ç' => 'c',
    'è' | 'é' | 'ê' | 'ë' => 'e',
    'ì' | 'í' | 'î' | 'ï' => 'i',
    'ñ' => 'n',
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
    'ù' | 'ú' | 'û' | 'ü' => 'u',
    'ý' | 'ÿ' => 'y',
    _ => c,
  }
}

/// Collapse runs of whitespace (including non-breaking spaces) and trim
pub fn normalize_ws(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}
