//! Diary page extraction
//!
//! Turns one rendered diary page into a `DiaryPage`. The HTML is first reduced to a
//! plain table model (rows of cell text), rows are classified by a pure function,
//! and a fold over the classified rows assigns items to meals.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::locale::{fold, normalize_ws, LocaleKeywords};
use crate::models::{DayTotals, DiaryPage, ExerciseItem, MealCategory, MealItem, Meals};

/// ---------------------------------------------------------------------------
/// Selector Candidates (priority order, first match wins)
/// ---------------------------------------------------------------------------

const DIARY_TABLE_SELECTORS: &[&str] = &["#diary-table", "table.table0", ".diary-table", "table"];

const EXERCISE_TABLE_SELECTORS: &[&str] =
  &["#diary-exercise-table", "table.table1", "[id*=\"exercise\"]"];

/// Column positions of an item row
const NAME_COL: usize = 0;
const NUTRIENT_COLS: [usize; 6] = [1, 2, 3, 4, 5, 6];

/// Calories burned fallback when no exercise table is usable. English only.
const BURNED_FALLBACK_PATTERNS: &[&str] = &[r"(?i)exercise[:\s]*-?(\d+)", r"(?i)earned[:\s]*(\d+)"];

/// ---------------------------------------------------------------------------
/// Table Model
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
  /// Text content of each `<td>`
  pub cells: Vec<String>,
  /// Full text of the row (including `<th>` cells)
  pub text: String,
  /// Row carries the `meal_header` markup
  pub header_marked: bool,
}

impl TableRow {
  pub fn new(cells: &[&str]) -> Self {
    Self {
      cells: cells.iter().map(|c| c.to_string()).collect(),
      text: cells.join(" "),
      header_marked: false,
    }
  }

  pub fn marked_header(text: &str) -> Self {
    Self {
      cells: vec![text.to_string()],
      text: text.to_string(),
      header_marked: true,
    }
  }
}

/// Rendered page content handed to the extractor
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
  pub html: String,
  pub visible_text: String,
}

impl PageSnapshot {
  /// Snapshot from HTML alone, approximating visible text from the body's text nodes
  pub fn from_html(html: impl Into<String>) -> Self {
    let html = html.into();
    let document = Html::parse_document(&html);
    let visible_text = body_text(&document);
    Self { html, visible_text }
  }
}

/// ---------------------------------------------------------------------------
/// Row Classification
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RowRole {
  Header(MealCategory),
  Item(MealItem),
  Noise,
}

/// Classify one diary row. Pure: depends only on the row and the keyword tables.
///
/// A row is a header when it carries header markup, or when it names a meal
/// category and its nutrient cells hold labels instead of numbers (header rows
/// repeat the column labels). A zero-valued food row is never a header.
pub fn classify_row(row: &TableRow, keywords: &LocaleKeywords) -> RowRole {
  let folded = fold(&row.text);
  if folded.trim().is_empty() {
    return RowRole::Noise;
  }

  let category = keywords.category_of(&folded);

  if row.header_marked {
    return category.map_or(RowRole::Noise, RowRole::Header);
  }

  if keywords.is_noise(&folded) {
    return RowRole::Noise;
  }

  let item = parse_item(row);

  if let Some(category) = category {
    if !has_numeric_cells(row) {
      return RowRole::Header(category);
    }
  }

  match item {
    Some(item) if item.name.chars().count() >= 2 && item.has_nutrition() => RowRole::Item(item),
    _ => RowRole::Noise,
  }
}

fn has_numeric_cells(row: &TableRow) -> bool {
  NUTRIENT_COLS
    .iter()
    .filter_map(|col| row.cells.get(*col))
    .any(|cell| cell.chars().any(|c| c.is_ascii_digit()))
}

fn parse_item(row: &TableRow) -> Option<MealItem> {
  if row.cells.len() < 2 {
    return None;
  }

  let name = normalize_ws(row.cells.get(NAME_COL)?);
  if name.is_empty() {
    return None;
  }

  let [calories, carbs, fat, protein, sodium, sugar] = NUTRIENT_COLS.map(|col| {
    row
      .cells
      .get(col)
      .map(|cell| parse_num(cell).max(0.0))
      .unwrap_or(0.0)
  });

  Some(MealItem {
    name,
    calories,
    carbs,
    fat,
    protein,
    sodium,
    sugar,
  })
}

/// Assign item rows to the most recent header. Rows before any header land in snacks.
pub fn fold_rows(roles: impl IntoIterator<Item = RowRole>) -> Meals {
  let (meals, _) = roles.into_iter().fold(
    (Meals::default(), MealCategory::Snacks),
    |(mut meals, current), role| match role {
      RowRole::Header(category) => (meals, category),
      RowRole::Item(item) => {
        meals.get_mut(current).push(item);
        (meals, current)
      }
      RowRole::Noise => (meals, current),
    },
  );
  meals
}

/// ---------------------------------------------------------------------------
/// Numeric Parsing
/// ---------------------------------------------------------------------------

/// Parse the first line of a cell as a number. Thousands separators and any
/// characters other than digits, sign and decimal point are dropped first.
/// Anything unparsable is 0.
pub fn parse_num(text: &str) -> f64 {
  let Some(first_line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
    return 0.0;
  };

  let cleaned: String = first_line
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
    .collect();

  leading_float(&cleaned).unwrap_or(0.0)
}

/// Longest prefix of the form `-?digits(.digits)?`
fn leading_float(s: &str) -> Option<f64> {
  let bytes = s.as_bytes();
  let mut end = 0;
  if bytes.first() == Some(&b'-') {
    end = 1;
  }
  let digits_start = end;
  while end < bytes.len() && bytes[end].is_ascii_digit() {
    end += 1;
  }
  let mut has_digits = end > digits_start;
  if end < bytes.len() && bytes[end] == b'.' {
    let frac_start = end + 1;
    let mut frac_end = frac_start;
    while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
      frac_end += 1;
    }
    if frac_end > frac_start {
      has_digits = true;
      end = frac_end;
    }
  }
  if !has_digits {
    return None;
  }
  s[..end].parse().ok()
}

/// ---------------------------------------------------------------------------
/// Extractor
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DiaryExtractor {
  keywords: LocaleKeywords,
  include_exercise: bool,
}

impl Default for DiaryExtractor {
  fn default() -> Self {
    Self::new(LocaleKeywords::default(), true)
  }
}

impl DiaryExtractor {
  pub fn new(keywords: LocaleKeywords, include_exercise: bool) -> Self {
    Self {
      keywords,
      include_exercise,
    }
  }

  /// Extract meals, exercise and totals from a rendered diary page.
  /// Missing structure yields an empty page, never an error.
  pub fn extract(&self, snapshot: &PageSnapshot) -> DiaryPage {
    let document = Html::parse_document(&snapshot.html);

    let meals = match first_match(&document, DIARY_TABLE_SELECTORS) {
      Some(table) => {
        let rows = table_rows(table);
        fold_rows(rows.iter().map(|row| classify_row(row, &self.keywords)))
      }
      None => Meals::default(),
    };

    let mut totals = DayTotals::from_meals(&meals);
    let mut exercise = Vec::new();

    if self.include_exercise {
      if let Some(table) = first_match(&document, EXERCISE_TABLE_SELECTORS) {
        exercise = self.exercise_items(&table_rows(table));
      }
      totals.calories_burned = exercise.iter().map(|e| e.calories_burned).sum();

      if totals.calories_burned == 0.0 {
        totals.calories_burned = burned_from_text(&snapshot.visible_text);
      }
    }

    DiaryPage {
      meals,
      exercise,
      totals,
    }
  }

  fn exercise_items(&self, rows: &[TableRow]) -> Vec<ExerciseItem> {
    rows
      .iter()
      .filter(|row| row.cells.len() >= 2)
      .filter_map(|row| {
        let name = normalize_ws(&row.cells[0]);
        let calories_burned = parse_num(&row.cells[1]);
        let keep = !name.is_empty()
          && calories_burned > 0.0
          && !self.keywords.is_exercise_noise(&fold(&name));
        keep.then_some(ExerciseItem {
          name,
          calories_burned,
        })
      })
      .collect()
  }
}

/// First integer captured by the fallback patterns, tried in order
pub fn burned_from_text(text: &str) -> f64 {
  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  let patterns = PATTERNS.get_or_init(|| {
    BURNED_FALLBACK_PATTERNS
      .iter()
      .filter_map(|p| Regex::new(p).ok())
      .collect()
  });

  patterns
    .iter()
    .find_map(|re| re.captures(text))
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse::<u64>().ok())
    .map_or(0.0, |n| n as f64)
}

/// ---------------------------------------------------------------------------
/// HTML -> Table Model
/// ---------------------------------------------------------------------------

fn first_match<'a>(document: &'a Html, candidates: &[&str]) -> Option<ElementRef<'a>> {
  candidates
    .iter()
    .filter_map(|css| Selector::parse(css).ok())
    .find_map(|selector| document.select(&selector).next())
}

fn table_rows(table: ElementRef<'_>) -> Vec<TableRow> {
  let (Ok(tr), Ok(td), Ok(header)) = (
    Selector::parse("tr"),
    Selector::parse("td"),
    Selector::parse(".meal_header"),
  ) else {
    return Vec::new();
  };

  table
    .select(&tr)
    .map(|row| {
      let class = row.value().attr("class").unwrap_or_default();
      TableRow {
        cells: row.select(&td).map(|cell| cell.text().collect()).collect(),
        text: row.text().collect(),
        header_marked: class.contains("meal_header")
          || class.contains("bottom")
          || row.select(&header).next().is_some(),
      }
    })
    .collect()
}

fn body_text(document: &Html) -> String {
  let Ok(body) = Selector::parse("body") else {
    return String::new();
  };
  let Some(body) = document.select(&body).next() else {
    return String::new();
  };

  body
    .descendants()
    .filter_map(|node| {
      let text = node.value().as_text()?;
      let parent = node.parent().and_then(ElementRef::wrap)?;
      match parent.value().name() {
        "script" | "style" | "noscript" => None,
        _ => Some(text.to_string()),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}
