pub mod diary;
pub mod report;
pub mod training;

pub use diary::{DayTotals, DiaryDay, DiaryPage, ExerciseItem, MealCategory, MealItem, Meals};
pub use report::{
  MergedReport, NextWeekEstimate, NutritionFigures, NutritionSummary, Period, TrainingSummary,
};
pub use training::{ActivityRecord, TrainingWeek, WeekMetrics, WeekTotals};
