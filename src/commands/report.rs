use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregate::ReportAggregator;
use crate::cli::ReportArgs;
use crate::commands::AppError;
use crate::merge::{
  list_training_reports, load_training_week, select_current, select_next, MergeError, TrainingMerger,
};
use crate::models::MergedReport;
use crate::output::{latest_diary_file, read_diary_json, write_merged_report, ReportOutputs};

/// Resolve inputs, merge, and write the report pair. Explicit paths win over discovery.
pub fn run(args: &ReportArgs) -> Result<(MergedReport, ReportOutputs), AppError> {
  let reports = list_training_reports(&args.training_dir)?;

  let current_path = match &args.current {
    Some(path) => path.clone(),
    None => select_current(&reports)
      .map(|r| r.path.clone())
      .ok_or_else(|| MergeError::NoCurrentWeek(args.training_dir.display().to_string()))?,
  };
  let current = load_training_week(&current_path)?;
  info!("Current week: {}", current_path.display());

  let next_path: Option<PathBuf> = match &args.next {
    Some(path) => Some(path.clone()),
    None => select_next(&reports, current.end()).map(|r| r.path.clone()),
  };
  let next = match &next_path {
    Some(path) => {
      info!("Next week: {}", path.display());
      Some(load_training_week(path)?)
    }
    None => {
      warn!("no next-week training report, skipping the planned estimate");
      None
    }
  };

  let diary_path = match &args.diary {
    Some(path) => Some(path.clone()),
    None => latest_diary_file(&args.diary_dir)?,
  };
  let nutrition = match &diary_path {
    Some(path) => {
      info!("Diary: {}", path.display());
      Some(ReportAggregator::summarize(&read_diary_json(path)?))
    }
    None => None,
  };

  let report = TrainingMerger::merge(Some(&current), next.as_ref(), nutrition)?;

  let outputs = ReportOutputs::in_dir(&args.out, &report);
  write_merged_report(&outputs, &report)?;
  info!("Report saved: {}", outputs.json.display());
  info!("Report saved: {}", outputs.markdown.display());

  Ok((report, outputs))
}
