use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigOverrides, DIARY_DIR, REPORT_DIR, TRAINING_DIR};

/// Command line for the `nutri-log` binary
#[derive(Debug, Parser)]
#[command(name = "nutri-log", version, about = "Nutrition diary capture and training merge")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Debug logging
  #[arg(short, long, global = true)]
  pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Capture diary days from the browser session
  Scrape(ScrapeArgs),
  /// Merge the latest diary capture with weekly training reports
  Report(ReportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
  /// Diary owner (overrides MFP_USERNAME)
  #[arg(long)]
  pub username: Option<String>,

  /// Diary password (overrides MFP_DIARY_PASSWORD)
  #[arg(long)]
  pub password: Option<String>,

  /// Number of days ending today (or on --end)
  #[arg(long, conflicts_with = "start")]
  pub days: Option<u32>,

  /// First date, YYYY-MM-DD
  #[arg(long)]
  pub start: Option<NaiveDate>,

  /// Last date, YYYY-MM-DD (default: today)
  #[arg(long)]
  pub end: Option<NaiveDate>,

  /// Locale path segment, e.g. `pt`
  #[arg(long)]
  pub locale: Option<String>,

  /// Chrome remote debugging port
  #[arg(long)]
  pub port: Option<u16>,

  /// Output directory
  #[arg(long, default_value = DIARY_DIR)]
  pub out: PathBuf,

  /// Close the browser when done
  #[arg(long)]
  pub close: bool,

  /// Skip the exercise table
  #[arg(long)]
  pub no_exercise: bool,
}

impl ScrapeArgs {
  pub fn overrides(&self) -> ConfigOverrides {
    ConfigOverrides {
      username: self.username.clone(),
      password: self.password.clone(),
      locale: self.locale.clone(),
      port: self.port,
    }
  }
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
  /// Directory holding report_<start>_<end>.json files
  #[arg(long, default_value = TRAINING_DIR)]
  pub training_dir: PathBuf,

  /// Current-week training report (default: latest in --training-dir)
  #[arg(long)]
  pub current: Option<PathBuf>,

  /// Next-week training report (default: first one after the current week)
  #[arg(long)]
  pub next: Option<PathBuf>,

  /// Diary capture JSON (default: latest in the diary directory)
  #[arg(long)]
  pub diary: Option<PathBuf>,

  /// Directory searched for the latest diary capture
  #[arg(long, default_value = DIARY_DIR)]
  pub diary_dir: PathBuf,

  /// Output directory
  #[arg(long, default_value = REPORT_DIR)]
  pub out: PathBuf,
}
