pub mod aggregate;
pub mod challenge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod extract;
pub mod locale;
pub mod logging;
pub mod merge;
pub mod models;
pub mod output;
pub mod session;
pub mod walker;

#[cfg(test)]
pub mod test_utils;

use clap::Parser;

use cli::{Cli, Commands};
use commands::AppError;

pub async fn run() -> Result<(), AppError> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();
  logging::init_tracing(cli.verbose).map_err(AppError::Logging)?;

  match &cli.command {
    Commands::Scrape(args) => commands::scrape::run(args).await,
    Commands::Report(args) => commands::report::run(args).map(|_| ()),
  }
}
