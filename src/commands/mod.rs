pub mod report;
pub mod scrape;

use crate::challenge::ChallengeError;
use crate::config::ConfigError;
use crate::merge::MergeError;
use crate::output::OutputError;
use crate::session::SessionError;
use crate::walker::WalkError;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Anything that ends a command. The binary prints it and exits with status 1.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Session(#[from] SessionError),

  #[error("Diary access failed: {0}")]
  Challenge(#[from] ChallengeError),

  #[error(transparent)]
  Walk(#[from] WalkError),

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Output(#[from] OutputError),

  #[error("Logging setup failed: {0}")]
  Logging(String),
}
