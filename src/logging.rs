use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable when set
pub const LOG_ENV: &str = "NUTRI_LOG";

pub fn init_tracing(verbose: bool) -> Result<(), String> {
  let level = if verbose { "debug" } else { "info" };

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init()
    .map_err(|e| format!("failed to initialize tracing subscriber: {e}"))
}
