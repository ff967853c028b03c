use chrono::NaiveDate;
use std::env;
use url::Url;

use crate::walker::DateRange;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://www.myfitnesspal.com";
pub const DEFAULT_DEBUG_PORT: u16 = 9223;
pub const DEFAULT_DAYS: u32 = 7;

pub const DIARY_DIR: &str = "Relatorios_MFP";
pub const TRAINING_DIR: &str = "Relatorios_Intervals";
pub const REPORT_DIR: &str = "Relatorios_Nutri";

/// Value left in a fresh `.env` template
const PLACEHOLDER: &str = "REPLACE_ME";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid value for {key}: {value}")]
  InvalidValue { key: String, value: String },

  #[error("Invalid base URL {0}")]
  InvalidUrl(String),

  #[error("Invalid date range: {0}")]
  InvalidRange(String),
}

/// ---------------------------------------------------------------------------
/// Diary Configuration
/// ---------------------------------------------------------------------------

/// Values given on the command line. Anything set here wins over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub username: Option<String>,
  pub password: Option<String>,
  pub locale: Option<String>,
  pub port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct DiaryConfig {
  pub username: String,
  /// Only needed when the diary sits behind a password gate
  pub password: Option<String>,
  /// Locale path segment, e.g. `pt`. Empty means none.
  pub locale: String,
  pub base_url: String,
  pub debug_port: u16,
}

/// Trimmed, non-empty, non-placeholder value
fn env_value(key: &str) -> Option<String> {
  env::var(key).ok().and_then(usable)
}

fn usable(value: String) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty() && trimmed != PLACEHOLDER).then(|| trimmed.to_string())
}

impl DiaryConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::load(ConfigOverrides::default())
  }

  pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
    let username = overrides
      .username
      .and_then(usable)
      .or_else(|| env_value("MFP_USERNAME"))
      .ok_or_else(|| ConfigError::MissingConfig("MFP_USERNAME".into()))?;

    let debug_port = match overrides.port {
      Some(port) => port,
      None => match env_value("MFP_DEBUG_PORT") {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
          key: "MFP_DEBUG_PORT".into(),
          value: raw,
        })?,
        None => DEFAULT_DEBUG_PORT,
      },
    };

    Ok(Self {
      username,
      password: overrides
        .password
        .and_then(usable)
        .or_else(|| env_value("MFP_DIARY_PASSWORD")),
      locale: overrides
        .locale
        .or_else(|| env_value("MFP_LOCALE"))
        .map(|l| l.trim().trim_matches('/').to_string())
        .unwrap_or_default(),
      base_url: env_value("MFP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
      debug_port,
    })
  }

  /// DevTools HTTP endpoint of the local browser
  pub fn devtools_endpoint(&self) -> String {
    format!("http://127.0.0.1:{}", self.debug_port)
  }

  /// Host name used to recognise a tab already on the site
  pub fn site_host(&self) -> String {
    Url::parse(&self.base_url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.base_url.clone())
  }

  pub fn diary_urls(&self) -> Result<DiaryUrls, ConfigError> {
    DiaryUrls::new(&self.base_url, &self.locale, &self.username)
  }
}

/// ---------------------------------------------------------------------------
/// Diary URLs
/// ---------------------------------------------------------------------------

/// `base/<locale>/food/diary/<username>?date=<ISO-date>`
#[derive(Debug, Clone)]
pub struct DiaryUrls {
  diary: Url,
}

impl DiaryUrls {
  pub fn new(base: &str, locale: &str, username: &str) -> Result<Self, ConfigError> {
    let mut diary = Url::parse(base).map_err(|e| ConfigError::InvalidUrl(format!("{base}: {e}")))?;

    {
      let mut segments = diary
        .path_segments_mut()
        .map_err(|_| ConfigError::InvalidUrl(base.to_string()))?;
      segments.pop_if_empty();
      if !locale.is_empty() {
        segments.push(locale);
      }
      segments.extend(["food", "diary", username]);
    }

    Ok(Self { diary })
  }

  pub fn for_date(&self, date: NaiveDate) -> String {
    let mut url = self.diary.clone();
    url.set_query(Some(&format!("date={}", date.format("%Y-%m-%d"))));
    url.to_string()
  }
}

/// ---------------------------------------------------------------------------
/// Date Range Resolution
/// ---------------------------------------------------------------------------

/// Explicit bounds win; otherwise `days` (default 7) trailing and including `end`,
/// which defaults to today.
pub fn resolve_range(
  days: Option<u32>,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
  today: NaiveDate,
) -> Result<DateRange, ConfigError> {
  let end = end.unwrap_or(today);

  if let Some(start) = start {
    return DateRange::new(start, end)
      .ok_or_else(|| ConfigError::InvalidRange(format!("start {start} is after end {end}")));
  }

  let days = days.unwrap_or(DEFAULT_DAYS);
  DateRange::trailing(end, days).ok_or_else(|| {
    ConfigError::InvalidRange(format!("{days} day(s) ending {end} is not a valid range"))
  })
}
