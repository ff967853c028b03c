//! Date range walk with per-day fault isolation
//!
//! Days run one at a time, in ascending order, against one shared page. A failing
//! day becomes an error record and the walk moves on. Only fatal preconditions
//! (missing credentials) abort the walk.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::challenge::{ChallengeError, ChallengeResolver, ManualIntervention};
use crate::config::DiaryUrls;
use crate::extract::{DiaryExtractor, PageSnapshot};
use crate::models::DiaryDay;
use crate::session::{BrowserHandle, BrowserSession, PageSession, SessionError};

/// ---------------------------------------------------------------------------
/// Date Range
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl DateRange {
  /// Inclusive range; `None` when start is after end
  pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
    (start <= end).then_some(Self { start, end })
  }

  /// Every calendar date from start to end, ascending
  pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
    let end = self.end;
    std::iter::successors(Some(self.start), |d| d.succ_opt()).take_while(move |d| *d <= end)
  }

  pub fn day_count(&self) -> usize {
    ((self.end - self.start).num_days() + 1) as usize
  }

  /// `days` dates ending on (and including) `end`. `None` for zero days or a
  /// start before the earliest representable date.
  pub fn trailing(end: NaiveDate, days: u32) -> Option<Self> {
    let span = TimeDelta::try_days(i64::from(days.checked_sub(1)?))?;
    Self::new(end.checked_sub_signed(span)?, end)
  }
}

/// ---------------------------------------------------------------------------
/// Per-Day Operation
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DayError {
  #[error(transparent)]
  Session(#[from] SessionError),

  #[error(transparent)]
  Challenge(#[from] ChallengeError),
}

impl DayError {
  pub fn is_fatal(&self) -> bool {
    matches!(self, DayError::Challenge(e) if e.is_fatal())
  }

  pub fn is_recoverable(&self) -> bool {
    match self {
      DayError::Session(e) => e.is_recoverable(),
      DayError::Challenge(ChallengeError::Session(e)) => e.is_recoverable(),
      _ => false,
    }
  }
}

#[async_trait]
pub trait DayOperation<P: PageSession>: Send + Sync {
  async fn run(&self, page: &mut P, date: NaiveDate) -> Result<DiaryDay, DayError>;
}

/// Navigate to the day's diary, clear any gate, extract
pub struct DiaryDayJob<'a> {
  pub urls: &'a DiaryUrls,
  pub resolver: &'a ChallengeResolver,
  pub extractor: &'a DiaryExtractor,
  pub operator: &'a dyn ManualIntervention,
  /// Pause after navigation before reading the page
  pub settle: Duration,
}

#[async_trait]
impl<'a, P: PageSession> DayOperation<P> for DiaryDayJob<'a> {
  async fn run(&self, page: &mut P, date: NaiveDate) -> Result<DiaryDay, DayError> {
    let url = self.urls.for_date(date);

    page.navigate(&url).await?;
    page.settle(self.settle).await;

    self.resolver.ensure_access(page, self.operator).await?;

    let snapshot = PageSnapshot {
      html: page.content().await?,
      visible_text: page.visible_text().await?,
    };

    Ok(self.extractor.extract(&snapshot).into_day(date))
  }
}

/// ---------------------------------------------------------------------------
/// Walker
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
  #[error("Aborted at {date}: {source}")]
  Aborted {
    date: NaiveDate,
    #[source]
    source: DayError,
  },
}

#[derive(Debug, Clone, Copy)]
pub struct WalkPolicy {
  /// Delay between consecutive days
  pub pacing: Duration,
  /// Fresh-page retries for a day that failed on a stale page
  pub fresh_page_retries: u32,
}

impl Default for WalkPolicy {
  fn default() -> Self {
    Self {
      pacing: Duration::from_millis(1500),
      fresh_page_retries: 1,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DateRangeWalker {
  policy: WalkPolicy,
}

impl DateRangeWalker {
  pub fn new(policy: WalkPolicy) -> Self {
    Self { policy }
  }

  /// Produce exactly one `DiaryDay` per date in `range`, ascending
  pub async fn walk<B, O>(
    &self,
    session: &mut BrowserSession<B>,
    range: DateRange,
    op: &O,
  ) -> Result<Vec<DiaryDay>, WalkError>
  where
    B: BrowserHandle,
    O: DayOperation<B::Page>,
  {
    let mut days = Vec::with_capacity(range.day_count());

    for (index, date) in range.days().enumerate() {
      if index > 0 {
        tokio::time::sleep(self.policy.pacing).await;
      }

      let day = self.walk_day(session, date, op).await?;
      log_day(&day);
      days.push(day);
    }

    Ok(days)
  }

  async fn walk_day<B, O>(
    &self,
    session: &mut BrowserSession<B>,
    date: NaiveDate,
    op: &O,
  ) -> Result<DiaryDay, WalkError>
  where
    B: BrowserHandle,
    O: DayOperation<B::Page>,
  {
    let mut retries = 0;

    loop {
      let error = match op.run(&mut session.page, date).await {
        Ok(day) => return Ok(day),
        Err(e) => e,
      };

      if error.is_fatal() {
        return Err(WalkError::Aborted { date, source: error });
      }

      if error.is_recoverable() && retries < self.policy.fresh_page_retries {
        retries += 1;
        warn!(%date, "{}, retrying with a fresh page", error);
        if let Err(open_error) = session.refresh_page().await {
          return Ok(DiaryDay::failed(date, format!("{} (fresh page failed: {})", error, open_error)));
        }
        continue;
      }

      return Ok(DiaryDay::failed(date, error.to_string()));
    }
  }
}

fn log_day(day: &DiaryDay) {
  if let Some(error) = &day.error {
    error!("{} ERROR: {}", day.date, error);
    return;
  }

  let burned = day.totals.calories_burned;
  let burned_note = if burned > 0.0 {
    format!(", -{} exercise", burned.round())
  } else {
    String::new()
  };
  info!(
    "{} OK - {} items, {} kcal{}",
    day.date,
    day.meals.item_count(),
    day.totals.calories.round(),
    burned_note
  );
}
