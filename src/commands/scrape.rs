use chrono::{Local, NaiveDateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregate::ReportAggregator;
use crate::challenge::{ChallengeResolver, ManualIntervention, RetryPolicy, StdinOperator};
use crate::cli::ScrapeArgs;
use crate::commands::AppError;
use crate::config::{resolve_range, DiaryConfig, DiaryUrls};
use crate::extract::DiaryExtractor;
use crate::locale::LocaleKeywords;
use crate::models::DiaryDay;
use crate::output::{write_diary_csv, write_diary_json, DiaryOutputs};
use crate::session::{BrowserHandle, BrowserSession, CdpBrowser};
use crate::walker::{DateRange, DateRangeWalker, DiaryDayJob, WalkPolicy};

/// Pause after each navigation before the page is read
const NAVIGATION_SETTLE: Duration = Duration::from_secs(2);

/// ---------------------------------------------------------------------------
/// Capture
/// ---------------------------------------------------------------------------

/// Everything a capture needs besides the browser
pub struct CaptureContext<'a> {
  pub urls: &'a DiaryUrls,
  pub resolver: &'a ChallengeResolver,
  pub extractor: &'a DiaryExtractor,
  pub operator: &'a dyn ManualIntervention,
  pub walk: WalkPolicy,
  pub settle: Duration,
}

/// Clear any gate on the page the operator left open, then walk the range.
/// A gate that cannot be passed here aborts before any day is visited.
pub async fn capture<B: BrowserHandle>(
  session: &mut BrowserSession<B>,
  range: DateRange,
  ctx: &CaptureContext<'_>,
) -> Result<Vec<DiaryDay>, AppError> {
  let access = ctx.resolver.ensure_access(&mut session.page, ctx.operator).await?;
  if access.password_submitted {
    info!("diary password accepted");
  }

  info!("Capturing {} day(s): {} to {}", range.day_count(), range.start, range.end);

  let job = DiaryDayJob {
    urls: ctx.urls,
    resolver: ctx.resolver,
    extractor: ctx.extractor,
    operator: ctx.operator,
    settle: ctx.settle,
  };

  let days = DateRangeWalker::new(ctx.walk).walk(session, range, &job).await?;
  Ok(days)
}

/// Write the capture as JSON and CSV into `dir`
pub fn save_capture(dir: &Path, days: &[DiaryDay], timestamp: NaiveDateTime) -> Result<DiaryOutputs, AppError> {
  let outputs = DiaryOutputs::in_dir(dir, timestamp);
  write_diary_json(&outputs.json, days)?;
  write_diary_csv(&outputs.csv, days)?;
  info!("Saved: {}", outputs.json.display());
  info!("Saved: {}", outputs.csv.display());
  Ok(outputs)
}

/// ---------------------------------------------------------------------------
/// Command
/// ---------------------------------------------------------------------------

pub async fn run(args: &ScrapeArgs) -> Result<(), AppError> {
  let config = DiaryConfig::load(args.overrides())?;
  let range = resolve_range(args.days, args.start, args.end, Local::now().date_naive())?;
  let urls = config.diary_urls()?;

  let browser = CdpBrowser::connect(&config.devtools_endpoint()).await?;
  let page = browser.attach_existing(&config.site_host()).await?;
  let mut session = BrowserSession::new(browser, page);

  let resolver = ChallengeResolver::new(config.password.clone(), RetryPolicy::default());
  let extractor = DiaryExtractor::new(LocaleKeywords::default(), !args.no_exercise);
  let ctx = CaptureContext {
    urls: &urls,
    resolver: &resolver,
    extractor: &extractor,
    operator: &StdinOperator,
    walk: WalkPolicy::default(),
    settle: NAVIGATION_SETTLE,
  };

  let captured = capture(&mut session, range, &ctx).await;

  // The browser is handled the same way whether or not the capture succeeded
  if args.close {
    if let Err(e) = session.browser.close().await {
      warn!("failed to close browser: {}", e);
    }
  } else {
    info!("browser left open");
  }

  let days = captured?;
  ReportAggregator::log_summary(&ReportAggregator::summarize(&days));
  save_capture(&args.out, &days, Utc::now().naive_utc())?;

  Ok(())
}
