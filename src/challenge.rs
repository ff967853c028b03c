//! Anti-bot interstitials and diary password gates
//!
//! Interstitials are waited out with a bounded polling policy, then escalated
//! (operator confirmation or failure). Password gates are satisfied with the
//! configured diary password.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::session::{PageSession, SessionError};

/// ---------------------------------------------------------------------------
/// Detection Markers
/// ---------------------------------------------------------------------------

const CONTENT_MARKERS: &[&str] = &["just a moment", "cf_chl"];
const TITLE_MARKERS: &[&str] = &["just a moment", "moment", "aguarde"];

const PASSWORD_SETTLE_SECS: u64 = 2;

/// Case-insensitive marker match on title and content
pub fn looks_like_interstitial(title: &str, content: &str) -> bool {
  let title = title.to_lowercase();
  let content = content.to_lowercase();
  TITLE_MARKERS.iter().any(|m| title.contains(m)) || CONTENT_MARKERS.iter().any(|m| content.contains(m))
}

/// ---------------------------------------------------------------------------
/// Retry Policy
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
  /// Block until the operator confirms they solved the challenge, then carry on
  WaitForOperator,
  /// Give up with `ChallengeError::Unresolved`
  Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub interval: Duration,
  pub escalation: Escalation,
}

impl Default for RetryPolicy {
  /// 60 checks, 2 seconds apart (about two minutes)
  fn default() -> Self {
    Self {
      max_attempts: 60,
      interval: Duration::from_secs(2),
      escalation: Escalation::WaitForOperator,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Manual Intervention
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait ManualIntervention: Send + Sync {
  async fn wait_for_operator(&self, reason: &str);
}

/// Prompts on the log and waits for ENTER on stdin
pub struct StdinOperator;

#[async_trait]
impl ManualIntervention for StdinOperator {
  async fn wait_for_operator(&self, reason: &str) {
    warn!("{} - solve it in the open browser, then press ENTER here", reason);
    let mut line = String::new();
    if let Err(e) = BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
      warn!("could not read from stdin: {}", e);
    }
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
  #[error("Diary is password protected but no diary password is configured")]
  MissingPassword,

  #[error("Diary password was rejected")]
  PasswordRejected,

  #[error("Anti-bot challenge still present after {0} checks")]
  Unresolved(u32),

  #[error(transparent)]
  Session(#[from] SessionError),
}

impl ChallengeError {
  /// Missing credentials cannot be fixed by retrying another day
  pub fn is_fatal(&self) -> bool {
    matches!(self, ChallengeError::MissingPassword)
  }
}

/// ---------------------------------------------------------------------------
/// Resolver
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
  /// No interstitial was shown
  Clear,
  /// Interstitial went away after this many polls
  Cleared { polls: u32 },
  /// Still present after the polling bound
  Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessReport {
  pub challenge: ChallengeStatus,
  pub operator_called: bool,
  pub password_submitted: bool,
}

#[derive(Debug, Clone)]
pub struct ChallengeResolver {
  password: Option<String>,
  policy: RetryPolicy,
  password_settle: Duration,
}

impl ChallengeResolver {
  pub fn new(password: Option<String>, policy: RetryPolicy) -> Self {
    Self {
      password: password.filter(|p| !p.is_empty()),
      policy,
      password_settle: Duration::from_secs(PASSWORD_SETTLE_SECS),
    }
  }

  pub fn with_password_settle(mut self, settle: Duration) -> Self {
    self.password_settle = settle;
    self
  }

  pub async fn is_interstitial<P: PageSession + ?Sized>(&self, page: &mut P) -> Result<bool, SessionError> {
    let title = page.title().await?;
    let content = page.content().await?;
    Ok(looks_like_interstitial(&title, &content))
  }

  /// Poll until the interstitial is gone or the policy bound is reached
  pub async fn wait_out_interstitial<P: PageSession + ?Sized>(
    &self,
    page: &mut P,
  ) -> Result<ChallengeStatus, SessionError> {
    if !self.is_interstitial(page).await? {
      return Ok(ChallengeStatus::Clear);
    }

    info!("anti-bot challenge detected, waiting for it to clear");
    for poll in 1..=self.policy.max_attempts {
      tokio::time::sleep(self.policy.interval).await;
      if !self.is_interstitial(page).await? {
        info!(polls = poll, "challenge cleared");
        return Ok(ChallengeStatus::Cleared { polls: poll });
      }
    }

    Ok(ChallengeStatus::Unresolved)
  }

  /// Submit the diary password if a password field is present.
  /// Returns whether a password was submitted.
  pub async fn satisfy_password_gate<P: PageSession + ?Sized>(&self, page: &mut P) -> Result<bool, ChallengeError> {
    if !page.has_password_field().await? {
      return Ok(false);
    }

    let password = self.password.as_deref().ok_or(ChallengeError::MissingPassword)?;

    debug!("password gate detected, submitting diary password");
    page.submit_password(password).await?;
    page.settle(self.password_settle).await;

    if page.has_password_field().await? {
      return Err(ChallengeError::PasswordRejected);
    }
    Ok(true)
  }

  /// Clear whatever gate stands in front of the diary. A no-op on an ungated page.
  pub async fn ensure_access<P: PageSession + ?Sized>(
    &self,
    page: &mut P,
    operator: &dyn ManualIntervention,
  ) -> Result<AccessReport, ChallengeError> {
    let challenge = self.wait_out_interstitial(page).await?;
    let mut operator_called = false;

    if challenge == ChallengeStatus::Unresolved {
      match self.policy.escalation {
        Escalation::Fail => return Err(ChallengeError::Unresolved(self.policy.max_attempts)),
        Escalation::WaitForOperator => {
          operator.wait_for_operator("Anti-bot challenge still active").await;
          operator_called = true;
          if self.is_interstitial(page).await? {
            warn!("challenge still detected after operator confirmation, continuing anyway");
          }
        }
      }
    }

    let password_submitted = self.satisfy_password_gate(page).await?;

    Ok(AccessReport {
      challenge,
      operator_called,
      password_submitted,
    })
  }
}
