//! Live browser page capability
//!
//! The pipeline talks to a page through `PageSession` and acquires fresh pages
//! through `BrowserHandle`. `CdpBrowser` implements both over the Chrome DevTools
//! protocol, attaching to a Chrome already running with `--remote-debugging-port`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const NAVIGATION_TIMEOUT_SECS: u64 = 60;
/// Upper bound on any single protocol command, e.g. a script blocked by a dialog
const COMMAND_TIMEOUT_SECS: u64 = 30;
const READY_POLL_INTERVAL_MS: u64 = 250;
const PASSWORD_FIELD_SELECTOR: &str = "input[type=\"password\"]";
const SUBMIT_SELECTOR: &str = "button[type=\"submit\"], input[type=\"submit\"]";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
  #[error("Browser not reachable at {endpoint}: {reason}")]
  Unreachable { endpoint: String, reason: String },

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("WebSocket error: {0}")]
  WebSocket(String),

  #[error("DevTools protocol error: {0}")]
  Protocol(String),

  #[error("Navigation failed: {0}")]
  Navigation(String),

  #[error("{action} timed out after {secs}s")]
  Timeout { action: String, secs: u64 },

  #[error("Page detached: {0}")]
  Detached(String),
}

impl SessionError {
  /// Stale page handles and transient navigation failures can be retried on a
  /// fresh page
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      SessionError::Detached(_) | SessionError::Timeout { .. } | SessionError::Navigation(_)
    )
  }

  /// Classify a protocol error message. Destroyed execution contexts and detached
  /// frames mean the page handle went stale.
  pub fn from_protocol_message(message: &str) -> Self {
    let lower = message.to_lowercase();
    if lower.contains("execution context") || lower.contains("detached") {
      SessionError::Detached(message.to_string())
    } else {
      SessionError::Protocol(message.to_string())
    }
  }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
  fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
    SessionError::WebSocket(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Capability Traits
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageSession: Send {
  /// Navigate and wait for the document to finish loading
  async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

  async fn title(&mut self) -> Result<String, SessionError>;

  /// Serialized DOM of the current document
  async fn content(&mut self) -> Result<String, SessionError>;

  /// Rendered text of the document body
  async fn visible_text(&mut self) -> Result<String, SessionError>;

  async fn has_password_field(&mut self) -> Result<bool, SessionError>;

  /// Fill the password field, trigger its submit action and wait for the page to load
  async fn submit_password(&mut self, password: &str) -> Result<(), SessionError>;

  /// Let the page settle after navigation or form submission
  async fn settle(&mut self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

#[async_trait]
pub trait BrowserHandle: Send + Sync {
  type Page: PageSession;

  /// Acquire a fresh page
  async fn open_page(&self) -> Result<Self::Page, SessionError>;

  /// Close the whole browser
  async fn close(&self) -> Result<(), SessionError>;
}

/// The browser plus the single page reused across a run
pub struct BrowserSession<B: BrowserHandle> {
  pub browser: B,
  pub page: B::Page,
}

impl<B: BrowserHandle> BrowserSession<B> {
  pub fn new(browser: B, page: B::Page) -> Self {
    Self { browser, page }
  }

  /// Replace a stale page with a fresh one
  pub async fn refresh_page(&mut self) -> Result<(), SessionError> {
    self.page = self.browser.open_page().await?;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// DevTools HTTP Discovery
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
  pub id: String,
  #[serde(rename = "type")]
  pub target_type: String,
  #[serde(default)]
  pub url: String,
  #[serde(rename = "webSocketDebuggerUrl", default)]
  pub ws_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrowserVersion {
  #[serde(rename = "Browser", default)]
  browser: String,
  #[serde(rename = "webSocketDebuggerUrl")]
  ws_url: String,
}

/// Pick the page already showing the site, else the first page target
pub fn pick_page_target<'a>(targets: &'a [TargetInfo], site_hint: &str) -> Option<&'a TargetInfo> {
  let pages = || {
    targets
      .iter()
      .filter(|t| t.target_type == "page" && t.ws_url.is_some())
  };
  pages()
    .find(|t| t.url.contains(site_hint))
    .or_else(|| pages().next())
}

/// ---------------------------------------------------------------------------
/// Chrome DevTools Browser
/// ---------------------------------------------------------------------------

pub struct CdpBrowser {
  http: Client,
  endpoint: String,
  browser_ws_url: String,
  navigation_timeout: Duration,
}

impl CdpBrowser {
  /// Attach to Chrome's debugging endpoint, e.g. `http://127.0.0.1:9223`
  pub async fn connect(endpoint: &str) -> Result<Self, SessionError> {
    let http = Client::new();
    let endpoint = endpoint.trim_end_matches('/').to_string();

    let unreachable_at = |reason: String| SessionError::Unreachable {
      endpoint: endpoint.clone(),
      reason,
    };

    let response = http
      .get(format!("{}/json/version", endpoint))
      .send()
      .await
      .map_err(|e| unreachable_at(e.to_string()))?;

    if !response.status().is_success() {
      return Err(unreachable_at(format!("status {}", response.status())));
    }

    let version: BrowserVersion = response
      .json()
      .await
      .map_err(|e| unreachable_at(e.to_string()))?;

    debug!(browser = %version.browser, "attached to DevTools endpoint");

    Ok(Self {
      http,
      endpoint,
      browser_ws_url: version.ws_url,
      navigation_timeout: Duration::from_secs(NAVIGATION_TIMEOUT_SECS),
    })
  }

  pub async fn list_targets(&self) -> Result<Vec<TargetInfo>, SessionError> {
    let targets = self
      .http
      .get(format!("{}/json/list", self.endpoint))
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    Ok(targets)
  }

  async fn new_target(&self) -> Result<TargetInfo, SessionError> {
    // Recent Chrome versions reject GET on /json/new
    let target = self
      .http
      .put(format!("{}/json/new?about:blank", self.endpoint))
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    Ok(target)
  }

  /// Reuse the tab the operator left open on the site, opening one if none exists
  pub async fn attach_existing(&self, site_hint: &str) -> Result<CdpPage, SessionError> {
    let targets = self.list_targets().await?;
    let target = match pick_page_target(&targets, site_hint) {
      Some(target) => target.clone(),
      None => self.new_target().await?,
    };
    CdpPage::attach(&target, self.navigation_timeout).await
  }
}

#[async_trait]
impl BrowserHandle for CdpBrowser {
  type Page = CdpPage;

  async fn open_page(&self) -> Result<CdpPage, SessionError> {
    let target = self.new_target().await?;
    CdpPage::attach(&target, self.navigation_timeout).await
  }

  async fn close(&self) -> Result<(), SessionError> {
    let (mut ws, _) = connect_async(self.browser_ws_url.as_str()).await?;
    let payload = json!({ "id": 1, "method": "Browser.close" }).to_string();
    ws.send(Message::Text(payload)).await?;
    // Chrome drops the socket once it exits
    let _ = ws.next().await;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Chrome DevTools Page
/// ---------------------------------------------------------------------------

pub struct CdpPage {
  ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
  next_id: u64,
  url: String,
  navigation_timeout: Duration,
  command_timeout: Duration,
}

impl CdpPage {
  async fn attach(target: &TargetInfo, navigation_timeout: Duration) -> Result<Self, SessionError> {
    let ws_url = target
      .ws_url
      .as_deref()
      .ok_or_else(|| SessionError::Protocol(format!("target {} has no debugger url", target.id)))?;

    let (ws, _) = connect_async(ws_url).await?;
    debug!(target = %target.id, url = %target.url, "attached to page");

    Ok(Self {
      ws,
      next_id: 0,
      url: target.url.clone(),
      navigation_timeout,
      command_timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
    })
  }

  /// Send one protocol command and wait at most `command_timeout` for its response.
  /// A late response is skipped by id on the next call.
  async fn call(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
    let limit = self.command_timeout;
    tokio::time::timeout(limit, self.exchange(method, params))
      .await
      .unwrap_or_else(|_| {
        Err(SessionError::Timeout {
          action: method.to_string(),
          secs: limit.as_secs(),
        })
      })
  }

  /// Send one protocol command and wait for its response, skipping events
  async fn exchange(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
    self.next_id += 1;
    let id = self.next_id;
    let payload = json!({ "id": id, "method": method, "params": params }).to_string();
    self.ws.send(Message::Text(payload)).await?;

    while let Some(message) = self.ws.next().await {
      let text = match message? {
        Message::Text(text) => text,
        Message::Close(_) => break,
        _ => continue,
      };

      let value: Value = serde_json::from_str(&text)
        .map_err(|e| SessionError::Protocol(format!("invalid message: {}", e)))?;

      if value.get("id").and_then(Value::as_u64) != Some(id) {
        continue;
      }

      if let Some(error) = value.get("error") {
        let message = error
          .get("message")
          .and_then(Value::as_str)
          .unwrap_or("unknown error");
        return Err(SessionError::from_protocol_message(message));
      }

      return Ok(value.get("result").cloned().unwrap_or(Value::Null));
    }

    Err(SessionError::Detached(format!("connection closed during {}", method)))
  }

  async fn evaluate(&mut self, expression: &str) -> Result<Value, SessionError> {
    let result = self
      .call(
        "Runtime.evaluate",
        json!({ "expression": expression, "returnByValue": true, "awaitPromise": true }),
      )
      .await?;

    if let Some(details) = result.get("exceptionDetails") {
      let message = details
        .pointer("/exception/description")
        .or_else(|| details.get("text"))
        .and_then(Value::as_str)
        .unwrap_or("script exception");
      return Err(SessionError::from_protocol_message(message));
    }

    Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
  }

  async fn evaluate_string(&mut self, expression: &str) -> Result<String, SessionError> {
    Ok(
      self
        .evaluate(expression)
        .await?
        .as_str()
        .unwrap_or_default()
        .to_string(),
    )
  }

  /// Poll `document.readyState` until complete. Stale contexts during the
  /// transition count as not ready yet.
  async fn wait_ready(&mut self) -> Result<(), SessionError> {
    loop {
      match self.evaluate("document.readyState").await {
        Ok(Value::String(state)) if state == "complete" => return Ok(()),
        Ok(_) => {}
        Err(e) if e.is_recoverable() => debug!("waiting for new document: {}", e),
        Err(e) => return Err(e),
      }
      tokio::time::sleep(Duration::from_millis(READY_POLL_INTERVAL_MS)).await;
    }
  }

  async fn navigate_inner(&mut self, url: &str) -> Result<(), SessionError> {
    let result = self.call("Page.navigate", json!({ "url": url })).await?;

    if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
      if !error_text.is_empty() {
        return Err(SessionError::Navigation(format!("{}: {}", url, error_text)));
      }
    }

    self.wait_ready().await
  }
}

#[async_trait]
impl PageSession for CdpPage {
  async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
    debug!(from = %self.url, to = %url, "navigating");
    let limit = self.navigation_timeout;
    match tokio::time::timeout(limit, self.navigate_inner(url)).await {
      Ok(result) => result?,
      Err(_) => {
        return Err(SessionError::Timeout {
          action: format!("Navigation to {}", url),
          secs: limit.as_secs(),
        })
      }
    }
    self.url = url.to_string();
    Ok(())
  }

  async fn title(&mut self) -> Result<String, SessionError> {
    self.evaluate_string("document.title").await
  }

  async fn content(&mut self) -> Result<String, SessionError> {
    self
      .evaluate_string("document.documentElement ? document.documentElement.outerHTML : ''")
      .await
  }

  async fn visible_text(&mut self) -> Result<String, SessionError> {
    self
      .evaluate_string("document.body ? document.body.innerText : ''")
      .await
  }

  async fn has_password_field(&mut self) -> Result<bool, SessionError> {
    let expression = format!("!!document.querySelector({})", js_string(PASSWORD_FIELD_SELECTOR));
    Ok(self.evaluate(&expression).await?.as_bool().unwrap_or(false))
  }

  async fn submit_password(&mut self, password: &str) -> Result<(), SessionError> {
    let script = format!(
      r#"(() => {{
        const field = document.querySelector({field});
        if (!field) return false;
        field.focus();
        field.value = {password};
        field.dispatchEvent(new Event('input', {{ bubbles: true }}));
        const button = document.querySelector({submit});
        if (button) {{ button.click(); }} else if (field.form) {{ field.form.submit(); }}
        return true;
      }})()"#,
      field = js_string(PASSWORD_FIELD_SELECTOR),
      password = js_string(password),
      submit = js_string(SUBMIT_SELECTOR),
    );

    let submitted = self.evaluate(&script).await?.as_bool().unwrap_or(false);
    if !submitted {
      warn!("password field disappeared before submission");
      return Ok(());
    }

    // Submission may or may not navigate; a slow or missing load is not an error here
    tokio::time::sleep(Duration::from_millis(500)).await;
    if tokio::time::timeout(self.navigation_timeout, self.wait_ready())
      .await
      .is_err()
    {
      warn!("page did not finish loading after password submission");
    }
    Ok(())
  }
}

/// JSON string literals are valid JavaScript string literals
fn js_string(value: &str) -> String {
  Value::String(value.to_string()).to_string()
}
