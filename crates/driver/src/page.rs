//! The page seam between session logic and a concrete browser backend.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fanbridge_protocol::Cookie;
use serde_json::Value;

use crate::error::Result;

/// One live browser page.
///
/// `CdpPage` implements this over a real Chromium; `testing::MockPage` over
/// a scripted fixture. Implementations are not required to be safe for
/// concurrent interaction; the session serializes all calls against one
/// page behind its operation lock.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates and waits for the document to become interactive.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current top-frame URL.
    async fn current_url(&self) -> Result<String>;

    /// Polls for `selector` until it appears or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout; the caller decides whether a missing
    /// element is an error or an expected condition.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Focuses `selector` and types `text` one character at a time with
    /// `char_delay` between keystrokes.
    async fn type_text(&self, selector: &str, text: &str, char_delay: Duration) -> Result<()>;

    /// Evaluates a JavaScript expression and returns its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Injects cookies into the page's cookie store.
    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()>;

    /// Snapshot of the current cookie store.
    async fn cookies(&self) -> Result<Vec<Cookie>>;

    /// Attaches a local file to the first element matching `selector`.
    async fn upload_file(&self, selector: &str, path: &Path) -> Result<()>;

    /// Tears down the page and its owning browser process. Must succeed
    /// even when the page is wedged, and must be idempotent.
    async fn close(&self) -> Result<()>;
}
