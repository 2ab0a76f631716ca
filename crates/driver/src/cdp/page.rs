//! `PageDriver` implementation over a live Chromium.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fanbridge_protocol::Cookie;
use serde_json::{Value, json};
use tracing::debug;

use super::client::CdpClient;
use super::launcher::LaunchedBrowser;
use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::page::PageDriver;

/// Poll interval for readyState and selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// URL patterns blocked when heavy-resource filtering is on. Text scraping
/// never renders them, and skipping them cuts load time and detection
/// surface.
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.css", "*.woff", "*.woff2", "*.ttf",
    "*.otf", "*.mp4", "*.webm", "*.mp3", "*.m4a",
];

/// Script evaluated before any page script runs, masking the automation
/// flag the platform's bot detection checks first.
const STEALTH_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
window.chrome = window.chrome || { runtime: {} };
"#;

/// One page inside a browser process this driver owns end to end.
pub struct CdpPage {
    client: CdpClient,
    session_id: String,
    browser: tokio::sync::Mutex<Option<LaunchedBrowser>>,
    load_timeout: Duration,
}

impl CdpPage {
    /// Launches a browser, attaches one page, and applies the session-wide
    /// countermeasures (viewport, user agent, webdriver masking, optional
    /// resource filtering).
    pub async fn launch(config: &DriverConfig) -> Result<Self> {
        let browser = LaunchedBrowser::spawn(config).await?;
        let client = match CdpClient::connect(&browser.ws_url).await {
            Ok(client) => client,
            Err(err) => {
                // spawn succeeded but attach failed: reap the process now
                drop(browser);
                return Err(err);
            }
        };

        let session_id = client.attach_new_page().await?;
        let page = Self {
            client,
            session_id,
            browser: tokio::sync::Mutex::new(Some(browser)),
            load_timeout: config.timeouts.navigation,
        };
        page.configure(config).await?;
        Ok(page)
    }

    async fn configure(&self, config: &DriverConfig) -> Result<()> {
        self.command("Page.enable", None).await?;
        self.command("Runtime.enable", None).await?;
        self.command("Network.enable", None).await?;
        self.command("DOM.enable", None).await?;

        self.command(
            "Page.addScriptToEvaluateOnNewDocument",
            Some(json!({"source": STEALTH_INIT_SCRIPT})),
        )
        .await?;
        self.command(
            "Emulation.setUserAgentOverride",
            Some(json!({"userAgent": config.user_agent})),
        )
        .await?;
        self.command(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": config.viewport.0,
                "height": config.viewport.1,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;

        if config.block_heavy_resources {
            self.command(
                "Network.setBlockedURLs",
                Some(json!({"urls": BLOCKED_URL_PATTERNS})),
            )
            .await?;
        }

        debug!(target = "fanbridge.cdp", session = %self.session_id, "page configured");
        Ok(())
    }

    async fn command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.client
            .call(method, params, Some(&self.session_id))
            .await
    }

    async fn wait_for_ready_state(&self, url: &str) -> Result<()> {
        let start = tokio::time::Instant::now();
        loop {
            let state = self.evaluate("document.readyState").await?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok(());
            }
            if start.elapsed() > self.load_timeout {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: "page load timed out".into(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn node_id_for(&self, selector: &str) -> Result<i64> {
        let doc = self.command("DOM.getDocument", None).await?;
        let root = doc["root"]["nodeId"].as_i64().ok_or_else(|| {
            DriverError::Protocol {
                code: 0,
                message: "DOM.getDocument returned no root".into(),
            }
        })?;
        let found = self
            .command(
                "DOM.querySelector",
                Some(json!({"nodeId": root, "selector": selector})),
            )
            .await?;
        match found["nodeId"].as_i64() {
            Some(node_id) if node_id != 0 => Ok(node_id),
            _ => Err(DriverError::Scrape(format!("no element for {selector}"))),
        }
    }
}

/// Encodes a Rust string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let result = self
            .command("Page.navigate", Some(json!({"url": url})))
            .await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: error_text.to_string(),
                });
            }
        }
        self.wait_for_ready_state(url).await
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.evaluate("window.location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let probe = format!("document.querySelector({}) !== null", js_string(selector));
        let start = tokio::time::Instant::now();
        loop {
            if self.evaluate(&probe).await?.as_bool() == Some(true) {
                return Ok(true);
            }
            if start.elapsed() > timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) throw new Error('no element'); el.click(); return true; }})()",
            sel = js_string(selector)
        );
        self.evaluate(&script).await.map(|_| ())
    }

    async fn type_text(&self, selector: &str, text: &str, char_delay: Duration) -> Result<()> {
        let focus = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) throw new Error('no element'); el.focus(); return true; }})()",
            sel = js_string(selector)
        );
        self.evaluate(&focus).await?;

        // Per-character insertion with a human-scale delay; a single paste
        // of the whole value is a bot tell.
        for ch in text.chars() {
            self.command(
                "Input.insertText",
                Some(json!({"text": ch.to_string()})),
            )
            .await?;
            tokio::time::sleep(char_delay).await;
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .command(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let message = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("evaluation threw");
            return Err(DriverError::Protocol {
                code: 0,
                message: message.to_string(),
            });
        }
        Ok(result["result"]["value"].clone())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        for cookie in cookies {
            let params = serde_json::to_value(cookie)?;
            self.command("Network.setCookie", Some(params)).await?;
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let result = self.command("Network.getCookies", None).await?;
        let cookies = result["cookies"].clone();
        if cookies.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(cookies)?)
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<()> {
        let node_id = self.node_id_for(selector).await?;
        self.command(
            "DOM.setFileInputFiles",
            Some(json!({
                "files": [path.display().to_string()],
                "nodeId": node_id,
            })),
        )
        .await
        .map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        let Some(browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        // Graceful shutdown first; the launcher's drop kills whatever is
        // left if the browser ignores it.
        let _ = self.client.close_browser().await;
        drop(browser);
        debug!(target = "fanbridge.cdp", session = %self.session_id, "browser closed");
        Ok(())
    }
}
