//! Session lifecycle and the four operation families: authenticate,
//! restore, read, write.
//!
//! One `Session` owns one browser page. The page is not safe for
//! concurrent interaction, so every operation runs behind a per-session
//! async mutex: overlapping callers queue instead of racing the same
//! input field. Each suspending step carries a bounded timeout and honors
//! the session's cancellation token.

use std::future::Future;
use std::time::Duration;

use fanbridge_protocol::{CookieJar, InboundMessage, ThreadId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cdp::CdpPage;
use crate::config::DriverConfig;
use crate::error::{DriverError, LoginOutcome, Result, SendOutcome};
use crate::page::PageDriver;
use crate::platform::{LandingClass, PlatformAdapter};

/// Interval between landing-URL polls after a login submit.
const LANDING_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Grace added on top of a page-level wait budget so a misbehaving backend
/// still cannot hang the caller.
const BUDGET_GRACE: Duration = Duration::from_secs(2);

/// Login credentials, supplied once per attempt and never persisted here.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authentication state of one session.
///
/// A constructed session starts `Initialized`; there is no representable
/// uninitialized state because construction is initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Authenticated,
    /// A navigation revealed the server invalidated the session. Every
    /// authenticated-only operation fails fast until a fresh login/restore.
    Expired,
    Closed,
}

struct Inner {
    state: SessionState,
    page: Box<dyn PageDriver>,
}

/// One automated browser session against the external platform.
pub struct Session {
    inner: tokio::sync::Mutex<Inner>,
    adapter: PlatformAdapter,
    config: DriverConfig,
    cancel: CancellationToken,
}

impl Session {
    /// Launches a fresh browser session. Fatal on failure: no partial
    /// session is retained and the caller retries from scratch.
    pub async fn launch(config: DriverConfig) -> Result<Self> {
        let page = CdpPage::launch(&config).await?;
        Ok(Self::with_page(Box::new(page), PlatformAdapter::default(), config))
    }

    /// Builds a session over an existing page backend. This is the seam for
    /// alternate backends and for tests driving a scripted page.
    pub fn with_page(
        page: Box<dyn PageDriver>,
        adapter: PlatformAdapter,
        config: DriverConfig,
    ) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Inner {
                state: SessionState::Initialized,
                page,
            }),
            adapter,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts in-flight waits when cancelled. A cancelled
    /// session can still be closed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current authentication state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Attempts an interactive login. Expected failures come back as
    /// [`LoginOutcome`] values; only transport-level breakage is `Err`.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Initialized | SessionState::Expired => {}
            SessionState::Authenticated => return Ok(LoginOutcome::Authenticated),
            SessionState::Closed => return Err(DriverError::NotAuthenticated),
        }

        let timeouts = &self.config.timeouts;
        let root = self.adapter.root_url();
        info!(target = "fanbridge.session", username = %credentials.username, "login attempt");

        self.bounded(timeouts.first_load, "platform root load", inner.page.navigate(&root))
            .await?;

        let selectors = self.adapter.selectors.clone();
        let form_present = self
            .bounded(
                timeouts.selector + BUDGET_GRACE,
                "login form",
                inner.page.wait_for_selector(&selectors.login_username, timeouts.selector),
            )
            .await?;
        if !form_present {
            // Layout change or an already-authenticated landing; the driver
            // does not disambiguate, it reports and stops.
            warn!(target = "fanbridge.session", "login form did not appear");
            return Ok(LoginOutcome::Denied {
                reason: "login form did not appear".into(),
            });
        }

        let delay = self.config.typing_delay;
        inner
            .page
            .type_text(&selectors.login_username, &credentials.username, delay)
            .await?;
        inner
            .page
            .type_text(&selectors.login_secret, &credentials.secret, delay)
            .await?;
        inner.page.click(&selectors.login_submit).await?;

        let outcome = self.classify_post_login(&mut inner, &root).await?;
        if outcome.is_authenticated() {
            inner.state = SessionState::Authenticated;
            info!(target = "fanbridge.session", "login successful");
        } else {
            debug!(target = "fanbridge.session", ?outcome, "login not successful");
        }
        Ok(outcome)
    }

    /// Polls the landing URL after submit until it classifies or the
    /// navigation budget elapses.
    async fn classify_post_login(&self, inner: &mut Inner, root: &str) -> Result<LoginOutcome> {
        let budget = self.config.timeouts.navigation;
        let start = tokio::time::Instant::now();
        let mut last_url = root.to_string();

        loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Cancelled);
            }

            match inner.page.current_url().await {
                Ok(url) => match self.adapter.classify_landing(&url) {
                    LandingClass::Authenticated => return Ok(LoginOutcome::Authenticated),
                    LandingClass::LoginSurface => {
                        return Ok(LoginOutcome::Denied {
                            reason: format!("platform returned to the login surface: {url}"),
                        });
                    }
                    LandingClass::Unknown => last_url = url,
                },
                // The submit tears down the document; reading the URL in
                // that window fails transiently. Keep polling while the
                // budget lasts.
                Err(err) => {
                    if start.elapsed() > budget {
                        return Err(err);
                    }
                    debug!(
                        target = "fanbridge.session",
                        error = %err,
                        "landing url unavailable mid-navigation"
                    );
                }
            }

            if start.elapsed() > budget {
                // Unclassifiable landing after the full budget: CAPTCHA,
                // 2FA, or a UI change. Surfaced distinctly so a human gets
                // alerted instead of a blind retry loop hammering the site.
                return Ok(LoginOutcome::Indeterminate {
                    reason: format!("unclassifiable landing url after submit: {last_url}"),
                });
            }
            tokio::time::sleep(LANDING_POLL_INTERVAL).await;
        }
    }

    /// Snapshots the live cookie jar. The copy is independent: mutating it
    /// cannot affect this session.
    pub async fn export_cookies(&self) -> Result<CookieJar> {
        let inner = self.inner.lock().await;
        if inner.state != SessionState::Authenticated {
            return Err(DriverError::NotAuthenticated);
        }
        let cookies = inner.page.cookies().await?;
        debug!(target = "fanbridge.session", count = cookies.len(), "cookies exported");
        Ok(CookieJar::new(cookies))
    }

    /// Injects a previously exported jar and optimistically marks the
    /// session authenticated. Stale cookies surface as an `Expired`
    /// transition on the first subsequent read/write.
    pub async fn restore_cookies(&self, jar: &CookieJar) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Initialized | SessionState::Expired => {}
            SessionState::Authenticated => {}
            SessionState::Closed => return Err(DriverError::NotAuthenticated),
        }
        inner.page.set_cookies(&jar.cookies).await?;
        inner.state = SessionState::Authenticated;
        info!(target = "fanbridge.session", count = jar.len(), "session restored from cookie jar");
        Ok(())
    }

    /// Scans the inbox and returns one record per unread conversation.
    ///
    /// Fail-closed: a list container that never renders is a
    /// [`DriverError::Scrape`], never an empty result. `Ok(vec![])` means
    /// the inbox rendered with nothing unread.
    pub async fn fetch_unread_threads(&self) -> Result<Vec<InboundMessage>> {
        let mut inner = self.inner.lock().await;
        Self::require_authenticated(&inner)?;

        let timeouts = &self.config.timeouts;
        let inbox = self.adapter.inbox_url();
        self.bounded(timeouts.navigation, "inbox navigation", inner.page.navigate(&inbox))
            .await?;
        self.detect_expiry(&mut inner).await?;

        let chat_item = self.adapter.selectors.chat_item.clone();
        let rendered = self
            .bounded(
                timeouts.selector + BUDGET_GRACE,
                "chat list",
                inner.page.wait_for_selector(&chat_item, timeouts.selector),
            )
            .await?;
        if !rendered {
            return Err(DriverError::Scrape("chat list did not render".into()));
        }

        let raw = inner.page.evaluate(&self.adapter.unread_scan_script()).await?;
        let items = raw.as_array().cloned().unwrap_or_default();

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let thread_id = item["threadId"].as_str().unwrap_or_default().to_string();
            if thread_id.is_empty() {
                warn!(target = "fanbridge.session", "unread item without thread id skipped");
                continue;
            }
            let avatar = item["avatar"].as_str().unwrap_or_default();
            records.push(InboundMessage {
                subscriber_id: thread_id.clone(),
                subscriber_name: item["name"].as_str().unwrap_or_default().to_string(),
                avatar_url: (!avatar.is_empty()).then(|| avatar.to_string()),
                excerpt: item["excerpt"].as_str().unwrap_or_default().to_string(),
                thread_id: ThreadId(thread_id),
                read: false,
            });
        }

        info!(target = "fanbridge.session", unread = records.len(), "inbox scanned");
        Ok(records)
    }

    /// Navigates directly to a conversation. Timeout propagates.
    pub async fn open_thread(&self, thread: &ThreadId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::require_authenticated(&inner)?;
        self.open_thread_locked(&mut inner, thread).await
    }

    async fn open_thread_locked(&self, inner: &mut Inner, thread: &ThreadId) -> Result<()> {
        let url = self.adapter.thread_url(thread);
        self.bounded(
            self.config.timeouts.navigation,
            "thread navigation",
            inner.page.navigate(&url),
        )
        .await?;
        self.detect_expiry(inner).await
    }

    /// Sends a text message into a thread.
    ///
    /// Positive confirmation is the composer clearing within the
    /// confirmation budget; elapsing it yields
    /// [`SendOutcome::Indeterminate`], never a silent success or failure.
    pub async fn send_text(&self, thread: &ThreadId, text: &str) -> Result<SendOutcome> {
        let mut inner = self.inner.lock().await;
        Self::require_authenticated(&inner)?;

        self.open_thread_locked(&mut inner, thread).await?;

        let timeouts = &self.config.timeouts;
        let selectors = self.adapter.selectors.clone();
        let composer_present = self
            .bounded(
                timeouts.selector + BUDGET_GRACE,
                "message composer",
                inner.page.wait_for_selector(&selectors.composer, timeouts.selector),
            )
            .await?;
        if !composer_present {
            return Err(DriverError::Timeout {
                ms: timeouts.selector.as_millis() as u64,
                condition: format!("selector {}", selectors.composer),
            });
        }

        inner
            .page
            .type_text(&selectors.composer, text, self.config.typing_delay)
            .await?;
        inner.page.click(&selectors.send_button).await?;

        let outcome = self
            .confirm_send(&mut inner, &self.adapter.composer_cleared_script())
            .await?;
        info!(target = "fanbridge.session", %thread, outcome = ?outcome, "text send finished");
        Ok(outcome)
    }

    /// Uploads a media file into a thread, with an optional caption.
    pub async fn send_media(
        &self,
        thread: &ThreadId,
        media_path: &std::path::Path,
        caption: Option<&str>,
    ) -> Result<SendOutcome> {
        let mut inner = self.inner.lock().await;
        Self::require_authenticated(&inner)?;

        self.open_thread_locked(&mut inner, thread).await?;

        let timeouts = &self.config.timeouts;
        let selectors = self.adapter.selectors.clone();
        let input_present = self
            .bounded(
                timeouts.selector + BUDGET_GRACE,
                "file input",
                inner.page.wait_for_selector(&selectors.file_input, timeouts.selector),
            )
            .await?;
        if !input_present {
            return Err(DriverError::Timeout {
                ms: timeouts.selector.as_millis() as u64,
                condition: format!("selector {}", selectors.file_input),
            });
        }

        inner.page.upload_file(&selectors.file_input, media_path).await?;
        // The platform processes the upload asynchronously before the send
        // button acts on it.
        tokio::time::sleep(timeouts.upload_settle).await;

        if let Some(caption) = caption {
            inner
                .page
                .type_text(&selectors.composer, caption, self.config.typing_delay)
                .await?;
        }
        inner.page.click(&selectors.send_button).await?;

        let outcome = self
            .confirm_send(&mut inner, &self.adapter.upload_cleared_script())
            .await?;
        info!(target = "fanbridge.session", %thread, outcome = ?outcome, "media send finished");
        Ok(outcome)
    }

    /// Polls `predicate` until it reports true or the confirmation budget
    /// elapses.
    async fn confirm_send(&self, inner: &mut Inner, predicate: &str) -> Result<SendOutcome> {
        let budget = self.config.timeouts.send_confirm;
        let start = tokio::time::Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Cancelled);
            }
            if inner.page.evaluate(predicate).await?.as_bool() == Some(true) {
                return Ok(SendOutcome::Sent);
            }
            if start.elapsed() > budget {
                return Ok(SendOutcome::Indeterminate {
                    reason: format!(
                        "no send confirmation within {}ms",
                        budget.as_millis()
                    ),
                });
            }
            tokio::time::sleep(LANDING_POLL_INTERVAL).await;
        }
    }

    /// Tears the session down unconditionally. Idempotent, never fails:
    /// teardown problems are logged and swallowed because the caller has
    /// nothing useful to do with them.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Closed {
            return;
        }
        if let Err(err) = inner.page.close().await {
            warn!(target = "fanbridge.session", error = %err, "page teardown reported an error");
        }
        inner.state = SessionState::Closed;
        info!(target = "fanbridge.session", "session closed");
    }

    fn require_authenticated(inner: &Inner) -> Result<()> {
        match inner.state {
            SessionState::Authenticated => Ok(()),
            _ => Err(DriverError::NotAuthenticated),
        }
    }

    /// Flags server-side invalidation: a navigation that landed back on the
    /// logged-out surface flips the session to `Expired`. URL reads that
    /// fail while the new document settles are retried within the selector
    /// budget.
    async fn detect_expiry(&self, inner: &mut Inner) -> Result<()> {
        let budget = self.config.timeouts.selector;
        let start = tokio::time::Instant::now();
        let url = loop {
            match inner.page.current_url().await {
                Ok(url) => break url,
                Err(err) => {
                    if start.elapsed() > budget {
                        return Err(err);
                    }
                    debug!(
                        target = "fanbridge.session",
                        error = %err,
                        "landing url unavailable after navigation, retrying"
                    );
                    tokio::time::sleep(LANDING_POLL_INTERVAL).await;
                }
            }
        };
        if self.adapter.is_login_surface(&url) {
            warn!(target = "fanbridge.session", %url, "session expired server-side");
            inner.state = SessionState::Expired;
            return Err(DriverError::NotAuthenticated);
        }
        Ok(())
    }

    /// Applies a hard timeout and the session cancellation token to one
    /// suspending step.
    async fn bounded<T>(
        &self,
        budget: Duration,
        condition: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(DriverError::Cancelled),
            res = tokio::time::timeout(budget, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(DriverError::Timeout {
                    ms: budget.as_millis() as u64,
                    condition: condition.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials {
            username: "ada".into(),
            secret: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("ada"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
