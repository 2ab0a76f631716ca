//! Driver error taxonomy.
//!
//! Fatal conditions propagate as `Err`; expected authentication/send
//! failures are returned as outcome values (`LoginOutcome`, `SendOutcome`)
//! so a long-running automation loop keeps operating after one bad session.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors surfaced by the session driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Browser process failed to launch. Fatal: no partial session exists.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// DevTools endpoint unreachable or handshake failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The browser rejected a CDP command.
    #[error("cdp error: {message} (code {code})")]
    Protocol { code: i64, message: String },

    /// Navigation did not complete.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait elapsed.
    #[error("timed out after {ms}ms waiting for {condition}")]
    Timeout { ms: u64, condition: String },

    /// An authenticated-only operation was invoked while the session was
    /// `Initialized`, `Expired`, or `Closed`.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The inbox (or another scraped surface) never rendered. Distinct from
    /// an empty result: an inbox with zero unread items is `Ok(vec![])`.
    #[error("scrape failed: {0}")]
    Scrape(String),

    /// The operation was aborted via its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for DriverError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        DriverError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        DriverError::Connection(e.to_string())
    }
}

/// Result of a login attempt. All three arms are expected conditions, not
/// errors; hard transport failures surface as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Landing URL matched an authenticated-area prefix.
    Authenticated,
    /// The platform visibly rejected the attempt, or the login form never
    /// appeared. Retryable with fresh credentials.
    Denied { reason: String },
    /// The post-login state could not be classified (unexpected interstitial,
    /// likely CAPTCHA or 2FA). A human should look before anyone retries.
    Indeterminate { reason: String },
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated)
    }
}

/// Result of a send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The composer cleared within the confirmation window.
    Sent,
    /// The confirmation wait elapsed. The message may or may not have been
    /// delivered; the caller owns the replay decision.
    Indeterminate { reason: String },
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}
