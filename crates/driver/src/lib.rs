//! Browser-automation session driver for fan-platform messaging.
//!
//! One [`Session`] owns one headless browser page against the external
//! platform: authenticated navigation, unread-inbox scraping, and
//! DOM-driven text/media sends, with cookie-jar export/import so a session
//! survives process restarts. Accounts scale as independent sessions: one
//! browser per account, never multiplexed.
//!
//! All platform fragility (selectors, URLs, landing classification) lives
//! behind [`PlatformAdapter`]; the browser itself sits behind the
//! [`PageDriver`] trait, with a CDP-backed implementation in [`cdp`] and a
//! scripted double in [`testing`].

pub mod cdp;
pub mod config;
pub mod error;
pub mod page;
pub mod platform;
pub mod session;
pub mod testing;

pub use config::{DriverConfig, Timeouts};
pub use error::{DriverError, LoginOutcome, Result, SendOutcome};
pub use page::PageDriver;
pub use platform::{LandingClass, PlatformAdapter};
pub use session::{Credentials, Session, SessionState};
