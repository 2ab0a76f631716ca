//! Session driver configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Timeout budgets for every suspending operation.
///
/// Defaults mirror the values the platform tolerates in practice: 10 s
/// selector waits, 30 s in-app navigation, 60 s for the cold first load,
/// and a short confirmation window after send actions.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Bounded wait for a selector to appear.
    pub selector: Duration,
    /// Bounded wait for an in-app navigation to settle.
    pub navigation: Duration,
    /// Bounded wait for the initial full-page load at the platform root.
    pub first_load: Duration,
    /// Bounded wait for positive send confirmation (composer clearing).
    pub send_confirm: Duration,
    /// Settle delay after a media upload before the caption/send step.
    pub upload_settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            selector: Duration::from_secs(10),
            navigation: Duration::from_secs(30),
            first_load: Duration::from_secs(60),
            send_confirm: Duration::from_secs(5),
            upload_settle: Duration::from_secs(3),
        }
    }
}

/// Fully resolved driver configuration with builder-style setters.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run the browser headless.
    pub headless: bool,
    /// Viewport reported to the page.
    pub viewport: (u32, u32),
    /// User-agent string presented to the platform.
    pub user_agent: String,
    /// Abort image/stylesheet/font/media subresource fetches. Text scraping
    /// never renders them, and skipping them shrinks both load time and
    /// detection surface. Disable for operations that must render media.
    pub block_heavy_resources: bool,
    /// Per-character delay while typing into form fields.
    pub typing_delay: Duration,
    /// Explicit browser executable, overriding discovery.
    pub browser_path: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            block_heavy_resources: true,
            typing_delay: Duration::from_millis(100),
            browser_path: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl DriverConfig {
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_block_heavy_resources(mut self, block: bool) -> Self {
        self.block_heavy_resources = block;
        self
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn with_browser_path(mut self, path: Option<PathBuf>) -> Self {
        self.browser_path = path;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
