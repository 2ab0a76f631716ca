//! Scripted page double for driving the session without a browser.
//!
//! `MockPageBuilder` wires up behavior (selector presence, navigation
//! redirects, evaluate handlers, seeded cookies); the paired
//! [`MockPageHandle`] inspects recorded calls and mutates scripted state
//! mid-test.
//!
//! # Example
//!
//! ```ignore
//! let (page, handle) = MockPageBuilder::new()
//!     .with_selector(r#"input[name="email"]"#)
//!     .with_click_redirect(r#"button[type="submit"]"#, "https://onlyfans.com/my/home")
//!     .build();
//! let session = Session::with_page(Box::new(page), PlatformAdapter::default(), config);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fanbridge_protocol::Cookie;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;
use crate::page::PageDriver;

/// One recorded interaction against the mock page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCall {
    Navigate(String),
    WaitForSelector(String),
    Click(String),
    /// One keystroke. Typing records per character so interleaving between
    /// concurrent callers is observable.
    TypeChar {
        selector: String,
        ch: char,
    },
    Evaluate,
    SetCookies(usize),
    GetCookies,
    UploadFile {
        selector: String,
        path: PathBuf,
    },
    Close,
}

type EvalHandler = Box<dyn Fn(&str) -> Option<Value> + Send + Sync>;

#[derive(Default)]
struct Script {
    selectors: HashSet<String>,
    /// navigate(url) lands on redirects[url] when present, else on url.
    redirects: HashMap<String, String>,
    /// click(selector) moves the current URL when present.
    click_redirects: HashMap<String, String>,
    hang_navigation: bool,
    /// current_url() errors this many times before behaving normally,
    /// mimicking reads during a document swap.
    current_url_failures: usize,
    eval_handlers: Vec<EvalHandler>,
}

struct Shared {
    calls: Mutex<Vec<PageCall>>,
    current_url: Mutex<String>,
    cookies: Mutex<Vec<Cookie>>,
    script: Mutex<Script>,
}

/// Builder for a scripted page and its inspection handle.
#[derive(Default)]
pub struct MockPageBuilder {
    script: Script,
    cookies: Vec<Cookie>,
}

impl MockPageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a selector as present in the scripted DOM.
    pub fn with_selector(mut self, selector: &str) -> Self {
        self.script.selectors.insert(selector.to_string());
        self
    }

    /// Navigating to `url` lands on `target` instead (server-side redirect).
    pub fn with_redirect(mut self, url: &str, target: &str) -> Self {
        self.script.redirects.insert(url.to_string(), target.to_string());
        self
    }

    /// Clicking `selector` moves the page to `target` (form submits).
    pub fn with_click_redirect(mut self, selector: &str, target: &str) -> Self {
        self.script
            .click_redirects
            .insert(selector.to_string(), target.to_string());
        self
    }

    /// Navigations never complete until cancelled or timed out.
    pub fn with_hung_navigation(mut self) -> Self {
        self.script.hang_navigation = true;
        self
    }

    /// The first `count` current-URL reads fail, as they do while a real
    /// page swaps documents.
    pub fn with_current_url_failures(mut self, count: usize) -> Self {
        self.script.current_url_failures = count;
        self
    }

    /// Registers a handler consulted on `evaluate`; the first handler
    /// returning `Some` wins. Unhandled expressions evaluate to `null`.
    pub fn with_eval_handler(
        mut self,
        handler: impl Fn(&str) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.script.eval_handlers.push(Box::new(handler));
        self
    }

    /// Seeds the scripted cookie store.
    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn build(self) -> (MockPage, MockPageHandle) {
        let shared = Arc::new(Shared {
            calls: Mutex::new(Vec::new()),
            current_url: Mutex::new("about:blank".to_string()),
            cookies: Mutex::new(self.cookies),
            script: Mutex::new(self.script),
        });
        (
            MockPage {
                shared: Arc::clone(&shared),
            },
            MockPageHandle { shared },
        )
    }
}

/// Inspection and mid-test mutation handle for a [`MockPage`].
pub struct MockPageHandle {
    shared: Arc<Shared>,
}

impl MockPageHandle {
    /// Snapshot of every call made so far, in order.
    pub fn calls(&self) -> Vec<PageCall> {
        self.shared.calls.lock().clone()
    }

    /// Typed characters in call order, across all selectors.
    pub fn typed_chars(&self) -> Vec<char> {
        self.shared
            .calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                PageCall::TypeChar { ch, .. } => Some(*ch),
                _ => None,
            })
            .collect()
    }

    pub fn set_current_url(&self, url: &str) {
        *self.shared.current_url.lock() = url.to_string();
    }

    pub fn add_selector(&self, selector: &str) {
        self.shared.script.lock().selectors.insert(selector.to_string());
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.shared.cookies.lock().clone()
    }
}

/// Scripted [`PageDriver`] used by the behavioral test suites.
pub struct MockPage {
    shared: Arc<Shared>,
}

const MOCK_POLL: Duration = Duration::from_millis(25);

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.shared
            .calls
            .lock()
            .push(PageCall::Navigate(url.to_string()));

        let (hang, landing) = {
            let script = self.shared.script.lock();
            let landing = script
                .redirects
                .get(url)
                .cloned()
                .unwrap_or_else(|| url.to_string());
            (script.hang_navigation, landing)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        *self.shared.current_url.lock() = landing;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        {
            let mut script = self.shared.script.lock();
            if script.current_url_failures > 0 {
                script.current_url_failures -= 1;
                return Err(crate::error::DriverError::Protocol {
                    code: 0,
                    message: "execution context was destroyed".into(),
                });
            }
        }
        Ok(self.shared.current_url.lock().clone())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        self.shared
            .calls
            .lock()
            .push(PageCall::WaitForSelector(selector.to_string()));

        let start = tokio::time::Instant::now();
        loop {
            if self.shared.script.lock().selectors.contains(selector) {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(MOCK_POLL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.shared
            .calls
            .lock()
            .push(PageCall::Click(selector.to_string()));
        let target = self.shared.script.lock().click_redirects.get(selector).cloned();
        if let Some(target) = target {
            *self.shared.current_url.lock() = target;
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, char_delay: Duration) -> Result<()> {
        for ch in text.chars() {
            self.shared.calls.lock().push(PageCall::TypeChar {
                selector: selector.to_string(),
                ch,
            });
            tokio::time::sleep(char_delay).await;
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.shared.calls.lock().push(PageCall::Evaluate);
        let script = self.shared.script.lock();
        for handler in &script.eval_handlers {
            if let Some(value) = handler(expression) {
                return Ok(value);
            }
        }
        Ok(Value::Null)
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        self.shared
            .calls
            .lock()
            .push(PageCall::SetCookies(cookies.len()));
        self.shared.cookies.lock().extend_from_slice(cookies);
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        self.shared.calls.lock().push(PageCall::GetCookies);
        Ok(self.shared.cookies.lock().clone())
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> Result<()> {
        self.shared.calls.lock().push(PageCall::UploadFile {
            selector: selector.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.shared.calls.lock().push(PageCall::Close);
        Ok(())
    }
}
