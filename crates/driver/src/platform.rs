//! Platform adapter: every selector, URL, and classification heuristic in
//! one place.
//!
//! The external platform's web UI is unversioned; any upstream change can
//! break scraping. Centralizing the fragile parts here means UI drift is
//! fixed by updating one adapter value, not by touching call sites. Custom
//! adapters are also how tests and alternate deployments configure the
//! driver.

use fanbridge_protocol::ThreadId;

/// How a post-navigation landing URL classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingClass {
    /// Inside the authenticated area.
    Authenticated,
    /// On the login/logged-out surface.
    LoginSurface,
    /// Neither: an interstitial the driver does not understand
    /// (CAPTCHA, 2FA, maintenance page).
    Unknown,
}

/// DOM selectors the driver interacts with.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub login_username: String,
    pub login_secret: String,
    pub login_submit: String,
    pub chat_item: String,
    pub unread_badge: String,
    pub chat_username: String,
    pub chat_excerpt: String,
    pub chat_avatar: String,
    pub thread_id_attr: String,
    pub composer: String,
    pub send_button: String,
    pub file_input: String,
}

/// URL construction and landing classification for one platform deployment.
#[derive(Debug, Clone)]
pub struct PlatformAdapter {
    base_url: String,
    inbox_path: String,
    thread_path_prefix: String,
    /// Path prefixes that only render when authenticated. Matching one of
    /// these after login is a heuristic, not a structural guarantee.
    auth_path_prefixes: Vec<String>,
    /// Path fragments that identify the logged-out/login surface.
    login_path_markers: Vec<String>,
    pub selectors: Selectors,
}

impl Default for PlatformAdapter {
    fn default() -> Self {
        Self {
            base_url: "https://onlyfans.com".to_string(),
            inbox_path: "/my/chats".to_string(),
            thread_path_prefix: "/my/chats/chat/".to_string(),
            auth_path_prefixes: vec!["/my/".to_string(), "/home".to_string()],
            login_path_markers: vec!["/login".to_string()],
            selectors: Selectors {
                login_username: r#"input[name="email"]"#.to_string(),
                login_secret: r#"input[name="password"]"#.to_string(),
                login_submit: r#"button[type="submit"]"#.to_string(),
                chat_item: r#"[data-test="chat-item"]"#.to_string(),
                unread_badge: r#"[data-test="unread-badge"]"#.to_string(),
                chat_username: r#"[data-test="username"]"#.to_string(),
                chat_excerpt: r#"[data-test="last-message"]"#.to_string(),
                chat_avatar: "img".to_string(),
                thread_id_attr: "data-thread-id".to_string(),
                composer: r#"[data-test="message-input"]"#.to_string(),
                send_button: r#"[data-test="send-button"]"#.to_string(),
                file_input: r#"input[type="file"]"#.to_string(),
            },
        }
    }
}

impl PlatformAdapter {
    /// Builds an adapter for a non-default deployment (or a test fixture).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn root_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn inbox_url(&self) -> String {
        format!("{}{}", self.base_url, self.inbox_path)
    }

    pub fn thread_url(&self, thread: &ThreadId) -> String {
        format!("{}{}{}", self.base_url, self.thread_path_prefix, thread)
    }

    /// Classifies a landing URL after login or an authenticated navigation.
    pub fn classify_landing(&self, landing_url: &str) -> LandingClass {
        let path = match url::Url::parse(landing_url) {
            Ok(parsed) => parsed.path().to_string(),
            // Not even a URL: nothing we can claim about it.
            Err(_) => return LandingClass::Unknown,
        };

        if self
            .login_path_markers
            .iter()
            .any(|marker| path.starts_with(marker.as_str()))
        {
            return LandingClass::LoginSurface;
        }
        if self
            .auth_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return LandingClass::Authenticated;
        }
        LandingClass::Unknown
    }

    /// True when a navigation ended up back on the logged-out surface,
    /// which means the server invalidated the session.
    pub fn is_login_surface(&self, landing_url: &str) -> bool {
        self.classify_landing(landing_url) == LandingClass::LoginSurface
    }

    /// JavaScript that extracts one record per unread-marked chat item.
    ///
    /// Evaluated with `returnByValue`, so it must produce plain JSON data.
    pub fn unread_scan_script(&self) -> String {
        let s = &self.selectors;
        format!(
            r#"(() => {{
  const items = document.querySelectorAll('{chat_item}');
  const results = [];
  items.forEach((item) => {{
    if (!item.querySelector('{unread_badge}')) return;
    const name = item.querySelector('{username}')?.textContent || '';
    const avatar = item.querySelector('{avatar}')?.getAttribute('src') || '';
    const excerpt = item.querySelector('{excerpt}')?.textContent || '';
    const threadId = item.getAttribute('{thread_attr}') || '';
    results.push({{
      name: name.trim(),
      avatar: avatar,
      excerpt: excerpt.trim(),
      threadId: threadId,
    }});
  }});
  return results;
}})()"#,
            chat_item = s.chat_item,
            unread_badge = s.unread_badge,
            username = s.chat_username,
            avatar = s.chat_avatar,
            excerpt = s.chat_excerpt,
            thread_attr = s.thread_id_attr,
        )
    }

    /// JavaScript predicate: true once the composer is empty again, the
    /// positive signal that the platform accepted a send.
    pub fn composer_cleared_script(&self) -> String {
        format!(
            r#"(() => {{
  const el = document.querySelector('{composer}');
  if (!el) return false;
  const text = el.value !== undefined ? el.value : el.textContent;
  return (text || '').trim().length === 0;
}})()"#,
            composer = self.selectors.composer,
        )
    }

    /// JavaScript predicate: true once the file input holds no pending
    /// files, the positive signal that a media send was accepted.
    pub fn upload_cleared_script(&self) -> String {
        format!(
            r#"(() => {{
  const el = document.querySelector('{file_input}');
  if (!el) return true;
  return !el.files || el.files.length === 0;
}})()"#,
            file_input = self.selectors.file_input,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_prefixes_match() {
        let adapter = PlatformAdapter::default();
        assert_eq!(
            adapter.classify_landing("https://onlyfans.com/my/home"),
            LandingClass::Authenticated
        );
        assert_eq!(
            adapter.classify_landing("https://onlyfans.com/home"),
            LandingClass::Authenticated
        );
    }

    #[test]
    fn login_surface_wins_over_unknown() {
        let adapter = PlatformAdapter::default();
        assert_eq!(
            adapter.classify_landing("https://onlyfans.com/login?error=1"),
            LandingClass::LoginSurface
        );
        assert!(adapter.is_login_surface("https://onlyfans.com/login"));
    }

    #[test]
    fn interstitials_are_unknown() {
        let adapter = PlatformAdapter::default();
        assert_eq!(
            adapter.classify_landing("https://onlyfans.com/captcha-check"),
            LandingClass::Unknown
        );
        assert_eq!(adapter.classify_landing("not a url"), LandingClass::Unknown);
    }

    #[test]
    fn thread_url_embeds_id() {
        let adapter = PlatformAdapter::default();
        let url = adapter.thread_url(&ThreadId::from("t-42"));
        assert_eq!(url, "https://onlyfans.com/my/chats/chat/t-42");
    }

    #[test]
    fn custom_base_url_is_trimmed() {
        let adapter = PlatformAdapter::new("https://staging.example.com/");
        assert_eq!(adapter.root_url(), "https://staging.example.com/");
        assert_eq!(adapter.inbox_url(), "https://staging.example.com/my/chats");
    }

    #[test]
    fn scan_script_embeds_selectors() {
        let adapter = PlatformAdapter::default();
        let script = adapter.unread_scan_script();
        assert!(script.contains(r#"[data-test="chat-item"]"#));
        assert!(script.contains("data-thread-id"));
    }
}
