use std::path::PathBuf;

use fanbridge_driver::{DriverConfig, PlatformAdapter};

/// Resolved settings shared by every command.
pub struct CommandContext {
    pub auth_path: PathBuf,
    pub json: bool,
    pub config: DriverConfig,
    pub adapter: PlatformAdapter,
}

impl CommandContext {
    pub fn new(
        auth: Option<PathBuf>,
        json: bool,
        headed: bool,
        browser: Option<PathBuf>,
        base_url: Option<String>,
    ) -> Self {
        let config = DriverConfig::default()
            .with_headless(!headed)
            .with_browser_path(browser);
        let adapter = match base_url {
            Some(url) => PlatformAdapter::new(url),
            None => PlatformAdapter::default(),
        };
        Self {
            auth_path: auth.unwrap_or_else(default_auth_path),
            json,
            config,
            adapter,
        }
    }
}

/// `~/.config/fanbridge/cookies.json`, or the working directory when no
/// config directory exists.
fn default_auth_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("fanbridge").join("cookies.json"))
        .unwrap_or_else(|| PathBuf::from("cookies.json"))
}
