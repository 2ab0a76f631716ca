//! Cookie records and the exportable cookie jar.

use serde::{Deserialize, Serialize};

/// A single HTTP cookie as reported by the browser.
///
/// Field names serialize in camelCase so the record round-trips directly
/// through `Network.getCookies` / `Network.setCookie` CDP params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as seconds since the Unix epoch. `None` or a negative value
    /// means a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl Cookie {
    /// Returns true when the cookie carries an expiry in the past.
    pub fn is_expired(&self, now_secs: f64) -> bool {
        matches!(self.expires, Some(ts) if ts >= 0.0 && ts < now_secs)
    }
}

/// An ordered set of cookies representing one authenticated session.
///
/// Jars are deep copies of live browser state; mutating an exported jar
/// never affects the session it came from. Jars persist as plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieJar {
    pub cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Loads a jar from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(std::io::Error::other)
    }

    /// Writes the jar to a JSON file, creating parent directories.
    pub fn to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, data)
    }
}
