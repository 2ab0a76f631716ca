//! Browser process launch and DevTools endpoint discovery.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use fanbridge_protocol::VersionInfo;
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};

/// Candidate executables probed when no explicit path is configured.
const BROWSER_CANDIDATES: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/opt/google/chrome/chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// A spawned browser process with its DevTools endpoint.
///
/// The child handle is kept so teardown can kill the process even when the
/// page inside it is wedged.
pub struct LaunchedBrowser {
    child: Child,
    profile_dir: PathBuf,
    pub ws_url: String,
    pub port: u16,
}

impl LaunchedBrowser {
    /// Spawns a browser configured for low-observability scraping and waits
    /// for its debugging endpoint to come up.
    ///
    /// Failure here is fatal to the session: the child is killed and no
    /// partial state survives.
    pub async fn spawn(config: &DriverConfig) -> Result<Self> {
        let executable = resolve_executable(config.browser_path.as_deref())?;
        let port = pick_free_port()?;
        let profile_dir = std::env::temp_dir().join(format!(
            "fanbridge-profile-{}-{}",
            std::process::id(),
            port
        ));

        let mut args = vec![
            format!("--remote-debugging-port={port}"),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--window-size={},{}", config.viewport.0, config.viewport.1),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }

        debug!(target = "fanbridge.cdp", executable = %executable.display(), port, "launching browser");

        let mut cmd = Command::new(&executable);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

        let mut child = cmd.spawn().map_err(|e| {
            DriverError::Launch(format!("failed to spawn {}: {e}", executable.display()))
        })?;

        match wait_for_endpoint(&mut child, port).await {
            Ok(info) => {
                debug!(
                    target = "fanbridge.cdp",
                    browser = info.browser.as_deref().unwrap_or("unknown"),
                    ws = %info.web_socket_debugger_url,
                    "devtools endpoint ready"
                );
                Ok(Self {
                    child,
                    profile_dir,
                    ws_url: info.web_socket_debugger_url,
                    port,
                })
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = std::fs::remove_dir_all(&profile_dir);
                Err(err)
            }
        }
    }

    /// Kills the browser process and removes the throwaway profile.
    /// Idempotent: repeat calls are no-ops once the child is reaped.
    pub fn kill(&mut self) {
        if let Err(err) = self.child.kill() {
            if err.kind() != std::io::ErrorKind::InvalidInput {
                warn!(target = "fanbridge.cdp", error = %err, "failed to kill browser process");
            }
        }
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.profile_dir);
    }
}

impl Drop for LaunchedBrowser {
    fn drop(&mut self) {
        self.kill();
    }
}

fn resolve_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(DriverError::Launch(format!(
            "configured browser {} does not exist",
            path.display()
        )));
    }

    BROWSER_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            DriverError::Launch(
                "could not find a Chromium/Chrome executable; set an explicit browser path".into(),
            )
        })
}

fn pick_free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| DriverError::Launch(format!("no free debugging port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| DriverError::Launch(e.to_string()))?
        .port();
    Ok(port)
}

/// Polls `/json/version` until the endpoint answers or the child exits.
async fn wait_for_endpoint(child: &mut Child, port: u16) -> Result<VersionInfo> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(400))
        .build()
        .map_err(|e| DriverError::Launch(format!("failed to build probe client: {e}")))?;

    let url = format!("http://127.0.0.1:{port}/json/version");
    let max_attempts = 50;
    let mut last_error = "endpoint not reachable".to_string();

    for _ in 0..max_attempts {
        tokio::time::sleep(Duration::from_millis(200)).await;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(DriverError::Launch(format!(
                "browser exited before the debugging endpoint came up (status: {status})"
            )));
        }

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                return response
                    .json::<VersionInfo>()
                    .await
                    .map_err(|e| DriverError::Launch(format!("bad /json/version payload: {e}")));
            }
            Ok(response) => last_error = format!("unexpected status {}", response.status()),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(DriverError::Launch(format!(
        "debugging endpoint never became available on port {port}: {last_error}"
    )))
}
