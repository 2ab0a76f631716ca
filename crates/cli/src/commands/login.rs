//! Interactive login with cookie jar capture.

use anyhow::{bail, Context, Result};
use fanbridge_driver::{Credentials, LoginOutcome};
use tracing::info;

use crate::context::CommandContext;

pub async fn execute(username: &str, ctx: &CommandContext) -> Result<()> {
    let secret = read_secret().await?;
    let credentials = Credentials {
        username: username.to_string(),
        secret,
    };

    info!(target = "fanbridge.cli", %username, "starting login");
    let session = super::open_session(ctx).await?;

    let outcome = match session.login(&credentials).await {
        Ok(outcome) => outcome,
        Err(err) => {
            session.close().await;
            return Err(err.into());
        }
    };

    match outcome {
        LoginOutcome::Authenticated => {
            let jar = session.export_cookies().await?;
            jar.to_file(&ctx.auth_path)
                .with_context(|| format!("saving cookie jar to {}", ctx.auth_path.display()))?;
            session.close().await;

            println!("Logged in as {username}");
            println!("Cookie jar saved to: {}", ctx.auth_path.display());
            println!("  Cookies: {}", jar.len());
            Ok(())
        }
        LoginOutcome::Denied { reason } => {
            session.close().await;
            bail!("login denied: {reason}");
        }
        LoginOutcome::Indeterminate { reason } => {
            session.close().await;
            bail!("login outcome unknown, manual check required: {reason}");
        }
    }
}

/// Takes the account secret from `FANBRIDGE_SECRET`, falling back to a
/// stdin prompt.
async fn read_secret() -> Result<String> {
    if let Ok(secret) = std::env::var("FANBRIDGE_SECRET") {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    eprint!("Password: ");
    let line = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).map(|_| input)
    })
    .await
    .context("stdin reader task failed")??;

    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        bail!("no password provided (set FANBRIDGE_SECRET or type one at the prompt)");
    }
    Ok(secret)
}
