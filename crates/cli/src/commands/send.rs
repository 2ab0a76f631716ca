//! Text and media sends.

use std::path::Path;

use anyhow::{bail, Result};
use fanbridge_driver::SendOutcome;
use fanbridge_protocol::ThreadId;
use tracing::info;

use crate::context::CommandContext;

pub async fn text(thread: &ThreadId, text: &str, ctx: &CommandContext) -> Result<()> {
    let session = super::open_restored_session(ctx).await?;
    let result = session.send_text(thread, text).await;
    session.close().await;
    report(thread, result?, ctx)
}

pub async fn media(
    thread: &ThreadId,
    file: &Path,
    caption: Option<&str>,
    ctx: &CommandContext,
) -> Result<()> {
    if !file.is_file() {
        bail!("media file not found: {}", file.display());
    }

    let session = super::open_restored_session(ctx).await?;
    let result = session.send_media(thread, file, caption).await;
    session.close().await;
    report(thread, result?, ctx)
}

fn report(thread: &ThreadId, outcome: SendOutcome, ctx: &CommandContext) -> Result<()> {
    if ctx.json {
        let status = match &outcome {
            SendOutcome::Sent => serde_json::json!({ "thread": thread, "status": "sent" }),
            SendOutcome::Indeterminate { reason } => {
                serde_json::json!({ "thread": thread, "status": "indeterminate", "reason": reason })
            }
        };
        println!("{status}");
    }

    match outcome {
        SendOutcome::Sent => {
            info!(target = "fanbridge.cli", %thread, "send confirmed");
            if !ctx.json {
                println!("Sent to {thread}");
            }
            Ok(())
        }
        SendOutcome::Indeterminate { reason } => {
            // Not retried automatically: a redelivery after an unconfirmed
            // send risks a duplicate message to the subscriber.
            bail!("send to {thread} unconfirmed: {reason}")
        }
    }
}
