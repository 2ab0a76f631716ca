//! Unread inbox listing.

use anyhow::Result;
use fanbridge_protocol::InboundMessage;

use crate::context::CommandContext;

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let session = super::open_restored_session(ctx).await?;
    let result = session.fetch_unread_threads().await;
    session.close().await;
    let unread = result?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&unread)?);
        return Ok(());
    }
    print_threads_table(&unread);
    Ok(())
}

fn print_threads_table(unread: &[InboundMessage]) {
    if unread.is_empty() {
        println!("No unread conversations");
        return;
    }

    println!("{:<16} {:<20} {:<40}", "THREAD", "FROM", "LAST MESSAGE");
    println!("{}", "-".repeat(76));
    for msg in unread {
        // Excerpts are user text; truncate on char boundaries.
        let excerpt = if msg.excerpt.chars().count() > 37 {
            let head: String = msg.excerpt.chars().take(37).collect();
            format!("{head}...")
        } else {
            msg.excerpt.clone()
        };
        println!(
            "{:<16} {:<20} {:<40}",
            msg.thread_id, msg.subscriber_name, excerpt
        );
    }
    println!();
    println!("Total: {} unread", unread.len());
}
