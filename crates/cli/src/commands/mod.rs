mod cookies;
mod login;
mod send;
mod sync;

use anyhow::Result;
use fanbridge_driver::cdp::CdpPage;
use fanbridge_driver::Session;
use fanbridge_protocol::ThreadId;

use crate::cli::{Commands, CookiesAction};
use crate::context::CommandContext;

pub async fn dispatch(command: Commands, ctx: CommandContext) -> Result<()> {
    match command {
        Commands::Login { username } => login::execute(&username, &ctx).await,
        Commands::Sync => sync::execute(&ctx).await,
        Commands::SendText { thread, text } => {
            send::text(&ThreadId(thread), &text, &ctx).await
        }
        Commands::SendMedia {
            thread,
            file,
            caption,
        } => send::media(&ThreadId(thread), &file, caption.as_deref(), &ctx).await,
        Commands::Cookies { action } => match action {
            CookiesAction::Show { file } => {
                cookies::show(file.as_deref().unwrap_or(&ctx.auth_path))
            }
        },
    }
}

/// Launches a browser and wraps it in a session using the context's
/// platform adapter.
async fn open_session(ctx: &CommandContext) -> Result<Session> {
    let page = CdpPage::launch(&ctx.config).await?;
    Ok(Session::with_page(
        Box::new(page),
        ctx.adapter.clone(),
        ctx.config.clone(),
    ))
}

/// Restores a session from the context's cookie jar file.
async fn open_restored_session(ctx: &CommandContext) -> Result<Session> {
    let jar = fanbridge_protocol::CookieJar::from_file(&ctx.auth_path).map_err(|err| {
        anyhow::anyhow!(
            "no usable cookie jar at {} ({err}); run `fanbridge login` first",
            ctx.auth_path.display()
        )
    })?;
    let session = open_session(ctx).await?;
    if let Err(err) = session.restore_cookies(&jar).await {
        session.close().await;
        return Err(err.into());
    }
    Ok(session)
}
