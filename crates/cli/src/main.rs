use clap::Parser;
use fanbridge_cli::{cli::Cli, commands, context::CommandContext, logging};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let ctx = CommandContext::new(cli.auth, cli.json, cli.headed, cli.browser, cli.base_url);

    if let Err(err) = commands::dispatch(cli.command, ctx).await {
        error!(target = "fanbridge.cli", error = %err, "command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
