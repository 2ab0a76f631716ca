use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fanbridge")]
#[command(about = "Session driver for the fan-messaging platform")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Cookie jar file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub auth: Option<PathBuf>,

    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Run the browser with a visible window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Explicit browser executable path
    #[arg(long, global = true, value_name = "PATH")]
    pub browser: Option<PathBuf>,

    /// Platform base URL override (staging environments)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in interactively and save the session cookie jar
    Login {
        /// Account email
        #[arg(short, long)]
        username: String,
    },

    /// List unread conversations
    Sync,

    /// Send a text message into a conversation
    SendText {
        /// Conversation id
        thread: String,
        /// Message body
        text: String,
    },

    /// Send a media file into a conversation
    SendMedia {
        /// Conversation id
        thread: String,
        /// Path to the media file
        file: PathBuf,
        /// Optional caption typed into the composer
        #[arg(short, long)]
        caption: Option<String>,
    },

    /// Cookie jar management
    Cookies {
        #[command(subcommand)]
        action: CookiesAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CookiesAction {
    /// Inspect a saved cookie jar
    Show {
        /// Jar file (defaults to --auth / the per-user default)
        file: Option<PathBuf>,
    },
}
