//! dmchat - terminal client for a direct-message chat service
//!
//! Keycloak-backed login, a synchronized conversation store, and a realtime
//! event channel, driven from the command line or a full-screen TUI.

mod api;
mod auth;
mod config;
mod models;
mod socket;
mod store;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use models::RawMessage;
use store::ChatStore;

#[derive(Parser)]
#[command(name = "dmchat")]
#[command(about = "Terminal client for direct-message chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with the identity provider
    Login {
        /// Force interactive login even if cached credentials exist
        #[arg(short, long)]
        force: bool,
    },

    /// Discard stored credentials
    Logout,

    /// Report authentication state
    Status,

    /// Show the authenticated user's profile
    Whoami,

    /// List known users
    Users {
        /// Maximum number of users to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// List conversations
    Chats {
        /// Maximum number of conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Read messages from a conversation
    Read {
        /// Conversation ID (from `chats` output)
        room: String,

        /// How many messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send one message and exit
    Send {
        /// Conversation ID (from `chats` output)
        #[arg(short, long)]
        to: String,

        /// Message text
        message: String,
    },

    /// Tail decoded realtime events to stdout
    Listen,

    /// Open the full-screen interface
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login { force } => {
            tracing::info!("Starting device login...");
            auth::login(force).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Users { limit } => {
            api::list_users(limit).await?;
        }
        Commands::Chats { limit } => {
            tracing::info!("Fetching conversations...");
            api::list_chats(limit).await?;
        }
        Commands::Read { room, limit } => {
            api::read_messages(&room, limit).await?;
        }
        Commands::Send { to, message } => {
            send_message(&to, &message).await?;
        }
        Commands::Listen => {
            let session = auth::Session::load()?;
            socket::listen(session.socket_url()).await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
    }

    Ok(())
}

/// One-shot send: resolve the counterpart for the room over REST, then emit
/// the message over the realtime channel and wait for the server echo.
async fn send_message(room: &str, text: &str) -> Result<()> {
    let client = api::ApiClient::new().await?;
    let subject_id = client
        .session()
        .subject_id()
        .context("Not logged in. Run 'dmchat login' first.")?;

    let records = api::fetch_conversations(&client).await?;
    let mut store = ChatStore::new();
    store.replace_all(&records, &subject_id);

    let conv = store
        .conversations()
        .iter()
        .find(|c| c.id == room)
        .with_context(|| format!("No conversation with id '{}'", room))?;
    let to = conv
        .user_id
        .clone()
        .context("Conversation has no known counterpart yet")?;

    let msg = RawMessage::outgoing_text(text, &subject_id, Some(&to), room);
    socket::send_once(client.session().socket_url(), msg).await?;
    println!("Message sent to {}.", conv.name);
    Ok(())
}
