//! PawPal messages entry point.
//!
//! Drives the inbox and chat view-models from the terminal.

mod views;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pawpal_api::{HttpMessageService, MessageService};
use pawpal_messages::constants::storage::STORE_FILE_NAME;
use pawpal_messages::{
    fl, Config, InboxViewModel, JsonFileStore, KeyValueStore, SendError, SessionProvider,
    StaticSession, ThreadRoute, ThreadViewModel,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "pawpal-messages", version, about = "PawPal direct messages in the terminal")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the conversation list. Press Enter to retry after an error.
    Inbox {
        /// Only show conversations matching this username or pet name
        #[arg(long)]
        search: Option<String>,
    },
    /// Watch one conversation. Each line typed is sent as a message.
    Thread {
        /// Id of the other user
        #[arg(long = "with")]
        other_party_id: String,
        /// Id of the pet the conversation is about
        #[arg(long)]
        pet: i64,
        /// Username of the other user
        #[arg(long)]
        username: Option<String>,
        /// Name of the pet
        #[arg(long)]
        pet_name: Option<String>,
    },
    /// Send a single message.
    Send {
        /// Id of the other user
        #[arg(long = "with")]
        other_party_id: String,
        /// Id of the pet the conversation is about
        #[arg(long)]
        pet: i64,
        /// Username of the recipient
        #[arg(long)]
        to: String,
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
}

/// Collaborators shared by every screen.
struct App {
    service: Arc<dyn MessageService>,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn KeyValueStore>,
    config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pawpal_messages=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    pawpal_messages::i18n::init(&requested_languages);

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    let service = HttpMessageService::new(&config.api_base_url, config.auth_token.clone())
        .context("Failed to create API client")?;
    let session = match (&config.user_id, &config.username) {
        (Some(id), Some(username)) => StaticSession::signed_in(id.clone(), username.clone()),
        _ => {
            tracing::warn!("No user_id/username configured, running signed out");
            StaticSession::signed_out()
        }
    };
    let store = JsonFileStore::new(config.data_dir().join(STORE_FILE_NAME));

    let app = App {
        service: Arc::new(service),
        session: Arc::new(session),
        store: Arc::new(store),
        config,
    };

    tracing::info!("Starting PawPal messages");
    match cli.command {
        Command::Inbox { search } => run_inbox(&app, search.as_deref()).await,
        Command::Thread {
            other_party_id,
            pet,
            username,
            pet_name,
        } => {
            let mut route = ThreadRoute::new(other_party_id, pet);
            route.other_username = username;
            route.pet_name = pet_name;
            run_thread(&app, route).await
        }
        Command::Send {
            other_party_id,
            pet,
            to,
            message,
        } => {
            let route = ThreadRoute::new(other_party_id, pet).with_username(to);
            run_send(&app, route, &message.join(" ")).await
        }
    }
}

async fn run_inbox(app: &App, search: Option<&str>) -> Result<()> {
    let inbox = InboxViewModel::new(
        Arc::clone(&app.service),
        Arc::clone(&app.session),
        Arc::clone(&app.store),
    )
    .with_poll_interval(app.config.poll_interval())
    .with_record_max_age(app.config.last_conversation_max_age());

    let mut updates = inbox.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    inbox.activate().await;

    loop {
        let state = inbox.state();
        let conversations = inbox.search(search.unwrap_or_default());
        let fallback = inbox.fallback_conversation();
        println!("{}", views::render_inbox(&state, &conversations, fallback.as_ref()));

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(_) if inbox.state().error.is_some() => inbox.retry().await,
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    inbox.deactivate();
    Ok(())
}

async fn run_thread(app: &App, route: ThreadRoute) -> Result<()> {
    let thread = ThreadViewModel::new(
        Arc::clone(&app.service),
        Arc::clone(&app.session),
        Arc::clone(&app.store),
        route,
    )
    .with_poll_interval(app.config.poll_interval());

    if !thread.is_valid() {
        anyhow::bail!("A conversation needs both a user id and a pet id");
    }

    let mut updates = thread.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    thread.activate().await;

    loop {
        let current_user = app.session.current_user();
        println!(
            "{}",
            views::render_thread(&thread.state(), &thread.grouped(), current_user.as_ref())
        );

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                thread.dismiss_notice();
                match thread.send(&line).await {
                    Ok(_) | Err(SendError::Api(_)) => {}
                    Err(SendError::Invalid(reason)) => {
                        eprintln!("{}", fl!("not-sent", reason = reason.to_string()))
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    thread.deactivate();
    Ok(())
}

async fn run_send(app: &App, route: ThreadRoute, content: &str) -> Result<()> {
    let thread = ThreadViewModel::new(
        Arc::clone(&app.service),
        Arc::clone(&app.session),
        Arc::clone(&app.store),
        route,
    );

    let message = thread.send(content).await.context("Message not sent")?;
    thread.deactivate();
    println!("Sent message {}", message.id);
    Ok(())
}
