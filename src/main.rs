//! search-chat - terminal client for a search-augmented chat backend
//!
//! Streams each assistant turn as server-sent events, folding text and
//! search-tool progress into a live transcript.

mod backend;
mod config;
mod continuation;
mod decoder;
mod render;
mod session;
mod state_machine;
mod transcript;

use backend::{ChatBackend, HttpBackend};
use clap::{Parser, Subcommand};
use config::{ClientConfig, ConnectionOpts};
use render::{render_entry, ProgressPrinter};
use session::{ChatSession, SessionError};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "search-chat", version, about = "Chat with a search-augmented assistant")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the threads known to the backend
    Threads,

    /// Interactive chat; each line read from stdin is one turn
    Chat {
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
    },

    /// Ask a single question and print the reply
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.connection.resolve()?;
    tracing::debug!(backend_url = %config.backend_url, "Configuration resolved");

    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&config)?);

    match cli.command {
        Command::Threads => {
            for thread in backend.thread_list().await? {
                println!("{thread}");
            }
        }
        Command::Chat { thread } => {
            let session = open_session(backend, &config, thread.as_deref()).await?;
            for entry in session.transcript().entries() {
                println!("{}", render_entry(entry));
            }
            chat_loop(&session).await?;
        }
        Command::Ask { text, thread } => {
            let session = open_session(backend, &config, thread.as_deref()).await?;
            stream_turn(&session, &text.join(" ")).await?;
            if let Some(token) = session.continuation() {
                eprintln!("thread: {token}");
            }
        }
    }

    Ok(())
}

async fn open_session(
    backend: Arc<dyn ChatBackend>,
    config: &ClientConfig,
    thread: Option<&str>,
) -> Result<ChatSession, Box<dyn Error>> {
    match thread {
        Some(thread_id) => Ok(ChatSession::resume(backend, config, thread_id).await?),
        None => Ok(ChatSession::new(backend, config)),
    }
}

async fn chat_loop(session: &ChatSession) -> Result<(), Box<dyn Error>> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match stream_turn(session, &line).await {
            Ok(()) => {}
            Err(e) if e.downcast_ref::<SessionError>() == Some(&SessionError::EmptyInput) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Run one turn, printing the reply as it streams. Ctrl-C cancels the turn.
async fn stream_turn(session: &ChatSession, input: &str) -> Result<(), Box<dyn Error>> {
    let mut snapshots = session.subscribe();
    let handle = session.start_turn(input)?;
    let entry_id = handle.entry_id().clone();

    let mut printer = ProgressPrinter::new();
    let mut stdout = std::io::stdout();
    while !printer.is_finished() {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let entry = snapshots.borrow_and_update().get(&entry_id).cloned();
                if let Some(entry) = entry {
                    printer.update(&entry, &mut stdout)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(entry_id = %entry_id, "Interrupted, cancelling turn");
                session.cancel_turn();
            }
        }
    }

    handle.finished().await;
    Ok(())
}
