//! CraneBot binary - composition root.
//!
//! 1. Parse CLI flags and initialize tracing
//! 2. Load configuration from TOML (or write it with `--init-config`)
//! 3. Start a chat session with the built-in rule table
//! 4. Run an interactive shell on stdin until `/quit` or EOF

mod cli;
mod shell;

use std::path::Path;
use std::sync::{Arc, Weak};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use cranebot_chat::{Author, ChatSession, ResponseResolver};
use cranebot_core::config::CraneBotConfig;
use cranebot_core::events::DomainEvent;
use cranebot_core::Result;

use cli::CliArgs;
use shell::{parse_command, pick_quick_reply, Command, HELP};

fn print_replies(replies: &[String]) {
    for (i, reply) in replies.iter().enumerate() {
        println!("  [#{}] {}", i + 1, reply);
    }
}

/// Print bot replies as they arrive.
///
/// Holds only a weak handle so the session can still be dropped.
async fn render_loop(session: Weak<ChatSession>, mut events: broadcast::Receiver<DomainEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind; some events were skipped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let DomainEvent::MessageAppended {
            message_id,
            author: Author::Bot,
            ..
        } = event
        else {
            continue;
        };
        let Some(session) = session.upgrade() else {
            break;
        };
        let state = match session.snapshot() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "Cannot read session state");
                break;
            }
        };

        if !state.is_visible() {
            println!("(CraneBot replied · {} unread · /open to read)", state.unseen_reply_count());
            continue;
        }
        if let Some(msg) = state.message(message_id) {
            println!("\nCraneBot: {}", msg.text);
            print_replies(&state.quick_replies());
        }
    }
}

fn show_transcript(session: &ChatSession) -> Result<()> {
    let state = session.snapshot()?;
    for msg in state.messages() {
        let who = match msg.author {
            Author::User => "You",
            Author::Bot => "CraneBot",
        };
        println!("{}: {}", who, msg.text);
    }
    print_replies(&state.quick_replies());
    Ok(())
}

/// The session transcript as pretty JSON.
fn export_transcript(session: &ChatSession) -> Result<String> {
    Ok(serde_json::to_string_pretty(&session.snapshot()?)?)
}

/// Config file (or defaults), then flag overrides, then validation.
fn load_config(args: &CliArgs, path: &Path) -> Result<CraneBotConfig> {
    let mut config = CraneBotConfig::load_or_default(path);
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn submit(session: &ChatSession, text: &str) {
    match session.submit(text) {
        Ok(Some(_)) => println!("CraneBot is typing..."),
        Ok(None) => {}
        Err(e) => println!("! {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Tracing. The filter is reloadable so the config file's level can apply
    // once the file has been read.
    let log_override = args.log_filter_override();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter(log_override.as_deref().unwrap_or("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting CraneBot v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let config = load_config(&args, &config_file)?;
    if log_override.is_none() {
        if let Err(e) = filter_handle.reload(env_filter(&config.general.log_level)) {
            tracing::warn!(error = %e, "Failed to apply configured log level");
        }
    }

    if args.init_config {
        config.save(&config_file)?;
        println!("Wrote {}", config_file.display());
        return Ok(());
    }

    let session = Arc::new(ChatSession::start(&config.chat, ResponseResolver::builtin()));
    let renderer = tokio::spawn(render_loop(Arc::downgrade(&session), session.subscribe()));

    println!("CraneBot ready. Type /help for commands.");
    if session.snapshot()?.is_visible() {
        show_transcript(&session)?;
    } else {
        println!("(chat is collapsed · /open to expand)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Say(text) => submit(&session, &text),
            Command::QuickReply(n) => {
                let replies = session.quick_replies()?;
                match pick_quick_reply(&replies, n) {
                    Some(reply) => {
                        println!("You: {}", reply);
                        submit(&session, reply);
                    }
                    None => println!("! no quick reply #{}", n),
                }
            }
            Command::Open => {
                session.open()?;
                show_transcript(&session)?;
            }
            Command::Close => {
                session.collapse()?;
                println!("(chat collapsed)");
            }
            Command::Replies => {
                let replies = session.quick_replies()?;
                if replies.is_empty() {
                    println!("(no quick replies)");
                } else {
                    print_replies(&replies);
                }
            }
            Command::Export => println!("{}", export_transcript(&session)?),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(cmd) => println!("! unknown command {} (try /help)", cmd),
        }
    }

    session.close()?;
    drop(session);
    if let Err(e) = renderer.await {
        tracing::warn!(error = %e, "Renderer task failed");
    }
    tracing::info!("CraneBot stopped");
    Ok(())
}
