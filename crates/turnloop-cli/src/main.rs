//! turnloop CLI — a thin, single-process REPL over the agent runtime.
//!
//! Unlike a daemon/client split, this binary owns the orchestrator
//! directly: one process, one session, one terminal.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod dirs;
mod repl;
mod theme;
mod wiring;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use turnloop_events::{ContentBlockType, Event, EventType};

use config::CliConfig;
use dirs::TurnloopHome;
use repl::{ReadlineEvent, ReplEditor};
use theme::Theme;

/// turnloop — a local-first conversational agent runtime.
#[derive(Parser)]
#[command(name = "turnloop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default).
    Chat,
    /// Scaffold `~/.turnloop/config.yaml` and `capabilities.yaml` without
    /// starting a session.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let home = TurnloopHome::resolve()?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Init => {
            let config = CliConfig::load_or_init(&home)?;
            println!("{}", Theme::success(&format!("Initialized {}", home.root().display())));
            println!("  model: {}", config.model.model);
            Ok(())
        }
        Commands::Chat => run_chat(&home).await,
    }
}

async fn run_chat(home: &TurnloopHome) -> anyhow::Result<()> {
    let config = CliConfig::load_or_init(home)?;
    if CliConfig::api_key().is_err() {
        eprintln!(
            "{}",
            Theme::error("TURNLOOP_API_KEY is not set. Export it before starting a chat session.")
        );
        anyhow::bail!("missing API key");
    }

    let workspace_root = std::env::current_dir()?;
    let mut runtime = wiring::build(&config, home, workspace_root)?;

    println!(
        "Session {} | Type {} to quit, {} for commands\n",
        runtime.session.id.to_string().dimmed(),
        "exit".cyan(),
        "/help".cyan()
    );

    let mut event_rx = runtime.event_storage.subscribe(&runtime.session.id);
    runtime.broadcaster.session_start(&runtime.session.id).await;
    let render_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => render_event(&event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut editor = ReplEditor::new(home.history_path())?;

    loop {
        let input = match editor.readline() {
            ReadlineEvent::Line(line) => line,
            ReadlineEvent::Interrupted => continue,
            ReadlineEvent::Eof => {
                println!("{}", Theme::dimmed("Goodbye!"));
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            println!("{}", Theme::dimmed("Goodbye!"));
            break;
        }
        if let Some(rest) = input.strip_prefix('/') {
            handle_slash_command(rest, &runtime);
            continue;
        }

        // A fresh token per turn: once tripped, a `CancellationToken` never
        // un-cancels, so the next turn needs its own.
        runtime.session.cancel_token = CancellationToken::new();
        let stop_on_ctrl_c = tokio::spawn({
            let token = runtime.session.cancel_token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            }
        });

        if let Err(err) = runtime
            .orchestrator
            .run_turn(&mut runtime.session, &runtime.tool_ctx, input)
            .await
        {
            println!("\n{}", Theme::error(&err.to_string()));
        }
        stop_on_ctrl_c.abort();
        println!();
    }

    render_handle.abort();
    Ok(())
}

fn render_event(event: &Event) {
    match &event.event_type {
        EventType::ContentDelta { text, .. } => {
            print!("{text}");
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }
        EventType::ContentStart {
            block_type: ContentBlockType::ToolUse,
            ..
        } => {
            print!(" {} ", Theme::tool_marker());
        }
        EventType::Error { message, .. } => {
            println!("\n{}", Theme::error(message));
        }
        EventType::SessionStopped { reason } => {
            println!("\n{}", Theme::dimmed(&format!("Stopped ({reason}).")));
        }
        EventType::Done => {
            println!();
        }
        _ => {}
    }
}

fn handle_slash_command(command: &str, runtime: &wiring::Runtime) {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "help" => print_help(),
        "clear" => {
            print!("\x1B[2J\x1B[1;1H");
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }
        "plan" => match runtime.plan_manager.get(&runtime.session.id) {
            Some(plan) => println!("\n{}", turnloop_plan::render_markdown(&plan)),
            None => println!("\n{}", Theme::dimmed("No plan for this session yet.")),
        },
        "skills" => {
            let skills = runtime.capabilities.find_by_kind(turnloop_capabilities::CapabilityKind::Skill);
            if skills.is_empty() {
                println!("\n{}", Theme::dimmed("No skills registered."));
            } else {
                println!("\n{}", Theme::header("Skills"));
                for skill in skills {
                    println!("  {} ({})", skill.name, skill.subtype);
                }
            }
        }
        "tools" => {
            let tools = runtime.capabilities.find_by_kind(turnloop_capabilities::CapabilityKind::Tool);
            if tools.is_empty() {
                println!("\n{}", Theme::dimmed("No tools registered."));
            } else {
                println!("\n{}", Theme::header("Tools"));
                for tool in tools {
                    println!("  {} ({})", tool.name, tool.provider);
                }
            }
        }
        other => println!("{}", Theme::warning(&format!("Unknown command: /{other}. Type /help."))),
    }
    println!();
}

fn print_help() {
    println!("\n{}", Theme::header("Available Commands"));
    println!("  {}    Show this help", "/help".cyan());
    println!("  {}   Clear the screen", "/clear".cyan());
    println!("  {}    Show the current plan", "/plan".cyan());
    println!("  {}  List registered skills", "/skills".cyan());
    println!("  {}   List registered tools", "/tools".cyan());
    println!("  {}    Exit the chat", "exit".cyan());
}
