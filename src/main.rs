use std::path::PathBuf;
use std::sync::Arc;

use agentic_chat::agentic::models::conversation::UNKNOWN_AGENT_NAME;
use agentic_chat::agentic::models::{ClipboardItem, ErrorStore, LocalFile};
use agentic_chat::agentic::repositories::{
    BackendRepository, HttpBackendRepository, InMemoryBackendRepository,
};
use agentic_chat::agentic::services::ErrorCollectorLayer;
use agentic_chat::agentic::views::Command;
use agentic_chat::agentic::views::terminal_view::{self, HELP};
use agentic_chat::settings::{
    ClientSettings, ClientSettingsJsonRepository, ClientSettingsRepository, Timings,
};
use agentic_chat::{SessionController, SessionEvent};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ERROR_STORE_CAPACITY: usize = 100;
const ERRORS_SHOWN: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "agentic-chat", version, about = "Chat with domain agents from the terminal")]
struct Args {
    /// Backend base URL, overrides the settings file
    #[arg(long)]
    backend_url: Option<String>,

    /// Settings file to use instead of the per-user default
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Sign in on startup
    #[arg(long, requires = "password")]
    username: Option<String>,

    #[arg(long, requires = "username")]
    password: Option<String>,

    /// Use the built-in demo backend (user `demo`, password `demo`)
    #[arg(long)]
    in_memory: bool,

    /// Skip transition delays
    #[arg(long)]
    fast: bool,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    write_settings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let errors = ErrorStore::new(ERROR_STORE_CAPACITY);
    let (collector, receiver) = ErrorCollectorLayer::new();
    let _drain = ErrorCollectorLayer::drain_into(receiver, errors.clone());

    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(collector)
        .init();

    info!("Starting agentic-chat");

    let repository = match &args.settings {
        Some(path) => ClientSettingsJsonRepository::with_path(path.clone()),
        None => ClientSettingsJsonRepository::new().context("cannot locate settings directory")?,
    };
    let mut settings = match repository.load().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = ?e, path = %repository.path().display(), "Failed to load settings, using defaults");
            ClientSettings::default()
        }
    };
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    if args.write_settings {
        repository
            .save(settings.clone())
            .await
            .context("failed to write settings")?;
        println!("Settings written to {}", repository.path().display());
    }
    if args.fast {
        settings.timings = Timings::immediate();
    }

    let backend: Arc<dyn BackendRepository> = if args.in_memory {
        info!("Using in-memory demo backend");
        Arc::new(InMemoryBackendRepository::demo())
    } else {
        let http = HttpBackendRepository::new(&settings.backend_url, settings.request_timeout())
            .context("invalid backend URL")?;
        info!(backend_url = %http.base_url(), "Using HTTP backend");
        Arc::new(http)
    };

    let controller = SessionController::new(backend, settings);
    let printer = spawn_printer(controller.clone());

    println!("{HELP}");
    if let (Some(username), Some(password)) = (args.username, args.password) {
        controller.set_login_input(username, password);
        controller.login().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => run_command(&controller, &errors, command).await,
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }
    }

    printer.abort();
    info!("Exiting");
    Ok(())
}

fn agent_name(controller: &SessionController) -> String {
    controller
        .selected_agent()
        .map_or_else(|| UNKNOWN_AGENT_NAME.to_string(), |a| a.name)
}

fn spawn_printer(controller: SessionController) -> tokio::task::JoinHandle<()> {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let name = agent_name(&controller);
                    if let Some(line) = terminal_view::render_event(&event, &name) {
                        println!("{line}");
                    }
                    if let SessionEvent::ConversationLoaded {
                        fallback: false, ..
                    } = event
                    {
                        for message in controller.messages() {
                            println!("{}", terminal_view::render_message(&message, &name, false));
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn read_files(paths: &[PathBuf]) -> Vec<LocalFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match LocalFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "Failed to read attachment");
                println!("Cannot read {}: {e}", path.display());
            }
        }
    }
    files
}

async fn run_command(controller: &SessionController, errors: &ErrorStore, command: Command) {
    match command {
        Command::Login { username, password } => {
            controller.set_login_input(username, password);
            controller.login().await;
        }
        Command::Logout => controller.logout(),
        Command::Agents => {
            let selected = controller.selected_agent_id();
            println!(
                "{}",
                terminal_view::render_agents(&controller.agents(), selected.as_deref())
            );
        }
        Command::Agent(id) => {
            if !controller.switch_agent(&id).await {
                println!("Cannot switch to {id}");
            }
        }
        Command::New => controller.new_chat().await,
        Command::History => {
            controller.reload().await;
            let current = controller.current_conversation().map(|c| c.id);
            println!(
                "{}",
                terminal_view::render_conversations(&controller.conversations(), current.as_deref())
            );
        }
        Command::Open(index) => match controller.conversations().get(index) {
            Some(conversation) => {
                controller.select_conversation(conversation).await;
            }
            None => println!("No conversation {}", index + 1),
        },
        Command::Delete(index) => match controller.conversations().get(index) {
            Some(conversation) => {
                controller.delete_conversation(&conversation.id).await;
            }
            None => println!("No conversation {}", index + 1),
        },
        Command::Attach(paths) => {
            let files = read_files(&paths).await;
            controller.add_files(files);
        }
        Command::Paste(paths) => {
            let items = read_files(&paths)
                .await
                .into_iter()
                .map(ClipboardItem::file)
                .collect();
            controller.paste(items);
        }
        Command::Detach(index) => {
            if !controller.remove_attachment(index) {
                println!("No attachment {}", index + 1);
            }
        }
        Command::Private => {
            if !controller.toggle_private() {
                println!("Private mode can only be turned on before the first message");
            }
        }
        Command::Thinking(index) => match controller.messages().get(index) {
            Some(message) if message.thinking.is_some() => {
                let expanded = controller.toggle_thinking(&message.id);
                println!(
                    "{}",
                    terminal_view::render_message(message, &agent_name(controller), expanded)
                );
            }
            _ => println!("Message {} has no thoughts", index + 1),
        },
        Command::Show => {
            let name = agent_name(controller);
            println!(
                "{}",
                terminal_view::render_status(
                    controller.phase(),
                    controller.selected_agent().as_ref(),
                    controller.is_private_mode()
                )
            );
            for message in controller.messages() {
                let expanded = controller.is_thinking_expanded(&message.id);
                println!("{}", terminal_view::render_message(&message, &name, expanded));
            }
            if let Some(thinking) = controller.thinking() {
                println!("  ... {}", thinking.current_thought().unwrap_or_default());
            }
            println!("{}", terminal_view::render_pending(&controller.pending_attachments()));
        }
        Command::Errors => {
            println!(
                "{} errors, {} warnings",
                errors.error_count(),
                errors.warning_count()
            );
            println!("{}", terminal_view::render_errors(&errors.recent(ERRORS_SHOWN)));
        }
        Command::Help => println!("{HELP}"),
        Command::Send(text) => {
            if !controller.is_logged_in() {
                println!("Log in first with /login <user> <pass>");
            } else if !controller.send_text(text) {
                println!("Still sending, try again in a moment");
            }
        }
        Command::Quit => {}
    }
}
