use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ollama_chat_core::{ChatController, Config, OllamaClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser, Debug)]
#[command(name = "ollama-chat", version)]
#[command(about = "Chat with a local Ollama model from the terminal")]
struct Cli {
    /// Base URL of the inference server
    #[arg(long)]
    server_url: Option<String>,
    /// Model name sent with every prompt
    #[arg(short, long)]
    model: Option<String>,
    /// Server-side timeout in seconds, passed as `?timeout=`
    #[arg(long)]
    timeout: Option<u64>,
    /// Config file to read instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where to write logs (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Write the effective settings back to the config file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            server_url: self.server_url.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };
    init_tracing(&log_path)?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load_from(&config_path)?.merged(cli.overrides());
    if cli.save_config {
        config.save_to(&config_path)?;
        info!(path = %config_path.display(), "Saved configuration");
    }

    let settings = config.client_settings();
    info!(
        server_url = %settings.server_url,
        model = %settings.model,
        timeout_secs = settings.timeout_secs,
        "Starting ollama-chat"
    );

    let server_url = settings.server_url.clone();
    let model = settings.model.clone();
    let chat = ChatController::new(Arc::new(OllamaClient::new(settings)), server_url);

    let mut events = EventHandler::new();
    let mut app = App::new(chat, model, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;

    info!("Exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let cache_dir =
        dirs::cache_dir().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("ollama-chat").join("ollama-chat.log"))
}

fn init_tracing(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}
