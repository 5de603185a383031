#![cfg_attr(test, allow(clippy::expect_used))]

mod app;
mod commands;
mod config;
mod scroll;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::ExecutableCommand;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use godlocal_client::{DEFAULT_BASE_URL, GatewayConfig, SessionService};
use godlocal_session::{Persona, default_persona, find_persona, new_session_id};
use godlocal_store::{PreferenceStore, TranscriptArchive};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{Stdout, stdout};
use std::path::{Path, PathBuf};

/// Environment fallback for the backend base URL.
const ENV_BACKEND_URL: &str = "GODLOCAL_BACKEND_URL";
const LOG_FILE: &str = "godlocal.log";

#[derive(Parser, Debug)]
#[command(about = "Terminal session client for the GodLocal gateway", version)]
struct Args {
    /// Backend base URL. Falls back to $GODLOCAL_BACKEND_URL, then the
    /// hosted gateway.
    #[arg(long)]
    backend_url: Option<String>,

    /// Data directory for preferences and the transcript archive.
    /// Defaults to $GODLOCAL_HOME, then ~/.godlocal.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Persona to launch with, overriding the stored preference.
    #[arg(long)]
    persona: Option<String>,

    /// Start in sovereign mode (requires a stored API key).
    #[arg(long)]
    sovereign: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => godlocal_store::data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;
    init_logging(&data_dir)?;
    let file_config = config::load_config(&data_dir)?;

    let base_url = args
        .backend_url
        .or_else(|| {
            std::env::var(ENV_BACKEND_URL)
                .ok()
                .filter(|value| !value.trim().is_empty())
        })
        .or(file_config.backend_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let mut prefs = PreferenceStore::open(&data_dir);
    let archive = TranscriptArchive::open(&data_dir);

    let persona = match args.persona.as_deref() {
        Some(requested) => match find_persona(requested) {
            Some(persona) => persona,
            None => {
                tracing::warn!("unknown persona '{requested}', using stored preference");
                stored_or_default(&prefs, file_config.persona.as_deref())
            }
        },
        None => stored_or_default(&prefs, file_config.persona.as_deref()),
    };
    if args.sovereign {
        prefs.set_sovereign_mode(true);
    }

    let service = SessionService::new(new_session_id(), GatewayConfig::new(base_url))?;
    let mut app = App::new(service, prefs, archive, persona);

    let mut terminal = setup_terminal()?;
    let result = app.run(&mut terminal).await;
    restore_terminal()?;
    result
}

fn stored_or_default(prefs: &PreferenceStore, seed: Option<&str>) -> &'static Persona {
    prefs
        .persona()
        .as_deref()
        .and_then(find_persona)
        .or_else(|| seed.and_then(find_persona))
        .unwrap_or_else(default_persona)
}

/// Log to a file under the data directory; stdout belongs to the UI.
fn init_logging(data_dir: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))
        .with_context(|| format!("open log file in {}", data_dir.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    stdout()
        .execute(EnterAlternateScreen)
        .context("enter alternate screen")?;

    // Put the terminal back before any panic report so the message is
    // readable.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
        default_hook(info);
    }));

    Terminal::new(CrosstermBackend::new(stdout())).context("create terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("disable raw mode")?;
    stdout()
        .execute(LeaveAlternateScreen)
        .context("leave alternate screen")?;
    Ok(())
}
