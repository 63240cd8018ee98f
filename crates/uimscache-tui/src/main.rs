//! uimscache - an offline-first terminal dashboard for UIMS.
//!
//! Shows attendance and timetable for the signed-in student, reusing
//! locally cached data for five minutes before fetching again.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use uimscache_core::api::{ApiClient, Credentials};
use uimscache_core::auth::{CredentialStore, Session};
use uimscache_core::config::Config;
use uimscache_core::storage::FileStore;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "uimscache.log";

/// Initialize the tracing subscriber for logging.
///
/// The TUI owns the terminal, so logs go to a daily file in `log_dir`.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_default();
    let cache_dir = config
        .cache_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("./cache"));
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;
    let _log_guard = init_tracing(&cache_dir);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--login" {
        return login_cli(config, &cache_dir).await;
    }
    if args.len() > 1 && args[1] == "--logout" {
        return logout_cli(&cache_dir);
    }

    info!("uimscache starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new() {
        Ok(mut app) => match app.activate() {
            Ok(()) => run_app(&mut terminal, &mut app).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("uimscache shutting down");
    Ok(())
}

/// Sign in from the command line without starting the TUI
async fn login_cli(mut config: Config, cache_dir: &Path) -> Result<()> {
    print!("UID: ");
    io::stdout().flush()?;
    let mut uid = String::new();
    io::stdin().read_line(&mut uid)?;
    let uid = uid.trim().to_string();
    if uid.is_empty() {
        anyhow::bail!("UID is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    let credentials = Credentials {
        uid: uid.clone(),
        password,
    };

    let api = ApiClient::new(config.api_base_url())?;
    api.verify(&credentials)
        .await
        .context("Could not sign in to UIMS")?;

    CredentialStore::save(&credentials)?;
    let store = FileStore::open(cache_dir)?;
    Session::sign_in(&store, &uid)?;

    config.last_uid = Some(uid.clone());
    config.save()?;

    println!("Signed in as {}", uid);
    Ok(())
}

/// Clear the session, cached data and stored password
fn logout_cli(cache_dir: &Path) -> Result<()> {
    let store = FileStore::open(cache_dir)?;
    match Session::uid(&store)? {
        Some(uid) => {
            if let Err(e) = CredentialStore::forget(&uid) {
                eprintln!("Note: no stored password removed ({})", e);
            }
            Session::sign_out(&store)?;
            println!("Signed out {}", uid);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply whatever the fetch collaborator has delivered
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
