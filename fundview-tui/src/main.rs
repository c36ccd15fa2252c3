//! Fundview TUI binary.
//!
//! `fundview-tui [--demo] [--config PATH]`. Logs go to
//! `<state dir>/fundview/fundview.log`, filtered by `FUNDVIEW_LOG`.

use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use fundview_core::api::{Backend, HttpBackend, ScriptedBackend};
use fundview_core::{Session, Settings};
use fundview_tui::persistence::{self, Preferences};
use fundview_tui::{AppState, input, ui};

#[derive(Parser)]
#[command(name = "fundview-tui", about = "Fund management dashboard in the terminal")]
struct Args {
    /// Use the built-in scripted backend instead of the HTTP server
    #[arg(long)]
    demo: bool,

    /// Settings file (default: <config dir>/fundview/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("fundview.log"))?;
    let filter = EnvFilter::try_from_env("FUNDVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let args = Args::parse();
    let state_dir = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fundview");
    init_logging(&state_dir)?;

    let prefs_path = persistence::default_path();
    let prefs = persistence::load(&prefs_path);
    let mut settings = Settings::load(args.config.as_deref())?;
    prefs.apply_to(&mut settings);
    tracing::info!(base_url = %settings.base_url, demo = args.demo, "starting");

    if args.demo {
        run(ScriptedBackend::demo(), &settings, &prefs, &prefs_path)
    } else {
        run(HttpBackend::new(&settings)?, &settings, &prefs, &prefs_path)
    }
}

fn run<B: Backend + 'static>(
    backend: B,
    settings: &Settings,
    prefs: &Preferences,
    prefs_path: &Path,
) -> Result<()> {
    let session = Session::with_pool(backend, settings);
    let mut app = AppState::new(session, prefs);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    if let Err(e) = persistence::save(prefs_path, &app.preferences()) {
        tracing::warn!(error = %e, "could not save preferences");
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState<B>,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Apply finished requests (non-blocking)
        app.tick();

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}
