mod api;
mod cache;
mod config;
mod format;
mod grouping;
mod models;
mod selection;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use api::SupabaseClient;
use config::Config;
use models::Semester;
use tui::{App, AppSettings};

/// Browse class sections and preview a week of picks.
#[derive(Debug, Parser)]
#[command(name = "section-picker", version, about)]
struct Cli {
    /// Write a default config file and exit
    #[arg(long)]
    init: bool,
    #[arg(long, value_enum)]
    semester: Option<Semester>,
    #[arg(long)]
    year: Option<i32>,
    /// Department abbreviation, e.g. CSC
    #[arg(long)]
    dept: Option<String>,
    /// Course number, e.g. 101
    #[arg(long)]
    course: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.init {
        let path = Config::generate_default()?;
        println!("Generated config file at: {}", path.display());
        println!("Edit it with your Supabase URL and anon key, then run section-picker.");
        return Ok(());
    }

    let config = Config::load().with_context(|| {
        "Failed to load configuration.\n\
         Run `section-picker --init` to generate a config file,\n\
         or set SUPABASE_URL and SUPABASE_ANON_KEY environment variables."
    })?;
    init_logging(&config)?;

    let mut query = config.default_query.clone();
    if let Some(semester) = cli.semester {
        query.semester = semester;
    }
    if let Some(year) = cli.year {
        query.year = year;
    }
    if let Some(dept) = cli.dept {
        query.dept = dept.to_uppercase();
    }
    if let Some(course) = cli.course {
        query.course_number = course;
    }

    let client = SupabaseClient::new(&config.supabase_url, &config.api_key)?;
    let settings = AppSettings {
        stale_after: config.stale_after(),
        ratings_school_id: config.ratings_school_id.clone(),
    };
    tracing::info!(%query, "starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(Arc::new(client), query, settings)).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!(error = %e, "exited with error");
        eprintln!("Error: {e:#}");
    }

    Ok(())
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = Config::log_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(config.tracing_level())
        .init();
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<()> {
    let query = app.query.clone();
    app.set_query(query);

    loop {
        app.frame_count = app.frame_count.wrapping_add(1);
        terminal.draw(|f| tui::ui::render(f, &mut app))?;

        // Redraw faster while the overlay animates.
        let timeout = if app.quick_view.is_animating() {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(100)
        };

        match tui::event::poll_event(timeout)? {
            Some(Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            })) => tui::event::handle_key(&mut app, code, modifiers),
            Some(Event::Resize(..)) => app.handle_resize(),
            _ => {}
        }

        if !app.running {
            break;
        }

        // Apply completed fetches without blocking.
        app.poll_fetch_results();
        app.refresh_if_stale(chrono::Utc::now());
        app.quick_view.tick(Instant::now());
    }

    Ok(())
}
