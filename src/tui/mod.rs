//! Terminal user interface.
//!
//! Provides a note list, a detail view or editor pane, and a search input
//! using ratatui for rendering and crossterm for terminal management.

use std::io;
use std::panic;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::service::NoteService;

mod app;
pub mod event;
mod ui;

pub use app::{App, EditorPane, FLUSH_TIMEOUT, Focus, SEARCH_DEBOUNCE};

/// Event poll interval; also the cadence of autosave and search ticks.
const TICK: Duration = Duration::from_millis(100);

/// Enables raw mode and enters the alternate screen.
fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting the TUI, even in error cases,
/// to prevent terminal corruption.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// Minimal terminal restoration for the panic hook. Errors are ignored.
fn restore_terminal_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Installs a panic hook that restores the terminal before the original
/// hook runs.
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal_panic();
        original_hook(panic_info);
    }));
}

/// Runs the event loop until the user quits.
///
/// Pending edits are saved before the terminal is restored.
///
/// # Errors
///
/// Returns an error if event polling, rendering, or terminal operations fail.
/// Terminal state is always restored, even on error.
pub fn run_event_loop(app: &mut App) -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = run_event_loop_internal(app, &mut terminal);
    app.shutdown();

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_event_loop_internal(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        app.tick();

        terminal.draw(|frame| {
            ui::draw(frame, app);
        })?;

        if crossterm_event::poll(TICK)?
            && let Event::Key(key) = crossterm_event::read()?
            && key.kind == KeyEventKind::Press
            && event::handle_key_event(app, key)
        {
            break;
        }
    }

    Ok(())
}

/// Entry point for the TUI application.
///
/// # Errors
///
/// Returns an error if terminal initialization or the event loop fails.
pub fn run(service: NoteService, autosave_idle: Duration) -> Result<()> {
    init_panic_hook();

    let mut app = App::new(service, autosave_idle);
    info!(notes = app.notes().len(), "starting terminal UI");

    run_event_loop(&mut app).context("TUI event loop failed")?;

    Ok(())
}
