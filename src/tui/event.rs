//! Keyboard event handling for the TUI.
//!
//! Maps crossterm keyboard events to application state changes.
//! Key behavior depends on the focused panel.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Focus};
use crate::editor::Format;

/// Handles a keyboard event and updates the app state accordingly.
///
/// Returns `true` if the application should quit, `false` otherwise.
///
/// # Event Handling
///
/// - `Ctrl+C`: Quit application (from any focus state)
/// - `Tab` / `Shift+Tab`: Cycle focus between panels
/// - `Esc`: Close the editor, or return to search input
/// - When `SearchInput` focused: character input updates the query
/// - When `NoteList` focused: j/k navigation, Enter to edit, `n` new note,
///   `p` pin, `d` delete, `s` cycle sort, `q` quit
/// - When `Editor` focused: typing edits, arrows move, Shift+arrows select,
///   Ctrl+B/I/U format, Alt+1..3 heading, Ctrl+L/Ctrl+O lists, Ctrl+S save
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
/// use inkdrop::{MemoryStore, NoteService, Store};
/// use inkdrop::tui::{App, event::handle_key_event};
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let mut app = App::new(NoteService::new(store), Duration::from_secs(2));
/// let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
/// assert!(handle_key_event(&mut app, key));
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
        return true;
    }

    if key.code == KeyCode::Tab {
        app.next_focus();
        return false;
    }
    if key.code == KeyCode::BackTab {
        app.prev_focus();
        return false;
    }

    if key.code == KeyCode::Esc {
        if app.focus() == Focus::Editor {
            app.close_editor();
        } else {
            app.reset_focus();
        }
        return false;
    }

    match app.focus() {
        Focus::SearchInput => handle_search_input(app, key),
        Focus::NoteList => return handle_note_list(app, key),
        Focus::Editor => handle_editor(app, key),
    }

    false
}

fn is_plain(key: &KeyEvent) -> bool {
    key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if is_plain(&key) => app.push_search_char(c),
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Enter | KeyCode::Down => app.next_focus(),
        _ => {}
    }
}

/// Returns `true` on quit.
fn handle_note_list(app: &mut App, key: KeyEvent) -> bool {
    if !key.modifiers.is_empty() {
        return false;
    }
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Enter => app.open_selected(),
        KeyCode::Char('n') => app.create_note(),
        KeyCode::Char('p') => app.toggle_pin_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('s') => app.cycle_sort(),
        _ => {}
    }
    false
}

fn format_for(key: &KeyEvent) -> Option<Format> {
    let KeyCode::Char(c) = key.code else {
        return None;
    };
    if key.modifiers == KeyModifiers::CONTROL {
        return match c {
            'b' => Some(Format::Bold),
            'i' => Some(Format::Italic),
            'u' => Some(Format::Underline),
            'l' => Some(Format::ListItem),
            'o' => Some(Format::NumberedItem),
            _ => None,
        };
    }
    if key.modifiers == KeyModifiers::ALT {
        return match c {
            '1' => Some(Format::Heading(1)),
            '2' => Some(Format::Heading(2)),
            '3' => Some(Format::Heading(3)),
            _ => None,
        };
    }
    None
}

fn handle_editor(app: &mut App, key: KeyEvent) {
    if let Some(format) = format_for(&key) {
        app.editor_format(format);
        return;
    }
    let extend = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('s') if key.modifiers == KeyModifiers::CONTROL => app.editor_save_now(),
        KeyCode::Char(c) if is_plain(&key) => app.editor_insert(c.encode_utf8(&mut [0; 4])),
        KeyCode::Enter => app.editor_insert("\n"),
        KeyCode::Backspace => app.editor_backspace(),
        KeyCode::Left => app.editor_move(false, extend),
        KeyCode::Right => app.editor_move(true, extend),
        _ => {}
    }
}
