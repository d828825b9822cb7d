//! UI rendering functions for the TUI.
//!
//! Lays out the search bar, the note list, the detail or editor pane, and the
//! shortcut bar using ratatui widgets.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use time::OffsetDateTime;
use time::macros::format_description;

use super::app::{App, EditorPane, Focus};
use crate::models::Note;
use crate::pipeline::{plain_text, preview};

const PREVIEW_CHARS: usize = 40;

/// Draws the whole screen for the current app state.
pub fn draw(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Min(0),    // Content area
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Shortcut bar
        ])
        .split(size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(main_chunks[1]);

    render_search_input(frame, app, main_chunks[0]);
    render_note_list(frame, app, content_chunks[0]);
    match app.editor() {
        Some(editor) => render_editor(frame, app, editor, content_chunks[1]),
        None => render_detail_view(frame, app, content_chunks[1]),
    }
    render_status_line(frame, app, main_chunks[2]);
    render_shortcut_bar(frame, app, main_chunks[3]);
}

fn panel(title: impl Into<Line<'static>>, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
}

fn format_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "????-??-??".to_string())
}

fn format_datetime(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| "????-??-?? ??:??".to_string())
}

fn render_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus() == Focus::SearchInput;
    let title = format!("Search (sort: {})", app.sort_key().label());

    let mut content = app.search_input().to_string();
    if is_focused {
        content.push('█');
    }

    let paragraph = Paragraph::new(content).block(panel(title, is_focused));
    frame.render_widget(paragraph, area);
}

/// One list row: pin marker, title, and a dimmed date and preview.
fn note_list_line(note: &Note) -> Line<'static> {
    let dim = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);
    let marker = if note.is_pinned { "* " } else { "  " };

    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Yellow)),
        Span::styled(
            note.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(format!("[{}]", format_date(note.updated_at)), dim),
        Span::raw(" "),
        Span::styled(preview(&plain_text(&note.content), PREVIEW_CHARS), dim),
    ])
}

fn render_note_list(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus() == Focus::NoteList;
    let title = format!("Notes ({})", app.notes().len());

    let items: Vec<ListItem> = app
        .notes()
        .iter()
        .map(|note| ListItem::new(note_list_line(note)))
        .collect();

    let list = List::new(items).block(panel(title, is_focused)).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::REVERSED),
    );

    let mut list_state = ListState::default();
    list_state.select(app.selected_index());

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
}

fn render_detail_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel("Detail", false);

    let Some(note) = app.selected_note() else {
        frame.render_widget(Paragraph::new("No note selected").block(block), area);
        return;
    };

    let mut text = Text::default();
    text.lines.push(Line::from(Span::styled(
        note.title.clone(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    let notebook = app
        .notebook_name(note.notebook_id)
        .map_or_else(|| note.notebook_id.to_string(), str::to_string);
    text.lines.push(Line::from(vec![label("Notebook: "), Span::raw(notebook)]));
    if !note.tags.is_empty() {
        let tags = note.tags.iter().collect::<Vec<_>>().join(", ");
        text.lines.push(Line::from(vec![label("Tags: "), Span::raw(tags)]));
    }
    text.lines.push(Line::from(""));
    text.lines.push(Line::from(plain_text(&note.content)));

    let files: Vec<&str> = note
        .images
        .iter()
        .chain(&note.attachments)
        .map(|a| a.name.as_str())
        .collect();
    if !files.is_empty() {
        text.lines.push(Line::from(""));
        text.lines.push(Line::from(label("Attachments:")));
        for name in files {
            text.lines.push(Line::from(format!("  - {name}")));
        }
    }

    let dim = Style::default().fg(Color::DarkGray);
    text.lines.push(Line::from(""));
    text.lines.push(Line::from(vec![
        label("Created: "),
        Span::styled(format_datetime(note.created_at), dim),
        Span::raw("  "),
        label("Modified: "),
        Span::styled(format_datetime(note.updated_at), dim),
    ]));

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Splits styled segments into lines at each `\n`.
fn styled_lines(segments: Vec<(String, Style)>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];
    for (text, style) in segments {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            if !part.is_empty()
                && let Some(line) = lines.last_mut()
            {
                line.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }
    lines
}

/// Raw content with the selection highlighted and a block cursor.
fn editor_segments(editor: &EditorPane) -> Vec<(String, Style)> {
    let content = editor.content();
    let plain = Style::default();
    let cursor = Style::default().fg(Color::Cyan);
    match editor.selection() {
        Some(selection) => vec![
            (content[..selection.start].to_string(), plain),
            (
                content[selection.start..selection.end].to_string(),
                Style::default().add_modifier(Modifier::REVERSED),
            ),
            (content[selection.end..].to_string(), plain),
        ],
        None => vec![
            (content[..editor.cursor()].to_string(), plain),
            ("█".to_string(), cursor),
            (content[editor.cursor()..].to_string(), plain),
        ],
    }
}

fn render_editor(frame: &mut Frame, app: &App, editor: &EditorPane, area: Rect) {
    let title = format!("Edit: {} [{}]", editor.title(), editor.status());
    let block = panel(title, app.focus() == Focus::Editor);

    let paragraph = Paragraph::new(Text::from(styled_lines(editor_segments(editor))))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let error = app
        .editor()
        .and_then(|e| e.last_error())
        .map(|e| format!("Save failed: {e}"));
    let Some(message) = error.or_else(|| app.message().map(str::to_string)) else {
        return;
    };
    let paragraph = Paragraph::new(message).style(Style::default().fg(Color::Red));
    frame.render_widget(paragraph, area);
}

/// Shows context-aware keyboard shortcuts for the focused panel.
fn render_shortcut_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let shortcuts: &[(&str, &str)] = match app.focus() {
        Focus::SearchInput => &[("Ctrl+C", "quit"), ("Tab", "next panel"), ("Enter", "to list")],
        Focus::NoteList => &[
            ("q", "quit"),
            ("j/k", "navigate"),
            ("Enter", "edit"),
            ("n", "new"),
            ("p", "pin"),
            ("d", "delete"),
            ("s", "sort"),
        ],
        Focus::Editor if app.editor().is_some_and(EditorPane::toolbar_visible) => &[
            ("Ctrl+B", "bold"),
            ("Ctrl+I", "italic"),
            ("Ctrl+U", "underline"),
            ("Alt+1..3", "heading"),
            ("Ctrl+L", "list"),
            ("Ctrl+O", "numbered"),
        ],
        Focus::Editor => &[
            ("Esc", "close"),
            ("Ctrl+S", "save"),
            ("Shift+arrows", "select"),
            ("Alt+1..3", "heading"),
        ],
    };

    let mut spans = Vec::new();
    for (i, (key, action)) in shortcuts.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", sep_style));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(format!(": {action}")));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteBuilder, NoteId};
    use crate::service::NoteService;
    use crate::store::{MemoryStore, Store};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use std::time::Duration;

    fn app() -> App {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::seeded());
        App::new(NoteService::new(store), Duration::from_secs(3600))
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn renders_panels_and_titles() {
        let screen = render(&app());
        assert!(screen.contains("Search (sort: Last Modified)"));
        assert!(screen.contains("Notes (8)"));
        assert!(screen.contains("No note selected"));
        assert!(screen.contains("Sourdough starter"));
    }

    #[test]
    fn detail_shows_selected_note_notebook() {
        let mut app = app();
        app.next_focus();
        let note = app.selected_note().unwrap().clone();

        let screen = render(&app);

        let notebook = app.notebook_name(note.notebook_id).unwrap().to_string();
        assert!(screen.contains(&format!("Notebook: {notebook}")));
        assert!(screen.contains("j/k: navigate"));
    }

    #[test]
    fn editor_title_shows_save_status() {
        let mut app = app();
        app.next_focus();
        app.open_selected();
        app.editor_insert("x");

        let screen = render(&app);

        assert!(screen.contains("[Unsaved changes]"));
        assert!(screen.contains("Esc: close"));
    }

    #[test]
    fn list_line_marks_pinned_notes_and_previews_text() {
        let note = NoteBuilder::new()
            .id(NoteId::new(1))
            .title("Pinned")
            .content("<p>Body &amp; soul</p>")
            .pinned(true)
            .build();

        let line = note_list_line(&note);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();

        assert!(text.starts_with("* Pinned"));
        assert!(text.ends_with("Body & soul"));
    }

    #[test]
    fn styled_lines_split_on_newlines() {
        let lines = styled_lines(vec![
            ("a\nb".to_string(), Style::default()),
            ("c".to_string(), Style::default()),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans.len(), 2);
    }
}
