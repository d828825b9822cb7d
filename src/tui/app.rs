use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::editor::{
    EditorSession, Format, FormatError, NoteSaver, SaveEvent, SaveStatus, Selection,
    toolbar_visible,
};
use crate::models::{Note, NoteDraft, NoteId, Notebook, NotebookId};
use crate::pipeline::{ListView, SortKey};
use crate::service::NoteService;

/// How long typing in the search bar must pause before the list refilters.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// How long closing the editor waits for pending saves.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Panel focus state for keyboard navigation.
///
/// Determines which panel receives keyboard input and how keys are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Search bar is focused (typing updates the query)
    SearchInput,
    /// Note list panel is focused (j/k navigation, Enter to edit)
    NoteList,
    /// Editor pane is focused (typing edits the open note)
    Editor,
}

/// The note open in the editor pane, with a cursor and optional selection
/// as byte offsets into its content.
pub struct EditorPane {
    session: EditorSession,
    title: String,
    cursor: usize,
    anchor: Option<usize>,
}

impl EditorPane {
    fn open(saver: Arc<dyn NoteSaver>, note: &Note, idle: Duration) -> Self {
        let session = EditorSession::open(saver, note, idle);
        Self {
            cursor: session.content().len(),
            title: note.title.clone(),
            session,
            anchor: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn note_id(&self) -> NoteId {
        self.session.note_id()
    }

    pub fn content(&self) -> &str {
        self.session.content()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> SaveStatus {
        self.session.status()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.session.last_error()
    }

    /// The selected range, if the anchor and cursor differ.
    pub fn selection(&self) -> Option<Selection> {
        let anchor = self.anchor?;
        let selection = Selection::new(anchor.min(self.cursor), anchor.max(self.cursor));
        (!selection.is_collapsed()).then_some(selection)
    }

    pub fn toolbar_visible(&self) -> bool {
        toolbar_visible(self.selection())
    }

    fn insert(&mut self, text: &str) {
        let mut content = self.content().to_string();
        content.insert_str(self.cursor, text);
        self.cursor += text.len();
        self.anchor = None;
        self.session.edit(content);
    }

    fn backspace(&mut self) {
        let Some(previous) = self.content()[..self.cursor].chars().next_back() else {
            return;
        };
        let start = self.cursor - previous.len_utf8();
        let mut content = self.content().to_string();
        content.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.anchor = None;
        self.session.edit(content);
    }

    fn move_cursor(&mut self, forward: bool, extend: bool) {
        if extend {
            self.anchor.get_or_insert(self.cursor);
        } else {
            self.anchor = None;
        }
        let content = self.content();
        let step = if forward {
            content[self.cursor..].chars().next().map(char::len_utf8)
        } else {
            content[..self.cursor].chars().next_back().map(char::len_utf8)
        };
        if let Some(step) = step {
            self.cursor = if forward {
                self.cursor + step
            } else {
                self.cursor - step
            };
        }
    }

    fn apply_format(&mut self, format: Format) -> Result<(), FormatError> {
        let selection = self
            .selection()
            .unwrap_or_else(|| Selection::caret(self.cursor));
        let before = self.content().len();
        self.session.apply_format(format, selection)?;
        // Keep the cursor the same distance from the end of the content.
        self.cursor = self.content().len() - (before - selection.end);
        self.anchor = None;
        Ok(())
    }
}

/// Application state for the TUI.
///
/// Owns the note listing, search input, focus and the editor pane. All
/// reads and writes go through a [`NoteService`].
pub struct App {
    service: NoteService,
    view: ListView,
    notebooks: Vec<Notebook>,
    /// Currently selected note (None if no selection)
    selected: Option<NoteId>,
    search_input: String,
    focus: Focus,
    /// When the search input last changed (for debouncing)
    search_changed_at: Option<Instant>,
    editor: Option<EditorPane>,
    autosave_idle: Duration,
    message: Option<String>,
}

impl App {
    /// Creates an App over `service`, loading every note and notebook.
    ///
    /// Default focus is `SearchInput`; nothing is selected.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use inkdrop::{MemoryStore, NoteService, Store};
    /// use inkdrop::tui::{App, Focus};
    ///
    /// let store: Arc<dyn Store> = Arc::new(MemoryStore::seeded());
    /// let app = App::new(NoteService::new(store), Duration::from_secs(2));
    /// assert_eq!(app.notes().len(), 8);
    /// assert_eq!(app.focus(), Focus::SearchInput);
    /// assert_eq!(app.selected_index(), None);
    /// ```
    pub fn new(service: NoteService, autosave_idle: Duration) -> Self {
        let view = ListView::new(service.list());
        let notebooks = service.notebooks().list();
        Self {
            service,
            view,
            notebooks,
            selected: None,
            search_input: String::new(),
            focus: Focus::SearchInput,
            search_changed_at: None,
            editor: None,
            autosave_idle,
            message: None,
        }
    }

    /// Returns the visible (filtered and sorted) notes.
    pub fn notes(&self) -> &[Note] {
        self.view.visible()
    }

    pub fn notebooks(&self) -> &[Notebook] {
        &self.notebooks
    }

    pub fn notebook_name(&self, id: NotebookId) -> Option<&str> {
        self.notebooks
            .iter()
            .find(|nb| nb.id == id)
            .map(|nb| nb.name.as_str())
    }

    pub fn sort_key(&self) -> SortKey {
        self.view.sort_key()
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn editor(&self) -> Option<&EditorPane> {
        self.editor.as_ref()
    }

    /// Last error or notice to show in the status line.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Position of the selected note in the visible list.
    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.notes().iter().position(|n| n.id == id)
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected_index().map(|i| &self.notes()[i])
    }

    /// Cycles focus: `SearchInput` -> `NoteList` -> `Editor` (when a note
    /// is open) -> `SearchInput`.
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::SearchInput => Focus::NoteList,
            Focus::NoteList if self.editor.is_some() => Focus::Editor,
            Focus::NoteList | Focus::Editor => Focus::SearchInput,
        };
        self.auto_select_on_note_list_focus();
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::SearchInput if self.editor.is_some() => Focus::Editor,
            Focus::SearchInput => Focus::NoteList,
            Focus::NoteList => Focus::SearchInput,
            Focus::Editor => Focus::NoteList,
        };
        self.auto_select_on_note_list_focus();
    }

    /// Auto-selects first note when entering NoteList focus with no selection.
    fn auto_select_on_note_list_focus(&mut self) {
        if self.focus == Focus::NoteList && self.selected_index().is_none() {
            self.selected = self.notes().first().map(|n| n.id);
        }
    }

    /// Returns focus to `SearchInput` and clears the selection.
    pub fn reset_focus(&mut self) {
        self.focus = Focus::SearchInput;
        self.selected = None;
    }

    /// Moves selection down, wrapping to the top.
    pub fn select_next(&mut self) {
        let len = self.notes().len();
        let index = match self.selected_index() {
            _ if len == 0 => None,
            None => Some(0),
            Some(i) => Some((i + 1) % len),
        };
        self.selected = index.map(|i| self.notes()[i].id);
    }

    /// Moves selection up, wrapping to the bottom.
    pub fn select_previous(&mut self) {
        let len = self.notes().len();
        let index = match self.selected_index() {
            _ if len == 0 => None,
            None | Some(0) => Some(len - 1),
            Some(i) => Some(i - 1),
        };
        self.selected = index.map(|i| self.notes()[i].id);
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_input.push(c);
        self.search_changed_at = Some(Instant::now());
    }

    pub fn pop_search_char(&mut self) {
        self.search_input.pop();
        self.search_changed_at = Some(Instant::now());
    }

    /// Applies the search input to the list once typing has paused.
    pub fn apply_search_if_due(&mut self, now: Instant) {
        if let Some(changed_at) = self.search_changed_at
            && now.duration_since(changed_at) >= SEARCH_DEBOUNCE
        {
            self.search_changed_at = None;
            self.view.set_query(self.search_input.clone());
        }
    }

    pub fn cycle_sort(&mut self) {
        self.view.set_sort(self.view.sort_key().next());
    }

    /// Periodic work: debounced search and autosave.
    pub fn tick(&mut self) {
        self.apply_search_if_due(Instant::now());

        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match editor.session.tick() {
            Some(SaveEvent::Saved { .. }) => {
                let id = editor.note_id();
                self.refresh_note(id);
            }
            Some(SaveEvent::Failed { error }) => {
                self.message = Some(format!("Save failed: {error}"));
            }
            None => {}
        }
    }

    fn refresh_note(&mut self, id: NoteId) {
        match self.service.get_by_id(id) {
            Ok(note) => self.view.upsert(note),
            Err(error) => warn!(note_id = %id, %error, "could not reload note"),
        }
    }

    fn reload_notebooks(&mut self) {
        self.notebooks = self.service.notebooks().list();
    }

    /// Opens the selected note in the editor pane.
    pub fn open_selected(&mut self) {
        let Some(note) = self.selected_note().cloned() else {
            return;
        };
        self.close_editor();
        let saver: Arc<dyn NoteSaver> = Arc::new(self.service.clone());
        self.editor = Some(EditorPane::open(saver, &note, self.autosave_idle));
        self.focus = Focus::Editor;
        debug!(note_id = %note.id, "editing note");
    }

    /// Saves pending edits, then closes the editor pane.
    pub fn close_editor(&mut self) {
        let Some(mut editor) = self.editor.take() else {
            return;
        };
        let id = editor.note_id();
        if let Err(error) = editor.session.flush(FLUSH_TIMEOUT) {
            self.message = Some(format!("Note not saved: {error}"));
        }
        editor.session.close();
        self.refresh_note(id);
        if self.focus == Focus::Editor {
            self.focus = Focus::NoteList;
        }
    }

    /// Creates an empty note and opens it.
    pub fn create_note(&mut self) {
        match self.service.create(NoteDraft::default()) {
            Ok(note) => {
                self.selected = Some(note.id);
                self.view.upsert(note);
                self.reload_notebooks();
                self.open_selected();
            }
            Err(error) => self.message = Some(format!("Could not create note: {error}")),
        }
    }

    pub fn toggle_pin_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        match self.service.toggle_pin(id) {
            Ok(note) => self.view.upsert(note),
            Err(error) => self.message = Some(format!("Could not pin note: {error}")),
        }
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        if self.editor.as_ref().is_some_and(|e| e.note_id() == id) {
            self.close_editor();
        }
        match self.service.delete(id) {
            Ok(_) => {
                self.view.remove(id);
                self.selected = None;
                self.reload_notebooks();
                self.message = Some("Note deleted".to_string());
            }
            Err(error) => self.message = Some(format!("Could not delete note: {error}")),
        }
    }

    pub fn editor_insert(&mut self, text: &str) {
        if let Some(editor) = self.editor.as_mut() {
            editor.insert(text);
        }
    }

    pub fn editor_backspace(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.backspace();
        }
    }

    pub fn editor_move(&mut self, forward: bool, extend: bool) {
        if let Some(editor) = self.editor.as_mut() {
            editor.move_cursor(forward, extend);
        }
    }

    pub fn editor_format(&mut self, format: Format) {
        if let Some(editor) = self.editor.as_mut()
            && let Err(error) = editor.apply_format(format)
        {
            self.message = Some(format!("Cannot format: {error}"));
        }
    }

    pub fn editor_save_now(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.session.save_now();
        }
    }

    /// Closes the editor so pending edits are saved before exit.
    pub fn shutdown(&mut self) {
        self.close_editor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotebookDraft;
    use crate::pipeline::filter_and_sort;
    use crate::store::{MemoryStore, Store};

    fn app() -> App {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::seeded());
        App::new(NoteService::new(store), Duration::from_secs(3600))
    }

    fn empty_app() -> App {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = NoteService::new(store);
        service
            .notebooks()
            .create(NotebookDraft::named("Personal"))
            .unwrap();
        App::new(service, Duration::from_secs(3600))
    }

    #[test]
    fn app_initializes_with_default_state() {
        let app = app();
        assert_eq!(app.notes().len(), 8);
        assert_eq!(app.notebooks().len(), 4);
        assert_eq!(app.selected_index(), None);
        assert_eq!(app.search_input(), "");
        assert_eq!(app.focus(), Focus::SearchInput);
        assert_eq!(app.sort_key(), SortKey::Updated);
        assert!(app.editor().is_none());
    }

    #[test]
    fn notes_follow_default_sort() {
        let app = app();
        let expected = filter_and_sort(app.view.source(), "", SortKey::Updated);
        assert_eq!(app.notes(), expected.as_slice());
    }

    #[test]
    fn focus_cycle_skips_editor_when_closed() {
        let mut app = app();
        app.next_focus();
        assert_eq!(app.focus(), Focus::NoteList);
        assert_eq!(app.selected_index(), Some(0));
        app.next_focus();
        assert_eq!(app.focus(), Focus::SearchInput);
        app.prev_focus();
        assert_eq!(app.focus(), Focus::NoteList);
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut app = app();
        app.select_previous();
        assert_eq!(app.selected_index(), Some(7));
        app.select_next();
        assert_eq!(app.selected_index(), Some(0));
        app.select_previous();
        app.select_previous();
        assert_eq!(app.selected_index(), Some(6));
    }

    #[test]
    fn selection_on_empty_list_stays_none() {
        let mut app = empty_app();
        app.select_next();
        assert_eq!(app.selected_index(), None);
        app.select_previous();
        assert_eq!(app.selected_index(), None);
    }

    #[test]
    fn search_applies_only_after_debounce() {
        let mut app = app();
        for c in "sourdough".chars() {
            app.push_search_char(c);
        }
        let typed_at = app.search_changed_at.unwrap();

        app.apply_search_if_due(typed_at);
        assert_eq!(app.notes().len(), 8);

        app.apply_search_if_due(typed_at + SEARCH_DEBOUNCE);
        assert_eq!(app.notes().len(), 1);
        assert_eq!(app.notes()[0].title, "Sourdough starter");
    }

    #[test]
    fn selection_follows_note_when_order_changes() {
        let mut app = app();
        app.cycle_sort();
        app.select_next();
        let id = app.selected_note().unwrap().id;

        app.cycle_sort();

        assert_eq!(app.selected_note().unwrap().id, id);
    }

    #[test]
    fn editing_and_closing_saves_content() {
        let mut app = app();
        app.select_next();
        let id = app.selected_note().unwrap().id;
        app.open_selected();
        assert_eq!(app.focus(), Focus::Editor);

        app.editor_insert("!");
        app.close_editor();

        let saved = app.service.get_by_id(id).unwrap();
        assert!(saved.content.ends_with('!'));
        assert!(app.editor().is_none());
        assert_eq!(app.focus(), Focus::NoteList);
        assert!(app.notes().iter().any(|n| n.id == id && n.content.ends_with('!')));
    }

    #[test]
    fn shift_selection_enables_toolbar_and_bold() {
        let mut app = empty_app();
        app.create_note();
        app.editor_insert("hello");
        for _ in 0..5 {
            app.editor_move(false, true);
        }
        assert!(app.editor().unwrap().toolbar_visible());

        app.editor_format(Format::Bold);

        let editor = app.editor().unwrap();
        assert_eq!(editor.content(), "<strong>hello</strong>");
        assert_eq!(editor.cursor(), editor.content().len());
        assert!(!editor.toolbar_visible());
    }

    #[test]
    fn invalid_format_reports_message() {
        let mut app = empty_app();
        app.create_note();
        app.editor_format(Format::Italic);

        assert!(app.message().unwrap().contains("nothing is selected"));
        assert_eq!(app.editor().unwrap().content(), "");
    }

    #[test]
    fn backspace_removes_whole_characters() {
        let mut app = empty_app();
        app.create_note();
        app.editor_insert("né");
        app.editor_backspace();
        assert_eq!(app.editor().unwrap().content(), "n");
    }

    #[test]
    fn create_pin_and_delete_update_the_list() {
        let mut app = empty_app();
        app.create_note();
        app.close_editor();
        assert_eq!(app.notes().len(), 1);
        assert_eq!(app.notebooks()[0].note_count, 1);

        app.toggle_pin_selected();
        assert!(app.selected_note().unwrap().is_pinned);

        app.delete_selected();
        assert!(app.notes().is_empty());
        assert_eq!(app.notebooks()[0].note_count, 0);
    }
}
