use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{Store, StoreError, next_timestamp, now_millis};
use crate::models::{
    NewNote, NewNotebook, Note, NoteId, NoteUpdate, Notebook, NotebookId, NotebookUpdate,
};

const SEED_NOTES: &str = include_str!("seed/notes.json");
const SEED_NOTEBOOKS: &str = include_str!("seed/notebooks.json");

/// In-process store holding notes and notebooks in memory.
///
/// Each instance owns its records; two stores never share state. Ids are
/// assigned from a counter that starts above the largest seeded id and never
/// goes back, so ids of deleted records are not reused.
///
/// # Examples
///
/// ```
/// use inkdrop::{MemoryStore, NoteDraft, Store};
///
/// # fn main() -> Result<(), inkdrop::StoreError> {
/// let store = MemoryStore::new();
/// let note = store.insert_note(NoteDraft::titled("First").normalize())?;
/// assert_eq!(note.id.get(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryData>,
}

#[derive(Debug, Default)]
struct MemoryData {
    notes: Vec<Note>,
    notebooks: Vec<Notebook>,
    next_note_id: i64,
    next_notebook_id: i64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records.
    ///
    /// Fails if two notes or two notebooks share an id.
    pub fn with_records(notes: Vec<Note>, notebooks: Vec<Notebook>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        if let Some(dup) = notes.iter().find(|n| !seen.insert(n.id)) {
            return Err(StoreError::Seed(format!("duplicate note id {}", dup.id)));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = notebooks.iter().find(|n| !seen.insert(n.id)) {
            return Err(StoreError::Seed(format!("duplicate notebook id {}", dup.id)));
        }

        let next_note_id = notes.iter().map(|n| n.id.get()).max().unwrap_or(0) + 1;
        let next_notebook_id = notebooks.iter().map(|n| n.id.get()).max().unwrap_or(0) + 1;

        Ok(Self {
            inner: Mutex::new(MemoryData {
                notes,
                notebooks,
                next_note_id,
                next_notebook_id,
            }),
        })
    }

    /// Creates a store from JSON arrays of notes and notebooks.
    pub fn from_json(notes_json: &str, notebooks_json: &str) -> Result<Self, StoreError> {
        let notes: Vec<Note> = serde_json::from_str(notes_json)?;
        let notebooks: Vec<Notebook> = serde_json::from_str(notebooks_json)?;
        Self::with_records(notes, notebooks)
    }

    /// Creates a store loaded with the bundled sample notes and notebooks.
    pub fn seeded() -> Self {
        Self::from_json(SEED_NOTES, SEED_NOTEBOOKS).expect("bundled seed fixtures are valid")
    }

    fn data(&self) -> MutexGuard<'_, MemoryData> {
        // Every mutation is a single push, retain or field write.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self.data().notes.clone())
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError> {
        Ok(self.data().notes.iter().find(|n| n.id == id).cloned())
    }

    fn insert_note(&self, note: NewNote) -> Result<Note, StoreError> {
        let mut data = self.data();
        let id = NoteId::new(data.next_note_id.max(1));
        data.next_note_id = id.get() + 1;

        let note = note.into_note(id, now_millis());
        data.notes.push(note.clone());
        debug!(note_id = %id, "inserted note");
        Ok(note)
    }

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> Result<Option<Note>, StoreError> {
        let mut data = self.data();
        let Some(note) = data.notes.iter_mut().find(|n| n.id == id) else {
            return Ok(None);
        };

        update.apply_to(note);
        note.updated_at = next_timestamp(note.updated_at);
        Ok(Some(note.clone()))
    }

    fn delete_note(&self, id: NoteId) -> Result<bool, StoreError> {
        let mut data = self.data();
        let before = data.notes.len();
        data.notes.retain(|n| n.id != id);
        Ok(data.notes.len() != before)
    }

    fn list_notebooks(&self) -> Result<Vec<Notebook>, StoreError> {
        Ok(self.data().notebooks.clone())
    }

    fn get_notebook(&self, id: NotebookId) -> Result<Option<Notebook>, StoreError> {
        Ok(self.data().notebooks.iter().find(|n| n.id == id).cloned())
    }

    fn insert_notebook(&self, notebook: NewNotebook) -> Result<Notebook, StoreError> {
        let mut data = self.data();
        let id = NotebookId::new(data.next_notebook_id.max(1));
        data.next_notebook_id = id.get() + 1;

        let notebook = notebook.into_notebook(id, now_millis());
        data.notebooks.push(notebook.clone());
        debug!(notebook_id = %id, "inserted notebook");
        Ok(notebook)
    }

    fn update_notebook(
        &self,
        id: NotebookId,
        update: &NotebookUpdate,
    ) -> Result<Option<Notebook>, StoreError> {
        let mut data = self.data();
        let Some(notebook) = data.notebooks.iter_mut().find(|n| n.id == id) else {
            return Ok(None);
        };
        update.apply_to(notebook);
        Ok(Some(notebook.clone()))
    }

    fn delete_notebook(&self, id: NotebookId) -> Result<bool, StoreError> {
        let mut data = self.data();
        let before = data.notebooks.len();
        data.notebooks.retain(|n| n.id != id);
        Ok(data.notebooks.len() != before)
    }

    fn adjust_note_count(
        &self,
        id: NotebookId,
        delta: i64,
    ) -> Result<Option<Notebook>, StoreError> {
        let mut data = self.data();
        let Some(notebook) = data.notebooks.iter_mut().find(|n| n.id == id) else {
            return Ok(None);
        };
        notebook.note_count = notebook.adjusted_count(delta);
        Ok(Some(notebook.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteBuilder, NoteDraft, NotebookDraft};

    #[test]
    fn seeded_store_loads_fixtures() {
        let store = MemoryStore::seeded();

        let notes = store.list_notes().unwrap();
        let notebooks = store.list_notebooks().unwrap();

        assert!(!notes.is_empty());
        assert!(!notebooks.is_empty());
        assert!(
            notebooks.iter().any(|n| n.id == NotebookId::FALLBACK),
            "the fallback notebook must be seeded"
        );
        for note in &notes {
            assert!(
                notebooks.iter().any(|n| n.id == note.notebook_id),
                "note {} points at a missing notebook",
                note.id
            );
        }
    }

    #[test]
    fn seeded_counts_match_seeded_notes() {
        let store = MemoryStore::seeded();
        let notes = store.list_notes().unwrap();

        for notebook in store.list_notebooks().unwrap() {
            let actual = notes.iter().filter(|n| n.notebook_id == notebook.id).count();
            assert_eq!(notebook.note_count as usize, actual, "{}", notebook.name);
        }
    }

    #[test]
    fn instances_are_independent() {
        let a = MemoryStore::seeded();
        let b = MemoryStore::seeded();

        a.insert_note(NoteDraft::titled("only in a").normalize())
            .unwrap();

        assert_eq!(
            a.list_notes().unwrap().len(),
            b.list_notes().unwrap().len() + 1
        );
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let first = store
            .insert_note(NoteDraft::titled("a").normalize())
            .unwrap();
        assert!(store.delete_note(first.id).unwrap());

        let second = store
            .insert_note(NoteDraft::titled("b").normalize())
            .unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn insert_continues_after_largest_seeded_id() {
        let store = MemoryStore::with_records(
            vec![NoteBuilder::new().id(NoteId::new(41)).build()],
            vec![],
        )
        .unwrap();

        let note = store
            .insert_note(NoteDraft::default().normalize())
            .unwrap();
        assert_eq!(note.id, NoteId::new(42));
    }

    #[test]
    fn duplicate_seed_ids_are_rejected() {
        let result = MemoryStore::with_records(
            vec![
                NoteBuilder::new().id(NoteId::new(1)).build(),
                NoteBuilder::new().id(NoteId::new(1)).build(),
            ],
            vec![],
        );
        assert!(matches!(result, Err(StoreError::Seed(_))));
    }

    #[test]
    fn update_of_missing_note_returns_none() {
        let store = MemoryStore::new();
        let result = store
            .update_note(NoteId::new(9), &NoteUpdate::pinned(true))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn update_bumps_updated_at() {
        let store = MemoryStore::new();
        let note = store
            .insert_note(NoteDraft::titled("a").normalize())
            .unwrap();

        let first = store
            .update_note(note.id, &NoteUpdate::content("<p>1</p>"))
            .unwrap()
            .unwrap();
        let second = store
            .update_note(note.id, &NoteUpdate::content("<p>2</p>"))
            .unwrap()
            .unwrap();

        assert!(first.updated_at > note.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, note.created_at);
    }

    #[test]
    fn adjust_note_count_clamps_at_zero() {
        let store = MemoryStore::new();
        let notebook = store
            .insert_notebook(NotebookDraft::named("Work").normalize())
            .unwrap();

        let adjusted = store.adjust_note_count(notebook.id, -3).unwrap().unwrap();
        assert_eq!(adjusted.note_count, 0);

        let adjusted = store.adjust_note_count(notebook.id, 2).unwrap().unwrap();
        assert_eq!(adjusted.note_count, 2);
    }

    #[test]
    fn from_json_reports_malformed_input() {
        let result = MemoryStore::from_json("[{", "[]");
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }
}
