use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::editor;
use crate::models::{
    Attachment, Note, NoteDraft, NoteId, NoteUpdate, Notebook, NotebookDraft, NotebookId, NotebookUpdate,
};
use crate::pipeline::{self, SortKey, TagCount};
use crate::record::RecordFailure;
use crate::store::{self, Store, StoreError};
use crate::upload::{self, UploadError};

/// Number of notes returned by [`NoteService::get_recent`] when the caller
/// has no preference.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Kind of record an operation was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Note,
    Notebook,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Note => f.write_str("note"),
            Entity::Notebook => f.write_str("notebook"),
        }
    }
}

/// Errors returned by single-entity service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("{} record(s) rejected by the store", failures.len())]
    PartialBatch { failures: Vec<RecordFailure> },

    #[error(transparent)]
    Transport(StoreError),
}

impl ServiceError {
    fn note_not_found(id: NoteId) -> Self {
        Self::NotFound {
            entity: Entity::Note,
            id: id.get(),
        }
    }

    fn notebook_not_found(id: NotebookId) -> Self {
        Self::NotFound {
            entity: Entity::Notebook,
            id: id.get(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::PartialBatch { failures } => Self::PartialBatch { failures },
            other => Self::Transport(other),
        }
    }
}

/// Unwraps a list-shaped result, logging and swallowing failures.
fn or_empty<T>(operation: &str, result: Result<Vec<T>, StoreError>) -> Vec<T> {
    result.unwrap_or_else(|error| {
        warn!(%error, operation, "store read failed, returning empty listing");
        Vec::new()
    })
}

/// Service layer providing note management operations.
///
/// NoteService shares a store with its [`NotebookService`] and provides the
/// business rules on top of it: defaults for drafts, tag deduplication,
/// notebook note counts and not-found reporting. This service is
/// UI-independent and is used by both the CLI and the TUI.
///
/// Listing operations never fail: a store failure is logged and produces an
/// empty result. Operations on a single note return [`ServiceError`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use inkdrop::{MemoryStore, NoteDraft, NoteService};
///
/// # fn main() -> Result<(), inkdrop::ServiceError> {
/// let service = NoteService::new(Arc::new(MemoryStore::seeded()));
///
/// let note = service.create(NoteDraft::titled("Shopping").with_tags(["home"]))?;
/// assert_eq!(service.get_by_id(note.id)?.title, "Shopping");
/// # Ok(())
/// # }
/// ```
/// Outcome of [`NoteService::attach`].
#[derive(Debug)]
pub struct Attached {
    pub note: Note,
    pub added: Vec<Attachment>,
    pub skipped: Vec<UploadError>,
}

pub struct NoteService<S: Store + ?Sized = dyn Store> {
    store: Arc<S>,
    notebooks: NotebookService<S>,
}

impl<S: Store + ?Sized> Clone for NoteService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notebooks: self.notebooks.clone(),
        }
    }
}

impl<S: Store + ?Sized> NoteService<S> {
    /// Creates a new NoteService over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            notebooks: NotebookService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Returns the notebook service sharing this service's store.
    pub fn notebooks(&self) -> &NotebookService<S> {
        &self.notebooks
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns every note, in store order.
    pub fn list(&self) -> Vec<Note> {
        or_empty("list notes", self.store.list_notes())
    }

    /// Retrieves a note by its ID.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no note has this ID.
    pub fn get_by_id(&self, id: NoteId) -> Result<Note, ServiceError> {
        self.store
            .get_note(id)?
            .ok_or_else(|| ServiceError::note_not_found(id))
    }

    /// Creates a note from `draft`, filling in defaults.
    ///
    /// A missing or blank title becomes `"Untitled Note"`, a missing notebook
    /// becomes the fallback notebook, and duplicate tags are dropped. The
    /// target notebook's note count is incremented.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use inkdrop::{DEFAULT_TITLE, MemoryStore, NoteDraft, NoteService, NotebookId};
    ///
    /// # fn main() -> Result<(), inkdrop::ServiceError> {
    /// let service = NoteService::new(Arc::new(MemoryStore::new()));
    ///
    /// let note = service.create(NoteDraft::default())?;
    /// assert_eq!(note.title, DEFAULT_TITLE);
    /// assert_eq!(note.notebook_id, NotebookId::FALLBACK);
    /// assert_eq!(note.content, "");
    /// # Ok(())
    /// # }
    /// ```
    pub fn create(&self, draft: NoteDraft) -> Result<Note, ServiceError> {
        if draft.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            debug!("note draft has no title, using default");
        }
        if draft.notebook_id.is_none() {
            debug!("note draft has no notebook, using fallback notebook");
        }

        let note = self.store.insert_note(draft.normalize())?;
        info!(note_id = %note.id, notebook_id = %note.notebook_id, "created note");

        self.notebooks.adjust_quietly(note.notebook_id, 1);
        Ok(note)
    }

    /// Applies a partial update. The store rewrites `updated_at`.
    ///
    /// Moving a note to another notebook moves one unit of note count from
    /// the old notebook to the new one.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no note has this ID.
    pub fn update(&self, id: NoteId, update: &NoteUpdate) -> Result<Note, ServiceError> {
        let previous_notebook = match update.notebook_id {
            Some(_) => Some(self.get_by_id(id)?.notebook_id),
            None => None,
        };

        let note = self
            .store
            .update_note(id, update)?
            .ok_or_else(|| ServiceError::note_not_found(id))?;
        debug!(note_id = %id, "updated note");

        if let Some(previous) = previous_notebook
            && previous != note.notebook_id
        {
            self.notebooks.adjust_quietly(previous, -1);
            self.notebooks.adjust_quietly(note.notebook_id, 1);
        }
        Ok(note)
    }

    /// Attaches local files to a note.
    ///
    /// Images are added to the note's images and shown inline at the end of
    /// its content. Other files are added to its attachments. Files that
    /// cannot be read or exceed [`upload::MAX_UPLOAD_SIZE`] are skipped and
    /// reported in [`Attached::skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no note has this ID.
    pub fn attach<P: AsRef<Path>>(&self, id: NoteId, paths: &[P]) -> Result<Attached, ServiceError> {
        let note = self.get_by_id(id)?;
        let first_id = note
            .images
            .iter()
            .chain(&note.attachments)
            .map(|a| a.id)
            .max()
            .unwrap_or(0)
            + 1;

        let upload = upload::prepare(paths, first_id, store::now_millis());
        for skipped in &upload.skipped {
            warn!(note_id = %id, error = %skipped, "skipped upload");
        }
        if upload.accepted.is_empty() {
            return Ok(Attached {
                note,
                added: Vec::new(),
                skipped: upload.skipped,
            });
        }

        let mut content = note.content.clone();
        let mut images = note.images.clone();
        let mut attachments = note.attachments.clone();
        for file in &upload.accepted {
            if file.is_image() {
                if let Ok(updated) = editor::insert_image(&content, file) {
                    content = updated;
                }
                images.push(file.clone());
            } else {
                attachments.push(file.clone());
            }
        }

        let update = NoteUpdate {
            content: Some(content),
            images: Some(images),
            attachments: Some(attachments),
            ..NoteUpdate::default()
        };
        let note = self.update(id, &update)?;
        info!(note_id = %id, added = upload.accepted.len(), "attached files");

        Ok(Attached {
            note,
            added: upload.accepted,
            skipped: upload.skipped,
        })
    }

    /// Deletes a note and decrements its notebook's note count.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no note has this ID.
    pub fn delete(&self, id: NoteId) -> Result<bool, ServiceError> {
        let note = self.get_by_id(id)?;
        if !self.store.delete_note(id)? {
            return Err(ServiceError::note_not_found(id));
        }
        info!(note_id = %id, "deleted note");

        self.notebooks.adjust_quietly(note.notebook_id, -1);
        Ok(true)
    }

    /// Finds notes whose title, text, tags or attachment names contain
    /// `query`, ignoring case. A blank query returns nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use inkdrop::{MemoryStore, NoteService};
    ///
    /// let service = NoteService::new(Arc::new(MemoryStore::seeded()));
    ///
    /// assert!(service.search("").is_empty());
    /// assert_eq!(service.search("SOURDOUGH"), service.search("sourdough"));
    /// ```
    pub fn search(&self, query: &str) -> Vec<Note> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        or_empty("search notes", self.store.search_notes(query))
    }

    /// Returns up to `limit` notes, most recently modified first.
    pub fn get_recent(&self, limit: usize) -> Vec<Note> {
        let mut notes = self.list();
        notes.sort_by(|a, b| pipeline::compare(a, b, SortKey::Updated));
        notes.truncate(limit);
        notes
    }

    /// Flips the pinned flag.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no note has this ID.
    pub fn toggle_pin(&self, id: NoteId) -> Result<Note, ServiceError> {
        let note = self.get_by_id(id)?;
        self.update(id, &NoteUpdate::pinned(!note.is_pinned))
    }

    /// Returns the notes of one notebook.
    pub fn get_by_notebook(&self, notebook_id: NotebookId) -> Vec<Note> {
        or_empty("list notebook notes", self.store.notes_in_notebook(notebook_id))
    }

    /// Returns pinned notes, most recently modified first.
    pub fn get_pinned(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.list().into_iter().filter(|n| n.is_pinned).collect();
        notes.sort_by(|a, b| pipeline::compare(a, b, SortKey::Updated));
        notes
    }

    /// Returns every tag in use with the number of notes carrying it.
    pub fn tag_summary(&self) -> Vec<TagCount> {
        pipeline::tag_counts(&self.list())
    }
}

/// Service layer providing notebook management operations.
pub struct NotebookService<S: Store + ?Sized = dyn Store> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for NotebookService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> NotebookService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<Notebook> {
        or_empty("list notebooks", self.store.list_notebooks())
    }

    pub fn get_by_id(&self, id: NotebookId) -> Result<Notebook, ServiceError> {
        self.store
            .get_notebook(id)?
            .ok_or_else(|| ServiceError::notebook_not_found(id))
    }

    /// Creates a notebook with a zero note count.
    pub fn create(&self, draft: NotebookDraft) -> Result<Notebook, ServiceError> {
        let notebook = self.store.insert_notebook(draft.normalize())?;
        info!(notebook_id = %notebook.id, name = %notebook.name, "created notebook");
        Ok(notebook)
    }

    pub fn update(&self, id: NotebookId, update: &NotebookUpdate) -> Result<Notebook, ServiceError> {
        self.store
            .update_notebook(id, update)?
            .ok_or_else(|| ServiceError::notebook_not_found(id))
    }

    /// Deletes a notebook. Notes that belonged to it are left in place.
    pub fn delete(&self, id: NotebookId) -> Result<bool, ServiceError> {
        if !self.store.delete_notebook(id)? {
            return Err(ServiceError::notebook_not_found(id));
        }
        info!(notebook_id = %id, "deleted notebook");
        Ok(true)
    }

    /// Adds `delta` to the notebook's note count, clamping at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no notebook has this ID.
    pub fn update_note_count(&self, id: NotebookId, delta: i64) -> Result<Notebook, ServiceError> {
        self.store
            .adjust_note_count(id, delta)?
            .ok_or_else(|| ServiceError::notebook_not_found(id))
    }

    /// Count maintenance after a note write that already succeeded: failures
    /// are logged, not returned.
    fn adjust_quietly(&self, id: NotebookId, delta: i64) {
        if let Err(error) = self.update_note_count(id, delta) {
            warn!(notebook_id = %id, delta, %error, "could not adjust note count");
        }
    }
}
