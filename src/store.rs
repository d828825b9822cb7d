/// Data-access layer for notes and notebooks.
///
/// The [`Store`] trait is the seam between the service facade and the three
/// backends: an in-process [`MemoryStore`] seeded from JSON fixtures, a local
/// [`SqliteStore`], and a [`RemoteStore`] that talks to the record API.
///
/// Stores own identifier assignment and timestamps. Callers never supply
/// `id`, `created_at` or `updated_at`.
mod memory;
mod remote;
mod sqlite;

use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{
    NewNote, NewNotebook, Note, NoteId, NoteUpdate, Notebook, NotebookId, NotebookUpdate,
};
use crate::pipeline;
use crate::record::{RecordError, RecordFailure};

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The whole operation failed: unreachable backend, rejected request,
    /// or an envelope reporting `success: false`.
    #[error("store request failed: {message}")]
    Transport { message: String },

    /// Some records in a batch were rejected.
    #[error("{} record(s) rejected: {}", failures.len(), describe_failures(failures))]
    PartialBatch { failures: Vec<RecordFailure> },

    /// A record could not be decoded into the canonical model.
    #[error("failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Seed fixtures are inconsistent (e.g. duplicate ids).
    #[error("invalid seed data: {0}")]
    Seed(String),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<RecordError> for StoreError {
    fn from(error: RecordError) -> Self {
        Self::transport(error.to_string())
    }
}

fn describe_failures(failures: &[RecordFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("#{} {}", f.index, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Persistence operations for notes and notebooks, keyed by integer id.
///
/// Lookups of a missing id return `Ok(None)` / `Ok(false)`; deciding whether
/// that is an error belongs to the caller.
pub trait Store: Send + Sync {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError>;

    fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError>;

    /// Inserts a note, assigning its id and both timestamps.
    fn insert_note(&self, note: NewNote) -> Result<Note, StoreError>;

    /// Applies `update` and rewrites `updated_at`. Returns `None` if the note
    /// does not exist.
    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> Result<Option<Note>, StoreError>;

    /// Returns `true` if a note was removed.
    fn delete_note(&self, id: NoteId) -> Result<bool, StoreError>;

    /// Notes whose title, text, tags or attachment names contain `query`,
    /// ignoring case. A blank query matches nothing.
    fn search_notes(&self, query: &str) -> Result<Vec<Note>, StoreError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .list_notes()?
            .into_iter()
            .filter(|note| pipeline::search_matches(note, query))
            .collect())
    }

    fn notes_in_notebook(&self, notebook_id: NotebookId) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .list_notes()?
            .into_iter()
            .filter(|note| note.notebook_id == notebook_id)
            .collect())
    }

    fn list_notebooks(&self) -> Result<Vec<Notebook>, StoreError>;

    fn get_notebook(&self, id: NotebookId) -> Result<Option<Notebook>, StoreError>;

    fn insert_notebook(&self, notebook: NewNotebook) -> Result<Notebook, StoreError>;

    fn update_notebook(
        &self,
        id: NotebookId,
        update: &NotebookUpdate,
    ) -> Result<Option<Notebook>, StoreError>;

    fn delete_notebook(&self, id: NotebookId) -> Result<bool, StoreError>;

    /// Adds `delta` to the notebook's note count, clamping at zero.
    fn adjust_note_count(
        &self,
        id: NotebookId,
        delta: i64,
    ) -> Result<Option<Notebook>, StoreError>;
}

/// Current UTC time truncated to whole milliseconds, the resolution every
/// backend can store.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}

/// Timestamp for a mutation of a record last written at `previous`.
///
/// Strictly greater than `previous` even if the clock has not advanced.
pub fn next_timestamp(previous: OffsetDateTime) -> OffsetDateTime {
    let now = now_millis();
    if now > previous {
        now
    } else {
        previous + Duration::from_millis(1)
    }
}
