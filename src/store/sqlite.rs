use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;
use tracing::debug;

use super::{Store, StoreError, next_timestamp, now_millis};
use crate::db::Database;
use crate::models::{
    NewNote, NewNotebook, Note, NoteId, NoteUpdate, Notebook, NotebookId, NotebookUpdate,
};

const NOTE_COLUMNS: &str = "id, title, content, notebook_id, tags, images, attachments, \
                            is_pinned, created_at, updated_at";
const NOTEBOOK_COLUMNS: &str = "id, name, color, note_count, created_at";

/// Durable single-user store backed by a local SQLite file.
///
/// # Examples
///
/// ```
/// use inkdrop::{NoteDraft, SqliteStore, Store};
///
/// # fn main() -> Result<(), inkdrop::StoreError> {
/// let store = SqliteStore::in_memory()?;
/// let note = store.insert_note(NoteDraft::titled("Persisted").normalize())?;
/// assert_eq!(store.get_note(note.id)?.unwrap().title, "Persisted");
/// # Ok(())
/// # }
/// ```
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::in_memory()?))
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A notes row before the JSON columns are decoded.
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    notebook_id: i64,
    tags: String,
    images: String,
    attachments: String,
    is_pinned: bool,
    created_at: i64,
    updated_at: i64,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            notebook_id: row.get(3)?,
            tags: row.get(4)?,
            images: row.get(5)?,
            attachments: row.get(6)?,
            is_pinned: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_note(self) -> Result<Note, StoreError> {
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        Ok(Note {
            id: NoteId::new(self.id),
            title: self.title,
            content: self.content,
            notebook_id: NotebookId::new(self.notebook_id),
            tags: tags.into(),
            images: serde_json::from_str(&self.images)?,
            attachments: serde_json::from_str(&self.attachments)?,
            is_pinned: self.is_pinned,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

fn notebook_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, i64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_notebook(
    (id, name, color, note_count, created_at): (i64, String, String, i64, i64),
) -> Result<Notebook, StoreError> {
    Ok(Notebook {
        id: NotebookId::new(id),
        name,
        color,
        note_count: u32::try_from(note_count.max(0)).unwrap_or(u32::MAX),
        created_at: from_millis(created_at)?,
    })
}

fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(ms: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|e| StoreError::Decode(serde::de::Error::custom(format!("timestamp {ms}: {e}"))))
}

fn query_note(conn: &Connection, id: NoteId) -> Result<Option<Note>, StoreError> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
    conn.query_row(&sql, [id.get()], NoteRow::from_row)
        .optional()?
        .map(NoteRow::into_note)
        .transpose()
}

fn query_notebook(conn: &Connection, id: NotebookId) -> Result<Option<Notebook>, StoreError> {
    let sql = format!("SELECT {NOTEBOOK_COLUMNS} FROM notebooks WHERE id = ?1");
    conn.query_row(&sql, [id.get()], notebook_from_row)
        .optional()?
        .map(into_notebook)
        .transpose()
}

impl Store for SqliteStore {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let db = self.db();
        let mut stmt = db
            .connection()
            .prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id"))?;
        let rows = stmt
            .query_map([], NoteRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(NoteRow::into_note).collect()
    }

    fn get_note(&self, id: NoteId) -> Result<Option<Note>, StoreError> {
        query_note(self.db().connection(), id)
    }

    fn insert_note(&self, note: NewNote) -> Result<Note, StoreError> {
        let db = self.db();
        let conn = db.connection();
        let now = now_millis();

        conn.execute(
            "INSERT INTO notes (title, content, notebook_id, tags, images, attachments, \
             is_pinned, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
            params![
                note.title,
                note.content,
                note.notebook_id.get(),
                serde_json::to_string(&note.tags)?,
                serde_json::to_string(&note.images)?,
                serde_json::to_string(&note.attachments)?,
                to_millis(now),
            ],
        )?;

        let id = NoteId::new(conn.last_insert_rowid());
        debug!(note_id = %id, "inserted note");
        Ok(note.into_note(id, now))
    }

    fn update_note(&self, id: NoteId, update: &NoteUpdate) -> Result<Option<Note>, StoreError> {
        let db = self.db();
        let conn = db.connection();

        let Some(mut note) = query_note(conn, id)? else {
            return Ok(None);
        };
        update.apply_to(&mut note);
        note.updated_at = next_timestamp(note.updated_at);

        conn.execute(
            "UPDATE notes SET title = ?2, content = ?3, notebook_id = ?4, tags = ?5, \
             images = ?6, attachments = ?7, is_pinned = ?8, updated_at = ?9 WHERE id = ?1",
            params![
                id.get(),
                note.title,
                note.content,
                note.notebook_id.get(),
                serde_json::to_string(&note.tags)?,
                serde_json::to_string(&note.images)?,
                serde_json::to_string(&note.attachments)?,
                note.is_pinned,
                to_millis(note.updated_at),
            ],
        )?;
        Ok(Some(note))
    }

    fn delete_note(&self, id: NoteId) -> Result<bool, StoreError> {
        let removed = self
            .db()
            .connection()
            .execute("DELETE FROM notes WHERE id = ?1", [id.get()])?;
        Ok(removed > 0)
    }

    fn notes_in_notebook(&self, notebook_id: NotebookId) -> Result<Vec<Note>, StoreError> {
        let db = self.db();
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notebook_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([notebook_id.get()], NoteRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(NoteRow::into_note).collect()
    }

    fn list_notebooks(&self) -> Result<Vec<Notebook>, StoreError> {
        let db = self.db();
        let mut stmt = db
            .connection()
            .prepare(&format!("SELECT {NOTEBOOK_COLUMNS} FROM notebooks ORDER BY id"))?;
        let rows = stmt
            .query_map([], notebook_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_notebook).collect()
    }

    fn get_notebook(&self, id: NotebookId) -> Result<Option<Notebook>, StoreError> {
        query_notebook(self.db().connection(), id)
    }

    fn insert_notebook(&self, notebook: NewNotebook) -> Result<Notebook, StoreError> {
        let db = self.db();
        let conn = db.connection();
        let now = now_millis();

        conn.execute(
            "INSERT INTO notebooks (name, color, note_count, created_at) VALUES (?1, ?2, 0, ?3)",
            params![notebook.name, notebook.color, to_millis(now)],
        )?;

        let id = NotebookId::new(conn.last_insert_rowid());
        debug!(notebook_id = %id, "inserted notebook");
        Ok(notebook.into_notebook(id, now))
    }

    fn update_notebook(
        &self,
        id: NotebookId,
        update: &NotebookUpdate,
    ) -> Result<Option<Notebook>, StoreError> {
        let db = self.db();
        let conn = db.connection();

        let Some(mut notebook) = query_notebook(conn, id)? else {
            return Ok(None);
        };
        update.apply_to(&mut notebook);

        conn.execute(
            "UPDATE notebooks SET name = ?2, color = ?3 WHERE id = ?1",
            params![id.get(), notebook.name, notebook.color],
        )?;
        Ok(Some(notebook))
    }

    fn delete_notebook(&self, id: NotebookId) -> Result<bool, StoreError> {
        let removed = self
            .db()
            .connection()
            .execute("DELETE FROM notebooks WHERE id = ?1", [id.get()])?;
        Ok(removed > 0)
    }

    fn adjust_note_count(
        &self,
        id: NotebookId,
        delta: i64,
    ) -> Result<Option<Notebook>, StoreError> {
        let db = self.db();
        let conn = db.connection();

        let changed = conn.execute(
            "UPDATE notebooks SET note_count = MAX(note_count + ?2, 0) WHERE id = ?1",
            params![id.get(), delta],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        query_notebook(conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, NoteDraft, NotebookDraft};
    use tempfile::tempdir;
    use time::macros::datetime;

    fn image() -> Attachment {
        Attachment {
            id: 1,
            name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 1024,
            url: "https://files.example/cat.png".to_string(),
            uploaded_at: datetime!(2024-02-01 12:00:00 UTC),
        }
    }

    #[test]
    fn insert_and_get_preserve_every_field() {
        let store = SqliteStore::in_memory().unwrap();
        let mut draft = NoteDraft::titled("Cats")
            .with_content("<p>meow</p>")
            .with_tags(["pets", "pets", "cats"]);
        draft.images = vec![image()];

        let inserted = store.insert_note(draft.normalize()).unwrap();
        let fetched = store.get_note(inserted.id).unwrap().unwrap();

        assert_eq!(fetched, inserted);
        assert_eq!(fetched.tags.as_slice(), &["pets", "cats"]);
        assert_eq!(fetched.images, vec![image()]);
    }

    #[test]
    fn get_missing_note_returns_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_note(NoteId::new(404)).unwrap().is_none());
    }

    #[test]
    fn update_rewrites_fields_and_timestamp() {
        let store = SqliteStore::in_memory().unwrap();
        let note = store
            .insert_note(NoteDraft::titled("Draft").normalize())
            .unwrap();

        let update = NoteUpdate {
            title: Some("Final".to_string()),
            is_pinned: Some(true),
            ..NoteUpdate::default()
        };
        let updated = store.update_note(note.id, &update).unwrap().unwrap();

        assert_eq!(updated.title, "Final");
        assert!(updated.is_pinned);
        assert!(updated.updated_at > note.updated_at);
        assert_eq!(store.get_note(note.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let store = SqliteStore::in_memory().unwrap();
        let note = store
            .insert_note(NoteDraft::titled("gone").normalize())
            .unwrap();

        assert!(store.delete_note(note.id).unwrap());
        assert!(!store.delete_note(note.id).unwrap());
    }

    #[test]
    fn notes_in_notebook_filters_by_notebook() {
        let store = SqliteStore::in_memory().unwrap();
        let work = store
            .insert_notebook(NotebookDraft::named("Work").normalize())
            .unwrap();
        store
            .insert_note(NoteDraft::titled("home").normalize())
            .unwrap();
        let at_work = store
            .insert_note(NoteDraft::titled("office").in_notebook(work.id).normalize())
            .unwrap();

        let notes = store.notes_in_notebook(work.id).unwrap();
        assert_eq!(notes, vec![at_work]);
    }

    #[test]
    fn adjust_note_count_clamps_and_reports_missing() {
        let store = SqliteStore::in_memory().unwrap();

        let fallback = store
            .adjust_note_count(NotebookId::FALLBACK, -1)
            .unwrap()
            .unwrap();
        assert_eq!(fallback.note_count, 0);

        let fallback = store
            .adjust_note_count(NotebookId::FALLBACK, 3)
            .unwrap()
            .unwrap();
        assert_eq!(fallback.note_count, 3);

        assert!(
            store
                .adjust_note_count(NotebookId::new(99), 1)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn notebook_update_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let notebook = store
            .insert_notebook(NotebookDraft::named("Ideas").normalize())
            .unwrap();

        let renamed = store
            .update_notebook(
                notebook.id,
                &NotebookUpdate {
                    name: Some("Someday".to_string()),
                    color: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Someday");
        assert_eq!(renamed.color, notebook.color);

        assert!(store.delete_notebook(notebook.id).unwrap());
        assert!(store.get_notebook(notebook.id).unwrap().is_none());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_note(NoteDraft::titled("kept").normalize())
                .unwrap()
                .id
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_note(id).unwrap().unwrap().title, "kept");
    }

    #[test]
    fn millisecond_round_trip_is_exact() {
        let at = datetime!(2024-03-01 10:15:30.123 UTC);
        assert_eq!(from_millis(to_millis(at)).unwrap(), at);
    }
}
