/// Complete database schema for the local note store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// Tags, images and attachments are JSON arrays in TEXT columns; timestamps
/// are Unix milliseconds.
pub const INITIAL_SCHEMA: &str = r#"
-- Notebooks table: note_count is maintained by the note service
CREATE TABLE IF NOT EXISTS notebooks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    note_count INTEGER NOT NULL DEFAULT 0 CHECK (note_count >= 0),
    created_at INTEGER NOT NULL
);

-- Notes table: content is an HTML fragment
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    notebook_id INTEGER NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    images TEXT NOT NULL DEFAULT '[]',
    attachments TEXT NOT NULL DEFAULT '[]',
    is_pinned INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Index for recent-first listings
CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at);

-- Index for per-notebook listings
CREATE INDEX IF NOT EXISTS idx_notes_notebook ON notes(notebook_id);
"#;

/// Notebook every note falls back to. Inserted once, never overwritten.
pub const FALLBACK_NOTEBOOK: &str = r#"
INSERT OR IGNORE INTO notebooks (id, name, color, note_count, created_at)
VALUES (1, 'Personal', '#F59E0B', 0, CAST(strftime('%s', 'now') AS INTEGER) * 1000);
"#;
