use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a note.
///
/// Wraps a store-assigned ID to provide type safety and prevent accidental
/// mixing of note and notebook IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Creates a new note ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotebookId(i64);

impl NotebookId {
    /// Notebook that receives notes created without an explicit notebook.
    pub const FALLBACK: NotebookId = NotebookId(1);

    /// Creates a new notebook ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for NotebookId {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for NotebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_serializes_as_raw_integer() {
        let id = NoteId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");

        let deserialized: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn notebook_id_defaults_to_fallback() {
        assert_eq!(NotebookId::default(), NotebookId::FALLBACK);
        assert_eq!(NotebookId::FALLBACK.get(), 1);
    }

    #[test]
    fn ids_are_not_interchangeable() {
        // These lines would fail to compile:
        // let note_id: NoteId = NotebookId::new(1);
        // let notebook_id: NotebookId = NoteId::new(1);

        let note_id = NoteId::new(1);
        let notebook_id = NotebookId::new(1);

        assert_eq!(note_id.get(), notebook_id.get());
    }
}
