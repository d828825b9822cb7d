pub mod config;
pub mod db;
pub mod editor;
pub mod logging;
mod markup;
pub mod models;
pub mod pipeline;
pub mod record;
pub mod service;
pub mod store;
pub mod tui;
pub mod upload;
pub mod utils;

pub use config::{Backend, Config};
pub use db::Database;
pub use models::{
    Attachment, DEFAULT_TITLE, Note, NoteBuilder, NoteDraft, NoteId, NoteUpdate, Notebook,
    NotebookDraft, NotebookId, NotebookUpdate, TagSet,
};
pub use service::{Attached, DEFAULT_RECENT_LIMIT, NoteService, NotebookService, ServiceError};
pub use store::{MemoryStore, RemoteStore, SqliteStore, Store, StoreError};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let tags: TagSet = ["rust", "rust", " notes "].into_iter().collect();
        assert_eq!(tags.len(), 2);

        let note = NoteBuilder::new().id(NoteId::new(1)).content("test").build();
        assert_eq!(note.content, "test");
        assert_eq!(note.title, DEFAULT_TITLE);
        assert_eq!(note.notebook_id, NotebookId::FALLBACK);
    }

    #[test]
    fn service_runs_over_any_backend() {
        let stores: Vec<Arc<dyn Store>> = vec![
            Arc::new(MemoryStore::seeded()),
            Arc::new(SqliteStore::in_memory().unwrap()),
        ];
        for store in stores {
            let service = NoteService::new(store);
            let note = service.create(NoteDraft::titled("Portable")).unwrap();
            assert_eq!(service.get_by_id(note.id).unwrap().title, "Portable");
        }
    }
}
