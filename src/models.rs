mod attachment;
mod ids;
mod note;
mod notebook;
mod tag_set;

pub use attachment::Attachment;
pub use ids::{NoteId, NotebookId};
pub use note::{DEFAULT_TITLE, NewNote, Note, NoteBuilder, NoteDraft, NoteUpdate};
pub use notebook::{
    DEFAULT_COLOR, DEFAULT_NOTEBOOK_NAME, NewNotebook, Notebook, NotebookDraft, NotebookUpdate,
};
pub use tag_set::TagSet;
