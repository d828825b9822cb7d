//! Note editing: debounced autosave, formatting commands and the session
//! that ties them to a [`NoteService`](crate::NoteService).

mod format;
mod machine;
mod session;
mod timer;

pub use format::{
    Format, FormatError, HEADING_PLACEHOLDER, Selection, apply_format, insert_image,
    toolbar_visible,
};
pub use machine::{AutosaveMachine, SaveRequest, SaveState, SaveStatus};
pub use session::{EditorSession, NoteSaver, SaveEvent, SessionError};
pub use timer::DebounceTimer;

/// Idle window before an edit is saved.
pub const DEFAULT_AUTOSAVE_IDLE: std::time::Duration = std::time::Duration::from_millis(2000);
