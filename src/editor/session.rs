use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::format::{self, Format, FormatError, Selection};
use super::machine::{AutosaveMachine, SaveRequest, SaveStatus};
use crate::models::{Attachment, Note, NoteId, NoteUpdate};
use crate::service::{NoteService, ServiceError};
use crate::store::Store;

/// Persists the content of one note on behalf of an [`EditorSession`].
pub trait NoteSaver: Send + Sync + 'static {
    fn save_content(&self, id: NoteId, content: &str) -> Result<Note, ServiceError>;
}

impl<S: Store + ?Sized + 'static> NoteSaver for NoteService<S> {
    fn save_content(&self, id: NoteId, content: &str) -> Result<Note, ServiceError> {
        self.update(id, &NoteUpdate::content(content))
    }
}

/// Outcome of a save, reported by [`EditorSession::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Saved { at: OffsetDateTime },
    Failed { error: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("timed out waiting for save to finish")]
    TimedOut,
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

enum Wait {
    Poll,
    For(Duration),
    Forever,
}

struct InFlight {
    ticket: u64,
    outcome: Receiver<Result<OffsetDateTime, String>>,
    handle: JoinHandle<()>,
}

/// Editing session for one note.
///
/// Wraps an [`AutosaveMachine`] and performs its saves on worker threads,
/// one at a time. The owner drives the session by calling
/// [`tick`](Self::tick) from its event loop.
///
/// Closing or dropping the session cancels the pending debounce, waits for
/// the in-flight save, and issues no further writes. Use
/// [`flush`](Self::flush) first to keep unsaved edits.
pub struct EditorSession {
    note_id: NoteId,
    saver: Arc<dyn NoteSaver>,
    machine: AutosaveMachine,
    in_flight: Option<InFlight>,
}

impl EditorSession {
    /// Opens a session on `note`, treating its current content as saved.
    pub fn open(saver: Arc<dyn NoteSaver>, note: &Note, idle: Duration) -> Self {
        debug!(note_id = %note.id, idle_ms = millis(idle), "opened editor session");
        Self {
            note_id: note.id,
            saver,
            machine: AutosaveMachine::new(note.content.clone(), idle, Some(note.updated_at)),
            in_flight: None,
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn content(&self) -> &str {
        self.machine.content()
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.machine.edit(content, Instant::now());
    }

    /// Applies a formatting command to the current content as an edit.
    ///
    /// # Errors
    ///
    /// Returns the [`FormatError`] and leaves the content unchanged when the
    /// command does not apply to `selection`.
    pub fn apply_format(
        &mut self,
        command: Format,
        selection: Selection,
    ) -> Result<(), FormatError> {
        let updated = format::apply_format(self.machine.content(), command, selection)?;
        self.edit(updated);
        Ok(())
    }

    pub fn insert_image(&mut self, image: &Attachment) -> Result<(), FormatError> {
        let updated = format::insert_image(self.machine.content(), image)?;
        self.edit(updated);
        Ok(())
    }

    /// Saves now instead of waiting for the idle window.
    pub fn save_now(&mut self) {
        if let Some(request) = self.machine.save_now() {
            self.dispatch(request);
        }
    }

    /// Collects a finished save and starts a due one.
    ///
    /// Returns the outcome of the save that finished since the last tick.
    pub fn tick(&mut self) -> Option<SaveEvent> {
        let event = self.receive(Wait::Poll);
        if let Some(request) = self.machine.poll(Instant::now()) {
            self.dispatch(request);
        }
        event
    }

    /// Saves pending edits and waits until they are stored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SaveFailed`] when a save fails and
    /// [`SessionError::TimedOut`] when saves are still running after
    /// `timeout`. Either way the edits remain unsaved.
    pub fn flush(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;
        if self.machine.is_dirty() {
            self.save_now();
        }

        loop {
            if self.in_flight.is_none() {
                if !self.machine.is_dirty() {
                    return Ok(());
                }
                let error = self.machine.last_error().unwrap_or("edits were not saved");
                return Err(SessionError::SaveFailed(error.to_string()));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::TimedOut);
            }
            if let Some(SaveEvent::Failed { error }) = self.receive(Wait::For(remaining)) {
                return Err(SessionError::SaveFailed(error));
            }
        }
    }

    /// Ends the session. See [`EditorSession`] for the teardown guarantees.
    pub fn close(mut self) -> Option<SaveEvent> {
        self.shut_down()
    }

    pub fn status(&self) -> SaveStatus {
        self.machine.status()
    }

    pub fn is_dirty(&self) -> bool {
        self.machine.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_saved(&self) -> Option<OffsetDateTime> {
        self.machine.last_saved()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.machine.last_error()
    }

    fn shut_down(&mut self) -> Option<SaveEvent> {
        if self.machine.is_shut_down() {
            return None;
        }
        self.machine.shut_down();
        if self.machine.is_dirty() {
            warn!(note_id = %self.note_id, "closing editor with unsaved changes");
        }
        self.receive(Wait::Forever)
    }

    fn dispatch(&mut self, request: SaveRequest) {
        let SaveRequest { ticket, content } = request;
        let saver = Arc::clone(&self.saver);
        let note_id = self.note_id;
        let (tx, rx) = mpsc::channel();

        debug!(note_id = %note_id, ticket, "saving note");
        let handle = thread::spawn(move || {
            let outcome = saver
                .save_content(note_id, &content)
                .map(|note| note.updated_at)
                .map_err(|error| error.to_string());
            // The session may already be gone; the outcome is then moot.
            let _ = tx.send(outcome);
        });

        self.in_flight = Some(InFlight {
            ticket,
            outcome: rx,
            handle,
        });
    }

    fn receive(&mut self, wait: Wait) -> Option<SaveEvent> {
        let flight = self.in_flight.as_ref()?;
        let received = match wait {
            Wait::Poll => match flight.outcome.try_recv() {
                Ok(outcome) => Some(outcome),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(worker_stopped())),
            },
            Wait::For(timeout) => match flight.outcome.recv_timeout(timeout) {
                Ok(outcome) => Some(outcome),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Err(worker_stopped())),
            },
            Wait::Forever => Some(flight.outcome.recv().unwrap_or_else(|_| Err(worker_stopped()))),
        };
        let outcome = received?;

        let InFlight { ticket, handle, .. } = self.in_flight.take()?;
        if handle.join().is_err() {
            warn!(note_id = %self.note_id, ticket, "save worker panicked");
        }

        let event = match &outcome {
            Ok(at) => {
                debug!(note_id = %self.note_id, ticket, "saved note");
                SaveEvent::Saved { at: *at }
            }
            Err(error) => {
                warn!(note_id = %self.note_id, ticket, %error, "save failed");
                SaveEvent::Failed {
                    error: error.clone(),
                }
            }
        };

        if let Some(follow_up) = self.machine.complete(ticket, outcome, Instant::now()) {
            self.dispatch(follow_up);
        }
        Some(event)
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.shut_down();
    }
}

fn worker_stopped() -> String {
    "save worker stopped before reporting".to_string()
}
