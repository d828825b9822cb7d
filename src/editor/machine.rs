use std::fmt;
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use super::timer::DebounceTimer;
use crate::utils::format_ago;

/// Where the editor's content stands relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Content matches the last successful save.
    Clean,
    /// Content changed; a save is scheduled for the end of the idle window.
    Dirty,
    /// A save is in flight and nothing changed since it was issued.
    Saving,
    /// A save is in flight and content changed after it was issued.
    DirtyWhileSaving,
}

/// A save the driver must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Identifies the save when its outcome is reported back.
    pub ticket: u64,
    pub content: String,
}

/// Save indicator shown next to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Unsaved,
    Saved(OffsetDateTime),
    NotSaved,
}

impl SaveStatus {
    /// Indicator text, with the saved time relative to `now`.
    pub fn label(&self, now: OffsetDateTime) -> String {
        match self {
            SaveStatus::Saving => "Saving...".to_string(),
            SaveStatus::Unsaved => "Unsaved changes".to_string(),
            SaveStatus::Saved(at) => format!("Saved {}", format_ago(*at, now)),
            SaveStatus::NotSaved => "Not saved".to_string(),
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label(OffsetDateTime::now_utc()))
    }
}

/// Debounced autosave for one note.
///
/// The machine is driven entirely by its caller: edits and explicit saves
/// come in, [`SaveRequest`]s go out, and save outcomes are reported back with
/// [`AutosaveMachine::complete`]. It never performs I/O and never reads the
/// clock, so every transition is reproducible.
///
/// At most one save is in flight. Edits made while a save is in flight are
/// saved by exactly one follow-up request carrying the latest content.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use inkdrop::editor::{AutosaveMachine, SaveState};
///
/// let start = Instant::now();
/// let mut machine = AutosaveMachine::new("", Duration::from_secs(2), None);
///
/// machine.edit("h", start);
/// machine.edit("hi", start + Duration::from_millis(500));
/// assert!(machine.poll(start + Duration::from_millis(2000)).is_none());
///
/// let request = machine.poll(start + Duration::from_millis(2500)).unwrap();
/// assert_eq!(request.content, "hi");
/// assert_eq!(machine.state(), SaveState::Saving);
/// ```
#[derive(Debug, Clone)]
pub struct AutosaveMachine {
    state: SaveState,
    content: String,
    timer: DebounceTimer,
    next_ticket: u64,
    in_flight: Option<u64>,
    follow_up_now: bool,
    shut_down: bool,
    last_saved: Option<OffsetDateTime>,
    last_error: Option<String>,
}

impl AutosaveMachine {
    /// Starts clean with `content` as already persisted.
    pub fn new(
        content: impl Into<String>,
        idle: Duration,
        last_saved: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            state: SaveState::Clean,
            content: content.into(),
            timer: DebounceTimer::new(idle),
            next_ticket: 1,
            in_flight: None,
            follow_up_now: false,
            shut_down: false,
            last_saved,
            last_error: None,
        }
    }

    /// Records new content. Content identical to the current content is not
    /// an edit.
    pub fn edit(&mut self, content: impl Into<String>, now: Instant) {
        let content = content.into();
        if self.shut_down || content == self.content {
            return;
        }
        self.content = content;

        match self.state {
            SaveState::Clean | SaveState::Dirty => {
                self.state = SaveState::Dirty;
                self.timer.arm(now);
            }
            SaveState::Saving | SaveState::DirtyWhileSaving => {
                self.state = SaveState::DirtyWhileSaving;
            }
        }
    }

    /// Issues the debounced save once the idle window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<SaveRequest> {
        if self.shut_down || self.state != SaveState::Dirty || !self.timer.is_due(now) {
            return None;
        }
        Some(self.start_save())
    }

    /// Saves immediately, skipping the idle window.
    ///
    /// With a save already in flight the request is coalesced: one follow-up
    /// is issued as soon as the in-flight save succeeds.
    pub fn save_now(&mut self) -> Option<SaveRequest> {
        if self.shut_down {
            return None;
        }
        match self.state {
            SaveState::Clean | SaveState::Dirty => Some(self.start_save()),
            SaveState::Saving | SaveState::DirtyWhileSaving => {
                self.state = SaveState::DirtyWhileSaving;
                self.follow_up_now = true;
                None
            }
        }
    }

    /// Reports the outcome of the save identified by `ticket`.
    ///
    /// Returns the follow-up save to issue, if one is owed. Outcomes for any
    /// ticket other than the in-flight one are ignored.
    pub fn complete(
        &mut self,
        ticket: u64,
        outcome: Result<OffsetDateTime, String>,
        now: Instant,
    ) -> Option<SaveRequest> {
        if self.in_flight != Some(ticket) {
            return None;
        }
        self.in_flight = None;

        match outcome {
            Ok(saved_at) => {
                self.last_saved = Some(saved_at);
                self.last_error = None;
                match self.state {
                    SaveState::DirtyWhileSaving if self.follow_up_now && !self.shut_down => {
                        self.follow_up_now = false;
                        Some(self.start_save())
                    }
                    SaveState::DirtyWhileSaving => {
                        self.follow_up_now = false;
                        self.state = SaveState::Dirty;
                        if !self.shut_down {
                            self.timer.arm(now);
                        }
                        None
                    }
                    _ => {
                        self.state = SaveState::Clean;
                        None
                    }
                }
            }
            Err(error) => {
                self.last_error = Some(error);
                self.follow_up_now = false;
                self.state = SaveState::Dirty;
                if !self.shut_down {
                    self.timer.arm(now);
                }
                None
            }
        }
    }

    /// Stops scheduling: the timer is cancelled and no further request is
    /// ever issued. An in-flight save may still be completed.
    pub fn shut_down(&mut self) {
        self.shut_down = true;
        self.follow_up_now = false;
        self.timer.cancel();
    }

    fn start_save(&mut self) -> SaveRequest {
        self.timer.cancel();
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.state = SaveState::Saving;
        SaveRequest {
            ticket,
            content: self.content.clone(),
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.state, SaveState::Dirty | SaveState::DirtyWhileSaving)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// When the debounced save will fire, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn last_saved(&self) -> Option<OffsetDateTime> {
        self.last_saved
    }

    /// Error of the most recent failed save, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> SaveStatus {
        if self.in_flight.is_some() {
            SaveStatus::Saving
        } else if self.is_dirty() {
            SaveStatus::Unsaved
        } else if let Some(at) = self.last_saved {
            SaveStatus::Saved(at)
        } else {
            SaveStatus::NotSaved
        }
    }
}
