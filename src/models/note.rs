use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Attachment, NoteId, NotebookId, TagSet};

/// Title given to notes saved without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// A note with its rich-text content and metadata.
///
/// `content` is an HTML fragment. Nothing outside the editor and the
/// plain-text extractor looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Store-assigned identifier, immutable once assigned.
    #[serde(alias = "Id")]
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub notebook_id: NotebookId,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub images: Vec<Attachment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Rewritten by the store on every mutation.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Builder for constructing `Note` instances with optional fields.
///
/// # Examples
///
/// ```
/// use inkdrop::{NoteBuilder, NoteId};
///
/// let note = NoteBuilder::new()
///     .id(NoteId::new(1))
///     .title("Groceries")
///     .content("<p>milk</p>")
///     .build();
///
/// assert_eq!(note.id, NoteId::new(1));
/// assert_eq!(note.title, "Groceries");
/// assert!(note.tags.is_empty());
/// assert!(!note.is_pinned);
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    title: Option<String>,
    content: Option<String>,
    notebook_id: Option<NotebookId>,
    tags: Option<TagSet>,
    images: Option<Vec<Attachment>>,
    attachments: Option<Vec<Attachment>>,
    is_pinned: bool,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl NoteBuilder {
    /// Creates a new `NoteBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn notebook_id(mut self, notebook_id: NotebookId) -> Self {
        self.notebook_id = Some(notebook_id);
        self
    }

    /// Sets the tags; duplicates are dropped.
    pub fn tags<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }

    pub fn images(mut self, images: Vec<Attachment>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn pinned(mut self, is_pinned: bool) -> Self {
        self.is_pinned = is_pinned;
        self
    }

    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Builds the `Note`, using defaults for optional fields.
    ///
    /// # Panics
    ///
    /// Panics if `id` has not been set.
    pub fn build(self) -> Note {
        let now = OffsetDateTime::now_utc();
        Note {
            id: self.id.expect("id is required"),
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: self.content.unwrap_or_default(),
            notebook_id: self.notebook_id.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            images: self.images.unwrap_or_default(),
            attachments: self.attachments.unwrap_or_default(),
            is_pinned: self.is_pinned,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}

/// Caller-supplied fields for a new note. Anything left out gets a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<NotebookId>,
    pub tags: Vec<String>,
    pub images: Vec<Attachment>,
    pub attachments: Vec<Attachment>,
}

impl NoteDraft {
    /// Starts a draft with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn in_notebook(mut self, notebook_id: NotebookId) -> Self {
        self.notebook_id = Some(notebook_id);
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Fills in defaults, producing the record a store inserts.
    pub fn normalize(self) -> NewNote {
        NewNote {
            title: normalize_title(self.title.as_deref()),
            content: self.content.unwrap_or_default(),
            notebook_id: self.notebook_id.unwrap_or_default(),
            tags: self.tags.into_iter().collect(),
            images: self.images,
            attachments: self.attachments,
        }
    }
}

/// A fully normalized note without the store-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub notebook_id: NotebookId,
    pub tags: TagSet,
    pub images: Vec<Attachment>,
    pub attachments: Vec<Attachment>,
}

impl NewNote {
    /// Turns this record into a stored note.
    pub fn into_note(self, id: NoteId, now: OffsetDateTime) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            notebook_id: self.notebook_id,
            tags: self.tags,
            images: self.images,
            attachments: self.attachments,
            is_pinned: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to a note. `None` leaves the field untouched.
///
/// There is deliberately no `updated_at` here: the store owns it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<NotebookId>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<Attachment>>,
    pub attachments: Option<Vec<Attachment>>,
    pub is_pinned: Option<bool>,
}

impl NoteUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tags<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn pinned(is_pinned: bool) -> Self {
        Self {
            is_pinned: Some(is_pinned),
            ..Self::default()
        }
    }

    /// Returns `true` if the update would not change any field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the set fields to `note`. Timestamps are left to the caller.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = normalize_title(Some(title));
        }
        if let Some(content) = &self.content {
            note.content.clone_from(content);
        }
        if let Some(notebook_id) = self.notebook_id {
            note.notebook_id = notebook_id;
        }
        if let Some(tags) = &self.tags {
            note.tags = tags.iter().collect();
        }
        if let Some(images) = &self.images {
            note.images.clone_from(images);
        }
        if let Some(attachments) = &self.attachments {
            note.attachments.clone_from(attachments);
        }
        if let Some(is_pinned) = self.is_pinned {
            note.is_pinned = is_pinned;
        }
    }
}

fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => DEFAULT_TITLE.to_string(),
    }
}
