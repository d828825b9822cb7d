//! Mapping between the canonical models and the record API's column names.
//!
//! Outgoing records always use the `_c` suffixed columns. Incoming records
//! are decoded leniently: plain camelCase keys, array-or-string tags and
//! array-or-JSON-string attachments are all accepted.

use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::models::{
    Attachment, DEFAULT_COLOR, DEFAULT_NOTEBOOK_NAME, DEFAULT_TITLE, NewNote, NewNotebook, Note,
    NoteId, Notebook, NotebookId, TagSet,
};
use crate::store::{StoreError, now_millis};

pub const NOTE_FIELDS: [&str; 10] = [
    "Id",
    "title_c",
    "content_c",
    "notebook_id_c",
    "tags_c",
    "images_c",
    "attachments_c",
    "is_pinned_c",
    "CreatedOn",
    "ModifiedOn",
];

pub const NOTEBOOK_FIELDS: [&str; 5] = ["Id", "name_c", "color_c", "note_count_c", "CreatedOn"];

pub const NOTEBOOK_ID: &str = "notebook_id_c";
pub const MODIFIED_ON: &str = "ModifiedOn";

/// Tags as stored remotely: a comma-joined string, or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsField {
    Joined(String),
    Items(Vec<String>),
}

impl TagsField {
    fn into_tags(self) -> TagSet {
        match self {
            Self::Joined(joined) => joined.split(',').collect(),
            Self::Items(items) => items.into(),
        }
    }
}

/// An attachment list: JSON encoded into a text column, or a plain array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddedList {
    Encoded(String),
    Items(Vec<Attachment>),
}

impl EmbeddedList {
    fn into_items(self) -> Result<Vec<Attachment>, StoreError> {
        match self {
            Self::Encoded(text) if text.trim().is_empty() => Ok(Vec::new()),
            Self::Encoded(text) => Ok(serde_json::from_str(&text)?),
            Self::Items(items) => Ok(items),
        }
    }
}

/// A reference column: a bare id or a lookup object carrying `Id`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reference {
    Id(i64),
    Lookup {
        #[serde(rename = "Id")]
        id: i64,
    },
}

impl Reference {
    fn id(&self) -> i64 {
        match self {
            Self::Id(id) | Self::Lookup { id } => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NoteRecord {
    #[serde(rename = "Id", alias = "id")]
    id: i64,
    #[serde(rename = "title_c", alias = "title", default)]
    title: Option<String>,
    #[serde(rename = "content_c", alias = "content", default)]
    content: Option<String>,
    #[serde(rename = "notebook_id_c", alias = "notebookId", default)]
    notebook_id: Option<Reference>,
    #[serde(rename = "tags_c", alias = "tags", default)]
    tags: Option<TagsField>,
    #[serde(rename = "images_c", alias = "images", default)]
    images: Option<EmbeddedList>,
    #[serde(rename = "attachments_c", alias = "attachments", default)]
    attachments: Option<EmbeddedList>,
    #[serde(rename = "is_pinned_c", alias = "isPinned", default)]
    is_pinned: Option<bool>,
    #[serde(rename = "CreatedOn", alias = "createdAt", default)]
    created_on: Option<String>,
    #[serde(rename = "ModifiedOn", alias = "updatedAt", default)]
    modified_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotebookRecord {
    #[serde(rename = "Id", alias = "id")]
    id: i64,
    #[serde(rename = "name_c", alias = "name", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "color_c", alias = "color", default)]
    color: Option<String>,
    #[serde(rename = "note_count_c", alias = "noteCount", default)]
    note_count: Option<i64>,
    #[serde(rename = "CreatedOn", alias = "createdAt", default)]
    created_on: Option<String>,
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<OffsetDateTime>, StoreError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            OffsetDateTime::parse(s, &Rfc3339).map_err(|e| {
                StoreError::Decode(serde::de::Error::custom(format!("timestamp {s:?}: {e}")))
            })
        })
        .transpose()
}

/// Decodes one note record.
pub fn decode_note(value: Value) -> Result<Note, StoreError> {
    let record: NoteRecord = serde_json::from_value(value)?;
    let created_at = parse_timestamp(record.created_on.as_deref())?.unwrap_or_else(now_millis);
    let updated_at = parse_timestamp(record.modified_on.as_deref())?.unwrap_or(created_at);

    Ok(Note {
        id: NoteId::new(record.id),
        title: record
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        content: record.content.unwrap_or_default(),
        notebook_id: record
            .notebook_id
            .map(|r| NotebookId::new(r.id()))
            .unwrap_or_default(),
        tags: record.tags.map(TagsField::into_tags).unwrap_or_default(),
        images: record
            .images
            .map(EmbeddedList::into_items)
            .transpose()?
            .unwrap_or_default(),
        attachments: record
            .attachments
            .map(EmbeddedList::into_items)
            .transpose()?
            .unwrap_or_default(),
        is_pinned: record.is_pinned.unwrap_or(false),
        created_at,
        updated_at,
    })
}

/// Decodes one notebook record.
pub fn decode_notebook(value: Value) -> Result<Notebook, StoreError> {
    let record: NotebookRecord = serde_json::from_value(value)?;

    Ok(Notebook {
        id: NotebookId::new(record.id),
        name: record
            .name
            .unwrap_or_else(|| DEFAULT_NOTEBOOK_NAME.to_string()),
        color: record
            .color
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        note_count: u32::try_from(record.note_count.unwrap_or(0).max(0)).unwrap_or(u32::MAX),
        created_at: parse_timestamp(record.created_on.as_deref())?.unwrap_or_else(now_millis),
    })
}

fn join_tags(tags: &TagSet) -> String {
    tags.iter().collect::<Vec<_>>().join(",")
}

/// Columns written when creating a note.
pub fn encode_new_note(note: &NewNote) -> Result<Value, StoreError> {
    Ok(json!({
        "title_c": note.title,
        "content_c": note.content,
        "notebook_id_c": note.notebook_id.get(),
        "tags_c": join_tags(&note.tags),
        "images_c": serde_json::to_string(&note.images)?,
        "attachments_c": serde_json::to_string(&note.attachments)?,
        "is_pinned_c": false,
    }))
}

/// Every writable column of an existing note, keyed by `Id`.
pub fn encode_note(note: &Note) -> Result<Value, StoreError> {
    Ok(json!({
        "Id": note.id.get(),
        "title_c": note.title,
        "content_c": note.content,
        "notebook_id_c": note.notebook_id.get(),
        "tags_c": join_tags(&note.tags),
        "images_c": serde_json::to_string(&note.images)?,
        "attachments_c": serde_json::to_string(&note.attachments)?,
        "is_pinned_c": note.is_pinned,
    }))
}

pub fn encode_new_notebook(notebook: &NewNotebook) -> Value {
    json!({
        "name_c": notebook.name,
        "color_c": notebook.color,
        "note_count_c": 0,
    })
}

pub fn encode_notebook(notebook: &Notebook) -> Value {
    json!({
        "Id": notebook.id.get(),
        "name_c": notebook.name,
        "color_c": notebook.color,
        "note_count_c": notebook.note_count,
    })
}
