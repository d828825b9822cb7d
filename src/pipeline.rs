//! Filtering and ordering of note listings.
//!
//! Everything here is a pure function of its inputs: the same source, query
//! and sort key always produce the same sequence, and filtering commutes
//! with sorting.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use html_escape::decode_html_entities;

use crate::markup;
use crate::models::{Note, NoteId};

/// Order of a note listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Newest first by creation time.
    Created,
    /// Most recently modified first.
    #[default]
    Updated,
    /// Alphabetical, ignoring case.
    Title,
    /// Pinned notes first, then most recently modified.
    Pinned,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Updated,
        SortKey::Created,
        SortKey::Title,
        SortKey::Pinned,
    ];

    /// The key after this one in [`SortKey::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Created => "Date Created",
            SortKey::Updated => "Last Modified",
            SortKey::Title => "Title",
            SortKey::Pinned => "Pinned First",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Created => "created",
            SortKey::Updated => "updated",
            SortKey::Title => "title",
            SortKey::Pinned => "pinned",
        };
        f.write_str(name)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(SortKey::Created),
            "updated" | "modified" => Ok(SortKey::Updated),
            "title" => Ok(SortKey::Title),
            "pinned" => Ok(SortKey::Pinned),
            other => Err(format!(
                "unknown sort key '{other}' (expected created, updated, title or pinned)"
            )),
        }
    }
}

/// Extracts readable text from an HTML fragment.
///
/// Tags are removed (block-level tags become word breaks), entities are
/// decoded and runs of whitespace collapse to a single space.
///
/// # Examples
///
/// ```
/// use inkdrop::pipeline::plain_text;
///
/// let text = plain_text("<h1>Trees</h1><p>Roots &amp; <b>branches</b></p>");
/// assert_eq!(text, "Trees Roots & branches");
/// ```
pub fn plain_text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut last = 0;
    for tag in markup::tags(html) {
        stripped.push_str(&html[last..tag.start]);
        if tag.is_block() {
            stripped.push(' ');
        }
        last = tag.end;
    }
    stripped.push_str(&html[last..]);

    decode_html_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncates `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Whether `note` belongs in a listing filtered by `query`.
///
/// Matches title, text content and tags without regard to case. A blank
/// query matches every note.
pub fn matches_query(note: &Note, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    contains_folded(&note.title, &needle)
        || contains_folded(&plain_text(&note.content), &needle)
        || note.tags.iter().any(|tag| contains_folded(tag, &needle))
}

/// Whether `note` is a hit for a full search.
///
/// Like [`matches_query`] but also looks at attachment names, and a blank
/// query matches nothing.
pub fn search_matches(note: &Note, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    matches_query(note, &needle)
        || note
            .attachments
            .iter()
            .any(|a| contains_folded(&a.name, &needle))
}

/// Total order for `key`. Ties are broken by ascending id.
pub fn compare(a: &Note, b: &Note, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Updated => b.updated_at.cmp(&a.updated_at),
        SortKey::Title => a
            .title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.title.cmp(&b.title)),
        SortKey::Pinned => b
            .is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.updated_at.cmp(&a.updated_at)),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// The notes of `source` matching `query`, ordered by `key`.
///
/// # Examples
///
/// ```
/// use inkdrop::pipeline::{SortKey, filter_and_sort};
/// use inkdrop::{NoteBuilder, NoteId};
///
/// let notes = vec![
///     NoteBuilder::new().id(NoteId::new(1)).title("beta").build(),
///     NoteBuilder::new().id(NoteId::new(2)).title("Alpha").build(),
///     NoteBuilder::new().id(NoteId::new(3)).title("gamma").tags(["x"]).build(),
/// ];
///
/// let sorted = filter_and_sort(&notes, "", SortKey::Title);
/// let titles: Vec<_> = sorted.iter().map(|n| n.title.as_str()).collect();
/// assert_eq!(titles, ["Alpha", "beta", "gamma"]);
///
/// assert_eq!(filter_and_sort(&notes, "X", SortKey::Title).len(), 1);
/// ```
pub fn filter_and_sort(source: &[Note], query: &str, key: SortKey) -> Vec<Note> {
    let mut notes: Vec<Note> = source
        .iter()
        .filter(|note| matches_query(note, query))
        .cloned()
        .collect();
    notes.sort_by(|a, b| compare(a, b, key));
    notes
}

/// A note listing that recomputes its visible sequence on every change of
/// source, query or sort key.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    source: Vec<Note>,
    query: String,
    sort: SortKey,
    visible: Vec<Note>,
}

impl ListView {
    pub fn new(source: Vec<Note>) -> Self {
        let mut view = Self {
            source,
            ..Self::default()
        };
        view.refresh();
        view
    }

    pub fn set_source(&mut self, source: Vec<Note>) {
        self.source = source;
        self.refresh();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.refresh();
    }

    /// Replaces the note with the same id, or adds it.
    pub fn upsert(&mut self, note: Note) {
        match self.source.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => self.source.push(note),
        }
        self.refresh();
    }

    pub fn remove(&mut self, id: NoteId) {
        self.source.retain(|n| n.id != id);
        self.refresh();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn source(&self) -> &[Note] {
        &self.source
    }

    pub fn visible(&self) -> &[Note] {
        &self.visible
    }

    fn refresh(&mut self) {
        self.visible = filter_and_sort(&self.source, &self.query, self.sort);
    }
}

/// A tag and the number of notes carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// Unique tags across `notes`, most used first, then by name.
pub fn tag_counts(notes: &[Note]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in notes.iter().flat_map(|n| n.tags.iter()) {
        *counts.entry(tag).or_default() += 1;
    }

    let mut tags: Vec<TagCount> = counts
        .into_iter()
        .map(|(name, count)| TagCount {
            name: name.to_string(),
            count,
        })
        .collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tags
}
