//! Formatting commands over an HTML content fragment.
//!
//! Selections are byte ranges into the content. A command either produces
//! new content or an error; the input content is never modified in place.

use html_escape::{encode_double_quoted_attribute, encode_text};
use thiserror::Error;

use crate::markup;
use crate::models::Attachment;

/// Placeholder text of a heading inserted without a selection.
pub const HEADING_PLACEHOLDER: &str = "Heading";

/// A formatting command from the editor toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    /// Heading of level 1 to 3.
    Heading(u8),
    /// Bulleted list item.
    ListItem,
    /// Numbered list item.
    NumberedItem,
}

impl Format {
    fn wrap(self, inner: &str) -> Result<String, FormatError> {
        Ok(match self {
            Format::Bold => format!("<strong>{inner}</strong>"),
            Format::Italic => format!("<em>{inner}</em>"),
            Format::Underline => format!("<u>{inner}</u>"),
            Format::Heading(level @ 1..=3) => format!("<h{level}>{inner}</h{level}>"),
            Format::Heading(level) => return Err(FormatError::HeadingLevel(level)),
            Format::ListItem => format!("<ul><li>{inner}</li></ul>"),
            Format::NumberedItem => format!("<ol><li>{inner}</li></ol>"),
        })
    }
}

/// A range of the content, `start..end` in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty selection at `at`.
    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Why a formatting command could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("selection {start}..{end} is outside content of length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("selection boundary {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("selection splits an HTML tag")]
    SplitsTag,

    #[error("nothing is selected")]
    EmptySelection,

    #[error("heading level {0} is not supported (expected 1 to 3)")]
    HeadingLevel(u8),

    #[error("'{0}' is not an image")]
    NotAnImage(String),
}

/// The toolbar appears only while some text is selected.
pub fn toolbar_visible(selection: Option<Selection>) -> bool {
    selection.is_some_and(|s| !s.is_collapsed())
}

/// Whether byte offset `at` lies between a tag's `<` and `>`.
fn inside_tag(content: &str, at: usize) -> bool {
    markup::tags(content).any(|tag| tag.contains(at))
}

/// Wraps the selected range of `content` in the markup for `format`.
///
/// A heading applied to an empty selection inserts a placeholder heading;
/// every other format needs a non-empty selection.
///
/// # Examples
///
/// ```
/// use inkdrop::editor::{Format, Selection, apply_format};
///
/// let content = "<p>make this bold</p>";
/// let updated = apply_format(content, Format::Bold, Selection::new(8, 12)).unwrap();
/// assert_eq!(updated, "<p>make <strong>this</strong> bold</p>");
/// ```
pub fn apply_format(
    content: &str,
    format: Format,
    selection: Selection,
) -> Result<String, FormatError> {
    let Selection { start, end } = selection;
    if start > end || end > content.len() {
        return Err(FormatError::OutOfRange {
            start,
            end,
            len: content.len(),
        });
    }
    for at in [start, end] {
        if !content.is_char_boundary(at) {
            return Err(FormatError::NotCharBoundary(at));
        }
    }
    if inside_tag(content, start) || inside_tag(content, end) {
        return Err(FormatError::SplitsTag);
    }

    let selected = &content[start..end];
    if !markup::is_self_contained(selected) {
        return Err(FormatError::SplitsTag);
    }

    let inner = match (selected.is_empty(), format) {
        (true, Format::Heading(_)) => HEADING_PLACEHOLDER,
        (true, _) => return Err(FormatError::EmptySelection),
        (false, _) => selected,
    };

    let wrapped = format.wrap(inner)?;
    let mut updated = String::with_capacity(content.len() + wrapped.len());
    updated.push_str(&content[..start]);
    updated.push_str(&wrapped);
    updated.push_str(&content[end..]);
    Ok(updated)
}

/// Appends an inline `<img>` for an image attachment.
pub fn insert_image(content: &str, image: &Attachment) -> Result<String, FormatError> {
    if !image.is_image() {
        return Err(FormatError::NotAnImage(image.name.clone()));
    }
    Ok(format!(
        r#"{content}<img src="{}" alt="{}" />"#,
        encode_double_quoted_attribute(&image.url),
        encode_double_quoted_attribute(&encode_text(&image.name)),
    ))
}
