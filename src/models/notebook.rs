use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NotebookId;

/// Color given to notebooks created without one.
pub const DEFAULT_COLOR: &str = "#F59E0B";

/// Name given to notebooks created without one.
pub const DEFAULT_NOTEBOOK_NAME: &str = "Untitled Notebook";

/// A named, colored grouping of notes.
///
/// `note_count` is denormalized: it is adjusted by the note service when
/// notes are created, moved or deleted, never recomputed from the notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    #[serde(alias = "Id")]
    pub id: NotebookId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub note_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notebook {
    /// Returns the count after adding `delta`, clamped at zero.
    pub fn adjusted_count(&self, delta: i64) -> u32 {
        let next = i64::from(self.note_count).saturating_add(delta);
        u32::try_from(next.max(0)).unwrap_or(u32::MAX)
    }
}

/// Caller-supplied fields for a new notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookDraft {
    pub name: String,
    pub color: Option<String>,
}

impl NotebookDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Fills in defaults, producing the record a store inserts.
    pub fn normalize(self) -> NewNotebook {
        let name = self.name.trim();
        NewNotebook {
            name: if name.is_empty() {
                DEFAULT_NOTEBOOK_NAME.to_string()
            } else {
                name.to_string()
            },
            color: self
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        }
    }
}

/// A normalized notebook without the store-assigned fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotebook {
    pub name: String,
    pub color: String,
}

impl NewNotebook {
    pub fn into_notebook(self, id: NotebookId, now: OffsetDateTime) -> Notebook {
        Notebook {
            id,
            name: self.name,
            color: self.color,
            note_count: 0,
            created_at: now,
        }
    }
}

/// A partial update to a notebook.
///
/// The note count is not part of it; use the count adjustment instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl NotebookUpdate {
    pub fn apply_to(&self, notebook: &mut Notebook) {
        if let Some(name) = self.name.as_deref().map(str::trim)
            && !name.is_empty()
        {
            notebook.name = name.to_string();
        }
        if let Some(color) = &self.color {
            notebook.color.clone_from(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebook(count: u32) -> Notebook {
        NewNotebook {
            name: "Work".to_string(),
            color: DEFAULT_COLOR.to_string(),
        }
        .into_notebook(NotebookId::new(1), OffsetDateTime::now_utc())
        .with_count(count)
    }

    impl Notebook {
        fn with_count(mut self, count: u32) -> Self {
            self.note_count = count;
            self
        }
    }

    #[test]
    fn adjusted_count_is_floored_at_zero() {
        assert_eq!(notebook(0).adjusted_count(-1), 0);
        assert_eq!(notebook(1).adjusted_count(-1), 0);
        assert_eq!(notebook(3).adjusted_count(-10), 0);
    }

    #[test]
    fn adjusted_count_increments() {
        assert_eq!(notebook(0).adjusted_count(1), 1);
        assert_eq!(notebook(4).adjusted_count(2), 6);
    }

    #[test]
    fn draft_defaults_name_and_color() {
        let new = NotebookDraft::named("  ").normalize();
        assert_eq!(new.name, DEFAULT_NOTEBOOK_NAME);
        assert_eq!(new.color, DEFAULT_COLOR);

        let new = NotebookDraft::named(" Ideas ").with_color("#3B82F6").normalize();
        assert_eq!(new.name, "Ideas");
        assert_eq!(new.color, "#3B82F6");
    }

    #[test]
    fn update_ignores_blank_name() {
        let mut nb = notebook(0);
        NotebookUpdate {
            name: Some(" ".to_string()),
            color: Some("#10B981".to_string()),
        }
        .apply_to(&mut nb);

        assert_eq!(nb.name, "Work");
        assert_eq!(nb.color, "#10B981");
    }
}
