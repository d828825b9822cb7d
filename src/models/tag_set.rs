use serde::{Deserialize, Serialize};

/// The tags on a note.
///
/// Keeps first-insertion order for display but never holds the same tag
/// twice. Tags are compared after trimming surrounding whitespace; blank
/// tags are rejected. A comma separates tags, so no tag ever contains one.
///
/// # Examples
///
/// ```
/// use inkdrop::TagSet;
///
/// let tags: TagSet = ["x", "x", " y ", "z, x"].into_iter().collect();
/// assert_eq!(tags.as_slice(), &["x", "y", "z"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag, returning `false` if it was blank or already present.
    ///
    /// Input holding commas is split and each piece added on its own; the
    /// result is `true` if any piece was new.
    pub fn insert(&mut self, tag: &str) -> bool {
        let mut added = false;
        for piece in tag.split(',').map(str::trim) {
            if piece.is_empty() || self.contains(piece) {
                continue;
            }
            self.0.push(piece.to_string());
            added = true;
        }
        added
    }

    /// Removes a tag, returning `true` if it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
