//! Tag scanning over HTML content fragments.
//!
//! Only element tags are recognized: `<name ...>`, `</name>` and `<name />`.
//! A `<` that does not start such a tag is ordinary text.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)[^>]*>").expect("tag pattern is valid")
});

/// Elements that never have a closing tag.
const VOID_ELEMENTS: [&str; 8] = ["br", "hr", "img", "input", "meta", "link", "source", "wbr"];

/// Elements that separate words when rendered.
const BLOCK_ELEMENTS: [&str; 16] = [
    "p",
    "div",
    "br",
    "li",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "tr",
    "td",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    /// `<br>`, `<img ... />` and other tags without a matching close.
    Empty,
}

/// One tag of a fragment, `start..end` in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub start: usize,
    pub end: usize,
    pub name: &'a str,
    pub kind: TagKind,
}

impl Tag<'_> {
    /// Whether `at` falls strictly between the tag's `<` and `>`.
    pub fn contains(&self, at: usize) -> bool {
        self.start < at && at < self.end
    }

    pub fn is_block(&self) -> bool {
        BLOCK_ELEMENTS
            .iter()
            .any(|block| block.eq_ignore_ascii_case(self.name))
    }

    /// Whether `other` names the same element, ignoring case.
    pub fn same_element(&self, other: &Tag<'_>) -> bool {
        self.name.eq_ignore_ascii_case(other.name)
    }
}

/// The tags of `html`, in document order.
pub fn tags(html: &str) -> impl Iterator<Item = Tag<'_>> {
    TAG.captures_iter(html).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(2)?.as_str();
        let closing = caps.get(1).is_some_and(|slash| !slash.is_empty());
        let kind = if closing {
            TagKind::Close
        } else if whole.as_str().ends_with("/>")
            || VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
        {
            TagKind::Empty
        } else {
            TagKind::Open
        };
        Some(Tag {
            start: whole.start(),
            end: whole.end(),
            name,
            kind,
        })
    })
}

/// Whether every element opened in `fragment` is closed in it, in order,
/// and nothing in it closes an element opened outside.
pub fn is_self_contained(fragment: &str) -> bool {
    let mut open: Vec<Tag<'_>> = Vec::new();
    for tag in tags(fragment) {
        match tag.kind {
            TagKind::Open => open.push(tag),
            TagKind::Close => match open.pop() {
                Some(opener) if opener.same_element(&tag) => {}
                _ => return false,
            },
            TagKind::Empty => {}
        }
    }
    open.is_empty()
}
