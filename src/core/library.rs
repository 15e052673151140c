//! Content model and text import boundary.
//!
//! Imported text is split into paragraphs on runs of newline characters;
//! each segment is trimmed and empty segments are discarded. A [`Content`]
//! is immutable once created, and a [`Library`] keeps contents in insertion
//! order, which is also their display order.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

/// One imported text: a title plus its ordered paragraphs.
///
/// Paragraphs are the unit of synthesis, caching, and playback. Contents are
/// shared as `Arc<Content>` so a playback session can hold the text it was
/// started with even if the library changes underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    title: String,
    paragraphs: Vec<String>,
}

impl Content {
    /// Build a content item by splitting `text` into paragraphs.
    pub fn from_text(title: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            paragraphs: split_paragraphs(text),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// The paragraph at `index`, or `None` when out of range.
    pub fn paragraph(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(String::as_str)
    }

    /// Number of paragraphs.
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// Split a text blob on one-or-more consecutive newlines, trimming each
/// segment and dropping empty ones.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derive a content title from a file name or path: directory components are
/// dropped and a trailing `.txt` or `.nb` extension is stripped,
/// case-insensitively.
pub fn title_from_filename(name: &str) -> String {
    let name = Path::new(name)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(name);
    for ext in [".txt", ".nb"] {
        if name.len() > ext.len() && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext) {
            return name[..name.len() - ext.len()].to_string();
        }
    }
    name.to_string()
}

/// Ordered collection of imported contents.
///
/// Insertion order is display order. Deleting by index shifts later items
/// down; the caller is responsible for fixing up any indices it holds.
#[derive(Debug, Default)]
pub struct Library {
    items: Vec<Arc<Content>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a content item and return its index.
    pub fn add(&mut self, content: Content) -> usize {
        self.items.push(Arc::new(content));
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<Arc<Content>> {
        self.items.get(index).cloned()
    }

    /// Remove the item at `index`, returning it if it existed.
    pub fn remove(&mut self, index: usize) -> Option<Arc<Content>> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Content>> {
        self.items.iter()
    }
}
