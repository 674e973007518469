//! Module filter and keyword search over the active entry list.
//!
//! # Responsibility
//! - Narrow entries to one module kind.
//! - Match a case-insensitive substring against user-visible text fields.
//!
//! # Invariants
//! - Input order is preserved.
//! - A blank query text matches every entry.
//! - Photo and PDF filters require at least one attachment.

use crate::model::entry::Entry;
use crate::model::modules::ModuleKind;

/// Filter and search options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Keep only entries carrying this module.
    pub filter: Option<ModuleKind>,
    /// Case-insensitive substring.
    pub text: String,
}

impl EntryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            filter: None,
            text: text.into(),
        }
    }

    pub fn with_filter(mut self, kind: ModuleKind) -> Self {
        self.filter = Some(kind);
        self
    }
}

/// Applies `query` to `entries`.
pub fn search_entries<'a>(entries: &'a [Entry], query: &EntryQuery) -> Vec<&'a Entry> {
    let needle = query.text.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| query.filter.map_or(true, |kind| passes_filter(entry, kind)))
        .filter(|entry| needle.is_empty() || matches_text(entry, &needle))
        .collect()
}

fn passes_filter(entry: &Entry, kind: ModuleKind) -> bool {
    let modules = &entry.modules;
    match kind {
        ModuleKind::Photo => modules
            .photo
            .as_ref()
            .is_some_and(|photo| !photo.photos.is_empty()),
        ModuleKind::Pdf => modules.pdf.as_ref().is_some_and(|pdf| !pdf.pdfs.is_empty()),
        other => modules.has(other),
    }
}

fn matches_text(entry: &Entry, needle: &str) -> bool {
    let hit = |value: &str| value.to_lowercase().contains(needle);
    let modules = &entry.modules;

    hit(&entry.topic)
        || entry.description.as_deref().is_some_and(hit)
        || modules
            .tasks
            .as_ref()
            .is_some_and(|list| list.tasks.iter().any(|task| hit(&task.text)))
        || modules.birthday.as_ref().is_some_and(|b| hit(&b.name))
        || modules.link.as_ref().is_some_and(|link| hit(&link.url))
        || modules.expense.as_ref().is_some_and(|expense| {
            expense
                .items
                .iter()
                .any(|item| hit(&item.description) || item.amount.to_string().contains(needle))
        })
}
