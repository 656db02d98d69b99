//! Core data types shared across the crate.
//!
//! Items carry three well-known content fields (title, body, summary) plus an
//! open-ended field map of domain metadata. Field values are `serde_json`
//! values so handlers can route strings, numbers, arrays and nested objects
//! without a schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier for a content item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Draft,
    Pending,
    Published,
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Draft
    }
}

/// The three structured content fields every item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentField {
    Title,
    Body,
    Summary,
}

impl ContentField {
    /// All content fields, in the order they are translated.
    pub const ALL: [ContentField; 3] = [
        ContentField::Title,
        ContentField::Body,
        ContentField::Summary,
    ];

    /// Stable lowercase name used in ledgers and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ContentField::Title => "title",
            ContentField::Body => "body",
            ContentField::Summary => "summary",
        }
    }
}

impl fmt::Display for ContentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content item as read from the repository.
///
/// Language is deliberately absent: it is linking-service state, queried
/// through `LinkingService::language_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: ItemStatus,
}

impl ContentItem {
    /// Returns the value of a structured content field.
    pub fn content(&self, field: ContentField) -> &str {
        match field {
            ContentField::Title => &self.title,
            ContentField::Body => &self.body,
            ContentField::Summary => &self.summary,
        }
    }
}

/// Payload for creating a fresh item in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: ItemStatus,
}

/// Partial content update applied to an existing item.
///
/// `None` fields are left untouched by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub summary: Option<String>,
}

impl ContentUpdate {
    /// True when the update carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.summary.is_none()
    }
}

/// How a field should be carried over to translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationPreference {
    /// Route the value through a translation handler.
    Translate,
    /// Mirror the source value verbatim.
    #[default]
    Copy,
    /// Leave the target's value alone.
    Ignore,
}

/// Open-ended metadata attached to an item, keyed by field name.
pub type FieldMap = BTreeMap<String, Value>;

/// True for the values the change tracker treats as "cleared": JSON null, the
/// empty string and the empty array. Other falsy values (`0`, `"0"`, `false`,
/// `{}`) are ordinary data and compare by strict equality.
pub fn is_empty_signal(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
