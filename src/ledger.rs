//! The pending-translation ledger.
//!
//! Every source item carries a ledger under the [`PENDING_LEDGER_FIELD`]
//! metadata key recording, per target language, which content fields and
//! which metadata fields changed since the last sync. The ledger is plain
//! data; [`crate::tracker::ChangeTracker`] owns reading and writing it.
//!
//! Serialization is a JSON object keyed by language tag. Unknown keys inside
//! an entry are ignored on read, and empty sets are omitted on write, so
//! ledgers written by older revisions keep loading.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::language::LanguageTag;
use crate::model::ContentField;

/// Metadata key holding the serialized ledger on a source item.
pub const PENDING_LEDGER_FIELD: &str = "_sync_pending";

/// Metadata key holding the RFC 3339 timestamp of the last completed sync.
pub const LAST_SYNCED_FIELD: &str = "_sync_synced_at";

/// Prefix marking crate-owned bookkeeping fields. Fields under it are never
/// routed, tracked or copied.
pub const RESERVED_PREFIX: &str = "_sync_";

/// Changes pending for one target language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Structured content fields (title, body, summary) that changed.
    #[serde(
        default,
        rename = "content",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub content_fields: BTreeSet<String>,

    /// Metadata field keys that changed.
    #[serde(default, rename = "fields", skip_serializing_if = "BTreeSet::is_empty")]
    pub meta_fields: BTreeSet<String>,
}

impl PendingEntry {
    pub fn is_empty(&self) -> bool {
        self.content_fields.is_empty() && self.meta_fields.is_empty()
    }

    /// True when `key` is flagged in either set.
    pub fn contains(&self, key: &str) -> bool {
        self.content_fields.contains(key) || self.meta_fields.contains(key)
    }

    /// Folds another entry into this one.
    pub fn merge(&mut self, other: &PendingEntry) {
        self.content_fields
            .extend(other.content_fields.iter().cloned());
        self.meta_fields.extend(other.meta_fields.iter().cloned());
    }
}

/// Pending changes for all target languages of one source item.
///
/// Entries are never empty: flagging inserts them, clearing prunes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingLedger {
    languages: BTreeMap<LanguageTag, PendingEntry>,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a content field for `language`. Returns `true` when the flag is
    /// new.
    pub fn flag_content(&mut self, language: &LanguageTag, field: ContentField) -> bool {
        self.languages
            .entry(language.clone())
            .or_default()
            .content_fields
            .insert(field.name().to_string())
    }

    /// Flags a metadata field key for `language`. Returns `true` when the
    /// flag is new.
    pub fn flag_meta(&mut self, language: &LanguageTag, key: &str) -> bool {
        self.languages
            .entry(language.clone())
            .or_default()
            .meta_fields
            .insert(key.to_string())
    }

    /// Pending changes for one language.
    pub fn entry(&self, language: &LanguageTag) -> Option<&PendingEntry> {
        self.languages.get(language)
    }

    /// Pending changes across all languages, merged.
    pub fn union(&self) -> PendingEntry {
        let mut merged = PendingEntry::default();
        for entry in self.languages.values() {
            merged.merge(entry);
        }
        merged
    }

    /// Pending changes for `language`, or the union when `None`.
    pub fn pending_for(&self, language: Option<&LanguageTag>) -> PendingEntry {
        match language {
            Some(language) => self.entry(language).cloned().unwrap_or_default(),
            None => self.union(),
        }
    }

    /// Whether anything is pending for `language` (or anywhere, when `None`).
    pub fn has_pending(&self, language: Option<&LanguageTag>) -> bool {
        match language {
            Some(language) => self.languages.contains_key(language),
            None => !self.languages.is_empty(),
        }
    }

    /// Whether a specific field key is pending.
    pub fn has_field(&self, language: Option<&LanguageTag>, key: &str) -> bool {
        match language {
            Some(language) => self
                .entry(language)
                .map(|entry| entry.contains(key))
                .unwrap_or(false),
            None => self.languages.values().any(|entry| entry.contains(key)),
        }
    }

    /// Languages with pending changes, in sorted order.
    pub fn languages(&self) -> Vec<LanguageTag> {
        self.languages.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Clears pending state and returns `true` when the ledger changed.
    ///
    /// The scope narrows with the arguments:
    /// - both `None`: drop everything
    /// - `language` only: drop that language's entry
    /// - `field` only: drop that field from every language
    /// - both: drop that field from that language
    ///
    /// Entries left empty by a field-level clear are pruned.
    pub fn clear(&mut self, field: Option<&str>, language: Option<&LanguageTag>) -> bool {
        match (field, language) {
            (None, None) => {
                let changed = !self.languages.is_empty();
                self.languages.clear();
                changed
            }
            (None, Some(language)) => self.languages.remove(language).is_some(),
            (Some(field), Some(language)) => {
                let Some(entry) = self.languages.get_mut(language) else {
                    return false;
                };
                let changed =
                    entry.content_fields.remove(field) | entry.meta_fields.remove(field);
                if entry.is_empty() {
                    self.languages.remove(language);
                }
                changed
            }
            (Some(field), None) => {
                let mut changed = false;
                self.languages.retain(|_, entry| {
                    changed |=
                        entry.content_fields.remove(field) | entry.meta_fields.remove(field);
                    !entry.is_empty()
                });
                changed
            }
        }
    }
}
