//! Host collaborator contracts.
//!
//! The engine never talks to a CMS directly. Everything it needs from the
//! surrounding platform flows through three traits:
//!
//! - [`ContentRepository`]: item CRUD plus the open-ended field map
//! - [`LinkingService`]: language assignment and translation-group structure
//! - [`FieldSubsystem`]: field type metadata and translation preferences
//!
//! [`memory::MemoryHost`] implements all three in memory for tests and
//! embedding experiments.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::HostError;
use crate::language::LanguageTag;
use crate::model::{ContentItem, ContentUpdate, FieldMap, ItemId, NewItem, TranslationPreference};

/// Storage for content items and their metadata fields.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetches an item, or `None` when the id is unknown.
    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, HostError>;

    /// Creates a new item and returns its id.
    ///
    /// The item starts without a language; callers attach one through
    /// [`LinkingService::assign_language`].
    async fn create(&self, item: NewItem) -> Result<ItemId, HostError>;

    /// Applies a partial content update to an existing item.
    async fn update(&self, id: ItemId, update: ContentUpdate) -> Result<(), HostError>;

    /// Removes an item together with its fields and language assignment.
    async fn delete(&self, id: ItemId) -> Result<(), HostError>;

    /// Returns the full metadata field map of an item.
    async fn field_map(&self, id: ItemId) -> Result<FieldMap, HostError>;

    /// Writes a single metadata field.
    async fn set_field(&self, id: ItemId, key: &str, value: Value) -> Result<(), HostError>;

    /// Deletes a single metadata field. Deleting an absent field is a no-op.
    async fn delete_field(&self, id: ItemId, key: &str) -> Result<(), HostError>;
}

/// Language assignment and translation-group bookkeeping.
#[async_trait]
pub trait LinkingService: Send + Sync {
    /// The language assigned to an item, or `None` when unassigned.
    async fn language_of(&self, id: ItemId) -> Result<Option<LanguageTag>, HostError>;

    /// All members of the item's translation group, keyed by language.
    ///
    /// An item outside any group forms a group of one (itself), provided it
    /// has a language.
    async fn group_members(
        &self,
        id: ItemId,
    ) -> Result<BTreeMap<LanguageTag, ItemId>, HostError>;

    /// True when the item is the original of its group rather than a
    /// translation.
    async fn is_source_item(&self, id: ItemId) -> Result<bool, HostError>;

    /// Assigns (or reassigns) an item's language.
    async fn assign_language(&self, id: ItemId, language: &LanguageTag) -> Result<(), HostError>;

    /// Records `target` as a translation of `source`, joining it to the
    /// source's group. Relating an already-related pair is a no-op.
    async fn relate(&self, source: ItemId, target: ItemId) -> Result<(), HostError>;

    /// The group member holding `language`, or `None` when no translation in
    /// that language exists yet.
    async fn translation_for(
        &self,
        source: ItemId,
        language: &LanguageTag,
    ) -> Result<Option<ItemId>, HostError>;
}

/// Structured-field metadata: types, translation preferences and the
/// host-managed copy pass.
#[async_trait]
pub trait FieldSubsystem: Send + Sync {
    /// The declared type of a field on an item (`"text"`, `"image"`, ...),
    /// or `None` when the field is not governed by the subsystem.
    async fn field_type(&self, item: ItemId, key: &str) -> Result<Option<String>, HostError>;

    /// The configured translation preference for a field key, or `None`
    /// when the key has no declared preference.
    async fn translation_preference(
        &self,
        key: &str,
    ) -> Result<Option<TranslationPreference>, HostError>;

    /// Mirrors all copy-preference fields from `source` onto `target`.
    async fn copy_managed_fields(&self, source: ItemId, target: ItemId)
        -> Result<(), HostError>;
}
