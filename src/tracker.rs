//! Change tracking for source items.
//!
//! The tracker watches edits on source items and flags what needs
//! re-translation in the per-item [`PendingLedger`]. Content fields are
//! always tracked; metadata fields only when their configured preference is
//! `Translate`. Flags land under every language that has a group member,
//! except the source's own.
//!
//! Ledger updates are read-modify-write cycles on a metadata field, so the
//! tracker serializes them through one async lock per item. Read APIs go
//! straight to storage without locking.
//!
//! Value comparison is strict: `0`, `"0"` and `false` are all different
//! values. The one deliberate asymmetry is that an absent field equals an
//! empty value (null, `""`, `[]`), so writing an empty value into an absent
//! field records no change, while emptying a real value does.

use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{HostError, SyncError};
use crate::host::{ContentRepository, FieldSubsystem, LinkingService};
use crate::language::LanguageTag;
use crate::ledger::{PendingEntry, PendingLedger, LAST_SYNCED_FIELD, PENDING_LEDGER_FIELD, RESERVED_PREFIX};
use crate::model::{is_empty_signal, ContentField, ItemId, TranslationPreference};

/// Flags pending translation work on source items.
pub struct ChangeTracker {
    repo: Arc<dyn ContentRepository>,
    links: Arc<dyn LinkingService>,
    fields: Option<Arc<dyn FieldSubsystem>>,
    reserved_prefixes: Vec<String>,
    locks: Mutex<HashMap<ItemId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChangeTracker {
    pub fn new(repo: Arc<dyn ContentRepository>, links: Arc<dyn LinkingService>) -> Self {
        Self {
            repo,
            links,
            fields: None,
            reserved_prefixes: Vec::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Attaches the field subsystem that supplies translation preferences.
    /// Without one, metadata field changes are never tracked.
    pub fn with_field_subsystem(mut self, fields: Arc<dyn FieldSubsystem>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Adds host-specific reserved prefixes on top of the crate's own.
    pub fn with_reserved_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.reserved_prefixes = prefixes;
        self
    }

    /// Records an edit to a structured content field.
    ///
    /// `old` is the value before the edit; when `None` it is read from
    /// storage, so callers invoking this before persisting their edit get
    /// the comparison for free.
    ///
    /// # Returns
    ///
    /// `true` when the change was flagged for at least one target language.
    pub async fn record_content_change(
        &self,
        item: ItemId,
        field: ContentField,
        old: Option<&str>,
        new: &str,
    ) -> Result<bool, SyncError> {
        let lock = self.lock_for(item);
        let _guard = lock.lock().await;

        let old_value = match old {
            Some(old) => old.to_string(),
            None => match self.repo.get(item).await? {
                Some(stored) => stored.content(field).to_string(),
                None => return Ok(false),
            },
        };
        if old_value == new {
            return Ok(false);
        }

        let Some(targets) = self.target_languages(item).await? else {
            return Ok(false);
        };
        if targets.is_empty() {
            return Ok(false);
        }

        let mut ledger = self.load_ledger(item).await?;
        for language in &targets {
            ledger.flag_content(language, field);
        }
        self.store_ledger(item, &ledger).await?;

        debug!(
            "Flagged content field '{}' on item {} for {} target languages",
            field,
            item,
            targets.len()
        );
        Ok(true)
    }

    /// Records a metadata field write.
    ///
    /// `old` is the value before the write (`None` means "read it from
    /// storage"; an absent field reads as no value). Only fields with a
    /// `Translate` preference are tracked.
    pub async fn record_field_set(
        &self,
        item: ItemId,
        key: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> Result<bool, SyncError> {
        if self.is_reserved(key) {
            return Ok(false);
        }

        let lock = self.lock_for(item);
        let _guard = lock.lock().await;

        let old_value = match old {
            Some(old) => Some(old.clone()),
            None => match self.stored_field(item, key).await? {
                FieldLookup::Value(value) => value,
                FieldLookup::ItemMissing => return Ok(false),
            },
        };
        let changed = match &old_value {
            Some(old_value) => old_value != new,
            // absent counts as empty, so writing an empty value is a no-op
            None => !is_empty_signal(new),
        };
        if !changed {
            return Ok(false);
        }

        self.flag_meta_change(item, key).await
    }

    /// Records a metadata field deletion.
    ///
    /// Deleting an absent or already-empty field records no change.
    pub async fn record_field_delete(
        &self,
        item: ItemId,
        key: &str,
        old: Option<&Value>,
    ) -> Result<bool, SyncError> {
        if self.is_reserved(key) {
            return Ok(false);
        }

        let lock = self.lock_for(item);
        let _guard = lock.lock().await;

        let old_value = match old {
            Some(old) => Some(old.clone()),
            None => match self.stored_field(item, key).await? {
                FieldLookup::Value(value) => value,
                FieldLookup::ItemMissing => return Ok(false),
            },
        };
        let changed = match &old_value {
            Some(old_value) => !is_empty_signal(old_value),
            None => false,
        };
        if !changed {
            return Ok(false);
        }

        self.flag_meta_change(item, key).await
    }

    /// Clears pending flags, narrowing with the arguments like
    /// [`PendingLedger::clear`]. When the ledger empties out, its metadata
    /// field is removed and the last-synced timestamp is stamped.
    ///
    /// # Returns
    ///
    /// `true` when any flag was removed.
    pub async fn clear(
        &self,
        item: ItemId,
        field: Option<&str>,
        language: Option<&LanguageTag>,
    ) -> Result<bool, SyncError> {
        let lock = self.lock_for(item);
        let _guard = lock.lock().await;

        let mut ledger = self.load_ledger(item).await?;
        if !ledger.clear(field, language) {
            return Ok(false);
        }
        self.store_ledger(item, &ledger).await?;
        Ok(true)
    }

    /// Pending changes for one language, or the union across all languages
    /// when `language` is `None`.
    pub async fn pending(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<PendingEntry, SyncError> {
        Ok(self.load_ledger(item).await?.pending_for(language))
    }

    /// Whether anything is pending.
    pub async fn has_pending(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<bool, SyncError> {
        Ok(self.load_ledger(item).await?.has_pending(language))
    }

    /// Whether a structured content field is pending.
    pub async fn has_pending_content(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<bool, SyncError> {
        Ok(!self.pending(item, language).await?.content_fields.is_empty())
    }

    /// Whether a metadata field is pending.
    pub async fn has_pending_meta(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<bool, SyncError> {
        Ok(!self.pending(item, language).await?.meta_fields.is_empty())
    }

    /// Pending structured content fields.
    pub async fn pending_content_fields(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<BTreeSet<String>, SyncError> {
        Ok(self.pending(item, language).await?.content_fields)
    }

    /// Pending metadata field keys.
    pub async fn pending_field_keys(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
    ) -> Result<BTreeSet<String>, SyncError> {
        Ok(self.pending(item, language).await?.meta_fields)
    }

    /// Whether one specific field is pending.
    pub async fn has_pending_field(
        &self,
        item: ItemId,
        language: Option<&LanguageTag>,
        key: &str,
    ) -> Result<bool, SyncError> {
        Ok(self.load_ledger(item).await?.has_field(language, key))
    }

    fn lock_for(&self, item: ItemId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        // clones are only handed out under this mutex; an entry nothing else
        // references belongs to a finished operation and can go
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(item)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn is_reserved(&self, key: &str) -> bool {
        key.starts_with(RESERVED_PREFIX)
            || self
                .reserved_prefixes
                .iter()
                .any(|prefix| key.starts_with(prefix))
    }

    async fn stored_field(&self, item: ItemId, key: &str) -> Result<FieldLookup, SyncError> {
        match self.repo.field_map(item).await {
            Ok(map) => Ok(FieldLookup::Value(map.get(key).cloned())),
            Err(HostError::NotFound(_)) => Ok(FieldLookup::ItemMissing),
            Err(err) => Err(err.into()),
        }
    }

    /// Gates a metadata change through the translation preference and the
    /// source check, then flags it for every target language.
    async fn flag_meta_change(&self, item: ItemId, key: &str) -> Result<bool, SyncError> {
        let Some(fields) = &self.fields else {
            return Ok(false);
        };
        if fields.translation_preference(key).await? != Some(TranslationPreference::Translate) {
            return Ok(false);
        }

        let Some(targets) = self.target_languages(item).await? else {
            return Ok(false);
        };
        if targets.is_empty() {
            return Ok(false);
        }

        let mut ledger = self.load_ledger(item).await?;
        for language in &targets {
            ledger.flag_meta(language, key);
        }
        self.store_ledger(item, &ledger).await?;

        debug!(
            "Flagged metadata field '{}' on item {} for {} target languages",
            key,
            item,
            targets.len()
        );
        Ok(true)
    }

    /// Group member languages other than the item's own, or `None` when the
    /// item is not a source item.
    async fn target_languages(
        &self,
        item: ItemId,
    ) -> Result<Option<Vec<LanguageTag>>, SyncError> {
        if !self.links.is_source_item(item).await? {
            return Ok(None);
        }
        let own = self.links.language_of(item).await?;
        let members = self.links.group_members(item).await?;
        Ok(Some(
            members
                .into_keys()
                .filter(|language| Some(language) != own.as_ref())
                .collect(),
        ))
    }

    async fn load_ledger(&self, item: ItemId) -> Result<PendingLedger, SyncError> {
        let map = match self.repo.field_map(item).await {
            Ok(map) => map,
            Err(HostError::NotFound(_)) => return Ok(PendingLedger::default()),
            Err(err) => return Err(err.into()),
        };
        let Some(raw) = map.get(PENDING_LEDGER_FIELD) else {
            return Ok(PendingLedger::default());
        };
        match serde_json::from_value(raw.clone()) {
            Ok(ledger) => Ok(ledger),
            Err(err) => {
                warn!(
                    "Pending ledger on item {} is unreadable ({}), starting fresh",
                    item, err
                );
                Ok(PendingLedger::default())
            }
        }
    }

    async fn store_ledger(&self, item: ItemId, ledger: &PendingLedger) -> Result<(), SyncError> {
        if ledger.is_empty() {
            self.repo.delete_field(item, PENDING_LEDGER_FIELD).await?;
            self.repo
                .set_field(
                    item,
                    LAST_SYNCED_FIELD,
                    Value::String(Utc::now().to_rfc3339()),
                )
                .await?;
            return Ok(());
        }

        let raw = serde_json::to_value(ledger)
            .map_err(|e| HostError::backend(format!("failed to serialize pending ledger: {}", e)))?;
        self.repo.set_field(item, PENDING_LEDGER_FIELD, raw).await?;
        Ok(())
    }
}

enum FieldLookup {
    /// The item exists; the field may or may not (inner `Option`).
    Value(Option<Value>),
    ItemMissing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use crate::model::{ItemStatus, NewItem};
    use serde_json::json;

    fn tag(code: &str) -> LanguageTag {
        LanguageTag::parse(code).expect("valid tag")
    }

    async fn add_translation(host: &MemoryHost, source: ItemId, code: &str) -> ItemId {
        let target = host
            .create(NewItem {
                title: format!("Translation {}", code),
                body: String::new(),
                summary: String::new(),
                status: ItemStatus::Draft,
            })
            .await
            .unwrap();
        host.assign_language(target, &tag(code)).await.unwrap();
        host.relate(source, target).await.unwrap();
        target
    }

    /// English source with German and French translations, subtitle marked
    /// translatable.
    async fn setup() -> (Arc<MemoryHost>, ChangeTracker, ItemId) {
        let host = Arc::new(MemoryHost::new());
        host.configure_field("subtitle", Some("text"), TranslationPreference::Translate);
        let source = host.seed_source(&tag("en"), "Hello", "Body text", "");
        add_translation(&host, source, "de").await;
        add_translation(&host, source, "fr").await;

        let tracker =
            ChangeTracker::new(host.clone(), host.clone()).with_field_subsystem(host.clone());
        (host, tracker, source)
    }

    // ==================== Content Change Tests ====================

    #[tokio::test]
    async fn test_content_change_flags_all_target_languages() {
        let (_host, tracker, source) = setup().await;

        let flagged = tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap();
        assert!(flagged);

        for code in ["de", "fr"] {
            let fields = tracker
                .pending_content_fields(source, Some(&tag(code)))
                .await
                .unwrap();
            assert!(fields.contains("title"), "expected title pending for {}", code);
        }
        // the source's own language never gets a flag
        assert!(!tracker.has_pending(source, Some(&tag("en"))).await.unwrap());
    }

    #[tokio::test]
    async fn test_unchanged_content_is_not_flagged() {
        let (_host, tracker, source) = setup().await;

        // stored title is "Hello"
        let flagged = tracker
            .record_content_change(source, ContentField::Title, None, "Hello")
            .await
            .unwrap();
        assert!(!flagged);
        assert!(!tracker.has_pending(source, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_supplied_old_value_wins_over_storage() {
        let (_host, tracker, source) = setup().await;

        let flagged = tracker
            .record_content_change(source, ContentField::Title, Some("same"), "same")
            .await
            .unwrap();
        assert!(!flagged);
    }

    #[tokio::test]
    async fn test_source_without_translations_records_nothing() {
        let host = Arc::new(MemoryHost::new());
        let source = host.seed_source(&tag("en"), "Alone", "", "");
        let tracker = ChangeTracker::new(host.clone(), host.clone());

        let flagged = tracker
            .record_content_change(source, ContentField::Title, None, "Alone v2")
            .await
            .unwrap();
        assert!(!flagged);
    }

    #[tokio::test]
    async fn test_non_source_items_are_ignored() {
        let (host, tracker, source) = setup().await;
        let target = host.translation_for(source, &tag("de")).await.unwrap().unwrap();

        let flagged = tracker
            .record_content_change(target, ContentField::Title, None, "Direct edit")
            .await
            .unwrap();
        assert!(!flagged);
    }

    #[tokio::test]
    async fn test_missing_item_records_nothing() {
        let (_host, tracker, _source) = setup().await;

        let flagged = tracker
            .record_content_change(ItemId(999), ContentField::Title, None, "x")
            .await
            .unwrap();
        assert!(!flagged);
    }

    // ==================== Metadata Field Tests ====================

    #[tokio::test]
    async fn test_translatable_field_set_is_flagged() {
        let (_host, tracker, source) = setup().await;

        let flagged = tracker
            .record_field_set(source, "subtitle", None, &json!("A subtitle"))
            .await
            .unwrap();
        assert!(flagged);

        let keys = tracker
            .pending_field_keys(source, Some(&tag("de")))
            .await
            .unwrap();
        assert!(keys.contains("subtitle"));
    }

    #[tokio::test]
    async fn test_field_without_translate_preference_is_not_tracked() {
        let (host, tracker, source) = setup().await;
        host.configure_field("price", None, TranslationPreference::Copy);

        assert!(!tracker
            .record_field_set(source, "price", None, &json!(99))
            .await
            .unwrap());
        assert!(!tracker
            .record_field_set(source, "unconfigured", None, &json!("text"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_fields_need_a_subsystem_to_be_tracked() {
        let host = Arc::new(MemoryHost::new());
        host.configure_field("subtitle", Some("text"), TranslationPreference::Translate);
        let source = host.seed_source(&tag("en"), "Hello", "", "");
        add_translation(&host, source, "de").await;

        // no field subsystem attached
        let tracker = ChangeTracker::new(host.clone(), host.clone());
        assert!(!tracker
            .record_field_set(source, "subtitle", None, &json!("text"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reserved_keys_are_never_tracked() {
        let (_host, tracker, source) = setup().await;

        assert!(!tracker
            .record_field_set(source, "_sync_pending", None, &json!("{}"))
            .await
            .unwrap());
        assert!(!tracker
            .record_field_delete(source, "_sync_synced_at", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_extra_reserved_prefixes_are_honored() {
        let (host, tracker, source) = setup().await;
        host.configure_field("_wp_edit_note", Some("text"), TranslationPreference::Translate);
        let tracker = tracker.with_reserved_prefixes(vec!["_wp_".to_string()]);

        assert!(!tracker
            .record_field_set(source, "_wp_edit_note", None, &json!("note"))
            .await
            .unwrap());
    }

    // ==================== Strict Comparison Tests ====================

    #[tokio::test]
    async fn test_falsy_values_are_distinct() {
        let (_host, tracker, source) = setup().await;

        // 0 -> "0" is a change
        assert!(tracker
            .record_field_set(source, "subtitle", Some(&json!(0)), &json!("0"))
            .await
            .unwrap());
        // "0" -> false is a change
        assert!(tracker
            .record_field_set(source, "subtitle", Some(&json!("0")), &json!(false))
            .await
            .unwrap());
        // 0 -> 0 is not
        assert!(!tracker
            .record_field_set(source, "subtitle", Some(&json!(0)), &json!(0))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_value_into_absent_field_is_no_change() {
        let (_host, tracker, source) = setup().await;

        for empty in [json!(null), json!(""), json!([])] {
            assert!(
                !tracker
                    .record_field_set(source, "subtitle", None, &empty)
                    .await
                    .unwrap(),
                "expected no flag for {:?} into absent field",
                empty
            );
        }
    }

    #[tokio::test]
    async fn test_emptying_a_real_value_is_a_change() {
        let (host, tracker, source) = setup().await;
        host.seed_field(source, "subtitle", json!("Original"));

        assert!(tracker
            .record_field_set(source, "subtitle", None, &json!(""))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_of_absent_or_empty_field_is_no_change() {
        let (host, tracker, source) = setup().await;

        assert!(!tracker
            .record_field_delete(source, "subtitle", None)
            .await
            .unwrap());

        host.seed_field(source, "subtitle", json!(""));
        assert!(!tracker
            .record_field_delete(source, "subtitle", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_of_real_value_is_flagged() {
        let (host, tracker, source) = setup().await;
        host.seed_field(source, "subtitle", json!("Original"));

        assert!(tracker
            .record_field_delete(source, "subtitle", None)
            .await
            .unwrap());
        assert!(tracker
            .has_pending_field(source, Some(&tag("fr")), "subtitle")
            .await
            .unwrap());
    }

    // ==================== Ledger Persistence Tests ====================

    #[tokio::test]
    async fn test_ledger_is_stored_under_reserved_field() {
        let (host, tracker, source) = setup().await;

        tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap();

        let raw = host
            .field_value(source, PENDING_LEDGER_FIELD)
            .expect("ledger field written");
        let ledger: PendingLedger = serde_json::from_value(raw).unwrap();
        assert!(ledger.has_field(Some(&tag("de")), "title"));
    }

    #[tokio::test]
    async fn test_corrupt_ledger_reads_as_empty_and_is_replaced() {
        let (host, tracker, source) = setup().await;
        host.seed_field(source, PENDING_LEDGER_FIELD, json!(["not", "a", "ledger"]));

        assert!(!tracker.has_pending(source, None).await.unwrap());

        assert!(tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap());
        assert!(tracker.has_pending(source, Some(&tag("de"))).await.unwrap());
    }

    // ==================== Clear Tests ====================

    #[tokio::test]
    async fn test_clear_cascades_and_stamps_when_empty() {
        let (host, tracker, source) = setup().await;
        tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap();
        tracker
            .record_field_set(source, "subtitle", None, &json!("Sub"))
            .await
            .unwrap();

        // field-level clear keeps the rest
        assert!(tracker.clear(source, Some("title"), Some(&tag("de"))).await.unwrap());
        assert!(tracker.has_pending(source, Some(&tag("de"))).await.unwrap());
        assert!(host.field_value(source, LAST_SYNCED_FIELD).is_none());

        // language-level clear drops the entry
        assert!(tracker.clear(source, None, Some(&tag("de"))).await.unwrap());
        assert!(!tracker.has_pending(source, Some(&tag("de"))).await.unwrap());
        assert!(tracker.has_pending(source, Some(&tag("fr"))).await.unwrap());

        // clearing the last entry removes the field and stamps the sync time
        assert!(tracker.clear(source, None, Some(&tag("fr"))).await.unwrap());
        assert!(host.field_value(source, PENDING_LEDGER_FIELD).is_none());
        let stamp = host
            .field_value(source, LAST_SYNCED_FIELD)
            .expect("timestamp written");
        let stamp = stamp.as_str().expect("timestamp is a string").to_string();
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[tokio::test]
    async fn test_clear_without_pending_is_a_no_op() {
        let (host, tracker, source) = setup().await;

        assert!(!tracker.clear(source, None, None).await.unwrap());
        assert!(host.field_value(source, LAST_SYNCED_FIELD).is_none());
    }

    // ==================== Read API Tests ====================

    #[tokio::test]
    async fn test_read_apis_union_across_languages() {
        let (_host, tracker, source) = setup().await;
        tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap();
        tracker.clear(source, Some("title"), Some(&tag("fr"))).await.unwrap();
        tracker
            .record_field_set(source, "subtitle", None, &json!("Sub"))
            .await
            .unwrap();

        let union = tracker.pending(source, None).await.unwrap();
        assert!(union.content_fields.contains("title"));
        assert!(union.meta_fields.contains("subtitle"));

        // per-kind checks narrow the same data
        assert!(tracker.has_pending_content(source, Some(&tag("de"))).await.unwrap());
        assert!(!tracker.has_pending_content(source, Some(&tag("fr"))).await.unwrap());
        assert!(tracker.has_pending_meta(source, Some(&tag("fr"))).await.unwrap());

        assert!(tracker
            .has_pending_field(source, Some(&tag("de")), "title")
            .await
            .unwrap());
        assert!(!tracker
            .has_pending_field(source, Some(&tag("fr")), "title")
            .await
            .unwrap());
        assert!(tracker.has_pending_field(source, None, "title").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_apis_on_unknown_item_are_empty() {
        let (_host, tracker, _source) = setup().await;

        assert!(!tracker.has_pending(ItemId(404), None).await.unwrap());
        assert!(tracker
            .pending_field_keys(ItemId(404), None)
            .await
            .unwrap()
            .is_empty());
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn test_concurrent_records_are_serialized_per_item() {
        let (host, _, source) = setup().await;
        for i in 0..8 {
            host.configure_field(
                &format!("meta_{}", i),
                Some("text"),
                TranslationPreference::Translate,
            );
        }
        let tracker = Arc::new(
            ChangeTracker::new(host.clone(), host.clone()).with_field_subsystem(host.clone()),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker
                    .record_field_set(
                        source,
                        &format!("meta_{}", i),
                        None,
                        &json!(format!("value {}", i)),
                    )
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let keys = tracker.pending_field_keys(source, Some(&tag("de"))).await.unwrap();
        assert_eq!(keys.len(), 8, "all concurrent flags must survive: {:?}", keys);
    }

    #[tokio::test]
    async fn test_idle_item_locks_are_pruned() {
        let (_host, tracker, source) = setup().await;

        for i in 0..32 {
            tracker
                .record_content_change(ItemId(500 + i), ContentField::Title, None, "x")
                .await
                .unwrap();
        }
        tracker
            .record_content_change(source, ContentField::Title, None, "Hello v2")
            .await
            .unwrap();

        let locks = tracker.locks.lock().unwrap();
        assert!(
            locks.len() <= 1,
            "finished items must not keep lock entries alive: {}",
            locks.len()
        );
    }
}
