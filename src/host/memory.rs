//! In-memory host used by tests and embedding experiments.
//!
//! `MemoryHost` implements all three collaborator traits over a single
//! mutex-guarded state table. Fault injection flips individual operations
//! into backend errors so failure paths (compensating deletion, non-fatal
//! finalization) can be exercised deterministically.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::error::HostError;
use crate::host::{ContentRepository, FieldSubsystem, LinkingService};
use crate::language::LanguageTag;
use crate::model::{
    ContentItem, ContentUpdate, FieldMap, ItemId, ItemStatus, NewItem, TranslationPreference,
};

/// Operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaultPoint {
    Create,
    Update,
    Delete,
    SetField,
    AssignLanguage,
    Relate,
    CopyManagedFields,
}

#[derive(Debug, Clone)]
struct StoredItem {
    title: String,
    body: String,
    summary: String,
    status: ItemStatus,
}

impl StoredItem {
    fn to_item(&self, id: ItemId) -> ContentItem {
        ContentItem {
            id,
            title: self.title.clone(),
            body: self.body.clone(),
            summary: self.summary.clone(),
            status: self.status,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    next_group: u64,
    items: BTreeMap<ItemId, StoredItem>,
    fields: BTreeMap<ItemId, FieldMap>,
    languages: BTreeMap<ItemId, LanguageTag>,
    /// target item -> the source it was translated from
    translated_from: BTreeMap<ItemId, ItemId>,
    /// item -> translation group
    groups: BTreeMap<ItemId, u64>,
    group_members: BTreeMap<u64, Vec<ItemId>>,
    field_types: BTreeMap<String, String>,
    field_prefs: BTreeMap<String, TranslationPreference>,
    faults: BTreeSet<FaultPoint>,
}

impl HostState {
    fn fail_if_injected(&self, point: FaultPoint) -> Result<(), HostError> {
        if self.faults.contains(&point) {
            return Err(HostError::backend(format!(
                "injected fault at {:?}",
                point
            )));
        }
        Ok(())
    }

    fn group_of(&mut self, id: ItemId) -> u64 {
        if let Some(group) = self.groups.get(&id) {
            return *group;
        }
        let group = self.next_group;
        self.next_group += 1;
        self.groups.insert(id, group);
        self.group_members.insert(group, vec![id]);
        group
    }
}

/// Mutex-guarded in-memory implementation of all host contracts.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost {
            state: Mutex::new(HostState {
                next_id: 1,
                next_group: 1,
                ..Default::default()
            }),
        }
    }

    /// Creates a published item, assigns its language and opens a fresh
    /// translation group around it.
    pub fn seed_source(
        &self,
        language: &LanguageTag,
        title: &str,
        body: &str,
        summary: &str,
    ) -> ItemId {
        let mut state = self.state.lock().unwrap();
        let id = ItemId(state.next_id);
        state.next_id += 1;
        state.items.insert(
            id,
            StoredItem {
                title: title.to_string(),
                body: body.to_string(),
                summary: summary.to_string(),
                status: ItemStatus::Published,
            },
        );
        state.fields.insert(id, FieldMap::new());
        state.languages.insert(id, language.clone());
        state.group_of(id);
        id
    }

    /// Writes a metadata field directly, bypassing fault injection.
    pub fn seed_field(&self, id: ItemId, key: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .fields
            .entry(id)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Declares a field's type and translation preference.
    pub fn configure_field(
        &self,
        key: &str,
        field_type: Option<&str>,
        preference: TranslationPreference,
    ) {
        let mut state = self.state.lock().unwrap();
        if let Some(field_type) = field_type {
            state
                .field_types
                .insert(key.to_string(), field_type.to_string());
        }
        state.field_prefs.insert(key.to_string(), preference);
    }

    pub fn inject_fault(&self, point: FaultPoint) {
        self.state.lock().unwrap().faults.insert(point);
    }

    pub fn clear_fault(&self, point: FaultPoint) {
        self.state.lock().unwrap().faults.remove(&point);
    }

    /// Number of items currently stored.
    pub fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Snapshot of a single field value, `None` when absent.
    pub fn field_value(&self, id: ItemId, key: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.fields.get(&id).and_then(|map| map.get(key)).cloned()
    }
}

#[async_trait]
impl ContentRepository for MemoryHost {
    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, HostError> {
        let state = self.state.lock().unwrap();
        Ok(state.items.get(&id).map(|stored| stored.to_item(id)))
    }

    async fn create(&self, item: NewItem) -> Result<ItemId, HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::Create)?;
        let id = ItemId(state.next_id);
        state.next_id += 1;
        state.items.insert(
            id,
            StoredItem {
                title: item.title,
                body: item.body,
                summary: item.summary,
                status: item.status,
            },
        );
        state.fields.insert(id, FieldMap::new());
        Ok(id)
    }

    async fn update(&self, id: ItemId, update: ContentUpdate) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::Update)?;
        let stored = state.items.get_mut(&id).ok_or(HostError::NotFound(id))?;
        if let Some(title) = update.title {
            stored.title = title;
        }
        if let Some(body) = update.body {
            stored.body = body;
        }
        if let Some(summary) = update.summary {
            stored.summary = summary;
        }
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::Delete)?;
        state.items.remove(&id).ok_or(HostError::NotFound(id))?;
        state.fields.remove(&id);
        state.languages.remove(&id);
        state.translated_from.remove(&id);
        if let Some(group) = state.groups.remove(&id) {
            if let Some(members) = state.group_members.get_mut(&group) {
                members.retain(|member| *member != id);
            }
        }
        Ok(())
    }

    async fn field_map(&self, id: ItemId) -> Result<FieldMap, HostError> {
        let state = self.state.lock().unwrap();
        if !state.items.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }
        Ok(state.fields.get(&id).cloned().unwrap_or_default())
    }

    async fn set_field(&self, id: ItemId, key: &str, value: Value) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::SetField)?;
        if !state.items.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }
        state
            .fields
            .entry(id)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_field(&self, id: ItemId, key: &str) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        if !state.items.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }
        if let Some(map) = state.fields.get_mut(&id) {
            map.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl LinkingService for MemoryHost {
    async fn language_of(&self, id: ItemId) -> Result<Option<LanguageTag>, HostError> {
        let state = self.state.lock().unwrap();
        Ok(state.languages.get(&id).cloned())
    }

    async fn group_members(
        &self,
        id: ItemId,
    ) -> Result<BTreeMap<LanguageTag, ItemId>, HostError> {
        let state = self.state.lock().unwrap();
        if !state.items.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }

        let mut members = BTreeMap::new();
        match state.groups.get(&id) {
            Some(group) => {
                for member in state.group_members.get(group).into_iter().flatten() {
                    if let Some(language) = state.languages.get(member) {
                        members.insert(language.clone(), *member);
                    }
                }
            }
            None => {
                if let Some(language) = state.languages.get(&id) {
                    members.insert(language.clone(), id);
                }
            }
        }
        Ok(members)
    }

    async fn is_source_item(&self, id: ItemId) -> Result<bool, HostError> {
        let state = self.state.lock().unwrap();
        Ok(state.items.contains_key(&id)
            && state.languages.contains_key(&id)
            && !state.translated_from.contains_key(&id))
    }

    async fn assign_language(&self, id: ItemId, language: &LanguageTag) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::AssignLanguage)?;
        if !state.items.contains_key(&id) {
            return Err(HostError::NotFound(id));
        }
        state.languages.insert(id, language.clone());
        Ok(())
    }

    async fn relate(&self, source: ItemId, target: ItemId) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::Relate)?;
        if !state.items.contains_key(&source) {
            return Err(HostError::NotFound(source));
        }
        if !state.items.contains_key(&target) {
            return Err(HostError::NotFound(target));
        }

        let group = state.group_of(source);
        if state.groups.get(&target) == Some(&group) {
            return Ok(());
        }
        if state.groups.contains_key(&target) {
            return Err(HostError::backend(format!(
                "item {} already belongs to another translation group",
                target
            )));
        }
        if let Some(language) = state.languages.get(&target).cloned() {
            let occupied = state
                .group_members
                .get(&group)
                .into_iter()
                .flatten()
                .any(|member| state.languages.get(member) == Some(&language));
            if occupied {
                return Err(HostError::backend(format!(
                    "group already holds an item in language '{}'",
                    language
                )));
            }
        }

        state.groups.insert(target, group);
        state
            .group_members
            .entry(group)
            .or_default()
            .push(target);
        state.translated_from.insert(target, source);
        Ok(())
    }

    async fn translation_for(
        &self,
        source: ItemId,
        language: &LanguageTag,
    ) -> Result<Option<ItemId>, HostError> {
        let members = self.group_members(source).await?;
        Ok(members.get(language).copied())
    }
}

#[async_trait]
impl FieldSubsystem for MemoryHost {
    async fn field_type(&self, _item: ItemId, key: &str) -> Result<Option<String>, HostError> {
        let state = self.state.lock().unwrap();
        Ok(state.field_types.get(key).cloned())
    }

    async fn translation_preference(
        &self,
        key: &str,
    ) -> Result<Option<TranslationPreference>, HostError> {
        let state = self.state.lock().unwrap();
        Ok(state.field_prefs.get(key).copied())
    }

    async fn copy_managed_fields(
        &self,
        source: ItemId,
        target: ItemId,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.fail_if_injected(FaultPoint::CopyManagedFields)?;
        if !state.items.contains_key(&source) {
            return Err(HostError::NotFound(source));
        }
        if !state.items.contains_key(&target) {
            return Err(HostError::NotFound(target));
        }

        let copy_keys: Vec<String> = state
            .field_prefs
            .iter()
            .filter(|(_, pref)| **pref == TranslationPreference::Copy)
            .map(|(key, _)| key.clone())
            .collect();
        for key in copy_keys {
            let value = state
                .fields
                .get(&source)
                .and_then(|map| map.get(&key))
                .cloned();
            let target_map = state.fields.entry(target).or_default();
            match value {
                Some(value) => {
                    target_map.insert(key, value);
                }
                None => {
                    target_map.remove(&key);
                }
            }
        }
        Ok(())
    }
}
