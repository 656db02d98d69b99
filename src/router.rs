//! Metadata field routing.
//!
//! When an item is synced, every metadata field on the source is offered to
//! a chain of [`FieldHandler`]s ordered by priority (lowest first). The
//! first handler that claims a field applies it to the target; handlers
//! registered at the same priority keep their registration order.
//!
//! Before the chain runs, three checks short-circuit a field:
//!
//! 1. reserved keys (the crate's own bookkeeping plus host prefixes) are
//!    left alone,
//! 2. field-key references (`field_abc123` style values) are copied
//!    verbatim so structural wiring survives the sync,
//! 3. fields not classified `translate` are skipped and left to the host's
//!    own copy mechanism. Unconfigured fields classify as copy. Without a
//!    field subsystem there is no classification at all and every field
//!    reaches the chain.
//!
//! Handler errors never abort a sync. They are collected per field in the
//! [`RouteReport`] and the remaining fields are still routed.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::host::{ContentRepository, FieldSubsystem};
use crate::language::LanguageTag;
use crate::ledger::RESERVED_PREFIX;
use crate::metrics::SyncMetrics;
use crate::model::{is_empty_signal, ItemId, TranslationPreference};
use crate::provider::registry::ProviderRegistry;

/// Fields shorter than this are copied instead of translated by the
/// fallback store handler.
pub const DEFAULT_MIN_TRANSLATE_LEN: usize = 3;

static FIELD_KEY_REFERENCE: OnceLock<Regex> = OnceLock::new();

/// Matches internal field-key reference values like `field_5f4e21ab`.
/// These wire a value to its field definition and must never be translated.
pub fn is_field_key_reference(text: &str) -> bool {
    FIELD_KEY_REFERENCE
        .get_or_init(|| Regex::new(r"^field_[A-Za-z0-9_]+$").unwrap())
        .is_match(text)
}

/// Everything a handler needs to route one item's fields.
pub struct FieldCx<'a> {
    pub repo: &'a dyn ContentRepository,
    pub fields: Option<&'a dyn FieldSubsystem>,
    pub providers: &'a ProviderRegistry,
    pub source: ItemId,
    pub target: ItemId,
    pub source_language: &'a LanguageTag,
    pub target_language: &'a LanguageTag,
}

impl FieldCx<'_> {
    /// Declared type of a source field, when a field subsystem knows it.
    pub async fn field_type(&self, key: &str) -> Option<String> {
        match self.fields {
            Some(fields) => fields.field_type(self.source, key).await.ok().flatten(),
            None => None,
        }
    }

    /// Translates into the target language, with the source language as an
    /// explicit hint. Errors are stringified for per-field reporting.
    pub async fn translate(&self, text: &str) -> Result<String, String> {
        self.providers
            .translate(text, self.target_language, Some(self.source_language))
            .await
            .map_err(|e| e.to_string())
    }
}

/// One strategy in the routing chain.
#[async_trait]
pub trait FieldHandler: Send + Sync {
    /// Stable identifier, used in logs.
    fn id(&self) -> &str;

    /// Chain position; lower runs first.
    fn priority(&self) -> i32;

    /// Whether this handler takes responsibility for the field.
    async fn claims(&self, cx: &FieldCx<'_>, key: &str, value: &Value) -> bool;

    /// Applies the field to the target item.
    async fn apply(&self, cx: &FieldCx<'_>, key: &str, value: &Value) -> Result<(), String>;
}

/// Outcome of routing one item's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// Fields a handler applied successfully.
    pub translated: usize,
    /// Fields deliberately left alone or copied verbatim.
    pub skipped: usize,
    /// Per-field failure messages, keyed by field name.
    pub errors: BTreeMap<String, String>,
}

impl RouteReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The set of field types whose string values get machine translated.
///
/// Registration is idempotent; registering a known type returns `false`.
pub struct FieldTypeRegistry {
    types: RwLock<BTreeSet<String>>,
}

impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(BTreeSet::new()),
        }
    }

    /// Registry preloaded with the standard text-bearing types.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for field_type in ["text", "textarea", "wysiwyg"] {
            registry.register(field_type);
        }
        registry
    }

    pub fn register(&self, field_type: &str) -> bool {
        self.types.write().unwrap().insert(field_type.to_string())
    }

    pub fn is_translatable(&self, field_type: &str) -> bool {
        self.types.read().unwrap().contains(field_type)
    }

    pub fn translatable_types(&self) -> Vec<String> {
        self.types.read().unwrap().iter().cloned().collect()
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Routes fields through the handler chain.
pub struct FieldRouter {
    handlers: Vec<Arc<dyn FieldHandler>>,
    reserved_prefixes: Vec<String>,
    metrics: Arc<SyncMetrics>,
}

impl FieldRouter {
    /// A router with no handlers; every field will be counted as skipped
    /// until handlers are registered.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            reserved_prefixes: Vec::new(),
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    /// A router with the two built-in handlers: typed fields at priority 10
    /// and the store fallback at priority 100.
    pub fn with_defaults(types: Arc<FieldTypeRegistry>, min_translate_len: usize) -> Self {
        let mut router = Self::new();
        router.register_handler(Arc::new(TypedFieldHandler::new(types)));
        router.register_handler(Arc::new(StoreFieldHandler::new(min_translate_len)));
        router
    }

    /// Shares a metrics instance with the rest of the pipeline.
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Adds host-specific reserved prefixes on top of the crate's own.
    pub fn with_reserved_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.reserved_prefixes = prefixes;
        self
    }

    /// Inserts a handler at its priority position. Handlers with equal
    /// priority stay in registration order.
    ///
    /// # Returns
    ///
    /// `false` when a handler with the same id is already in the chain; the
    /// existing registration is kept untouched.
    pub fn register_handler(&mut self, handler: Arc<dyn FieldHandler>) -> bool {
        if self
            .handlers
            .iter()
            .any(|existing| existing.id() == handler.id())
        {
            warn!(
                "Field handler '{}' is already registered, keeping the existing one",
                handler.id()
            );
            return false;
        }

        let position = self
            .handlers
            .iter()
            .position(|existing| existing.priority() > handler.priority())
            .unwrap_or(self.handlers.len());
        self.handlers.insert(position, handler);
        true
    }

    /// Handler ids in chain order.
    pub fn handler_ids(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.id()).collect()
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        self.metrics.clone()
    }

    fn is_reserved(&self, key: &str) -> bool {
        key.starts_with(RESERVED_PREFIX)
            || self
                .reserved_prefixes
                .iter()
                .any(|prefix| key.starts_with(prefix))
    }

    /// Routes every metadata field of `cx.source` onto `cx.target`.
    ///
    /// Fails only when the source field map cannot be read; everything
    /// after that is reported per field.
    pub async fn route_all(&self, cx: &FieldCx<'_>) -> Result<RouteReport, SyncError> {
        let map = cx.repo.field_map(cx.source).await?;
        let mut report = RouteReport::default();

        for (key, value) in &map {
            if self.is_reserved(key) {
                report.skipped += 1;
                self.metrics.record_field_skipped();
                continue;
            }

            if let Value::String(text) = value {
                if is_field_key_reference(text) {
                    match cx.repo.set_field(cx.target, key, value.clone()).await {
                        Ok(()) => {
                            report.skipped += 1;
                            self.metrics.record_field_skipped();
                        }
                        Err(err) => {
                            report.errors.insert(key.clone(), err.to_string());
                            self.metrics.record_field_error();
                        }
                    }
                    continue;
                }
            }

            // unconfigured fields default to copy, which is the host copy
            // mechanism's job, not this router's
            if let Some(fields) = cx.fields {
                match fields.translation_preference(key).await {
                    Ok(preference) => {
                        if preference.unwrap_or_default() != TranslationPreference::Translate {
                            report.skipped += 1;
                            self.metrics.record_field_skipped();
                            continue;
                        }
                    }
                    Err(err) => {
                        report.errors.insert(key.clone(), err.to_string());
                        self.metrics.record_field_error();
                        continue;
                    }
                }
            }

            let mut claimed = false;
            for handler in &self.handlers {
                if !handler.claims(cx, key, value).await {
                    continue;
                }
                claimed = true;
                match handler.apply(cx, key, value).await {
                    Ok(()) => {
                        report.translated += 1;
                        self.metrics.record_field_translated();
                    }
                    Err(message) => {
                        warn!(
                            "Field '{}' failed in handler '{}': {}",
                            key,
                            handler.id(),
                            message
                        );
                        report.errors.insert(key.clone(), message);
                        self.metrics.record_field_error();
                    }
                }
                break;
            }
            if !claimed {
                report.skipped += 1;
                self.metrics.record_field_skipped();
            }
        }

        debug!(
            "Routed {} fields from item {} to item {}: {} translated, {} skipped, {} errors",
            map.len(),
            cx.source,
            cx.target,
            report.translated,
            report.skipped,
            report.errors.len()
        );
        Ok(report)
    }
}

impl Default for FieldRouter {
    fn default() -> Self {
        Self::with_defaults(
            Arc::new(FieldTypeRegistry::with_defaults()),
            DEFAULT_MIN_TRANSLATE_LEN,
        )
    }
}

/// Handles fields with a declared type. String values of translatable
/// types are machine translated; everything else typed is copied. An empty
/// source value removes the target field, so clearing a field on the
/// source clears it everywhere.
pub struct TypedFieldHandler {
    types: Arc<FieldTypeRegistry>,
}

impl TypedFieldHandler {
    pub fn new(types: Arc<FieldTypeRegistry>) -> Self {
        Self { types }
    }
}

#[async_trait]
impl FieldHandler for TypedFieldHandler {
    fn id(&self) -> &str {
        "typed"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn claims(&self, cx: &FieldCx<'_>, key: &str, _value: &Value) -> bool {
        cx.field_type(key).await.is_some()
    }

    async fn apply(&self, cx: &FieldCx<'_>, key: &str, value: &Value) -> Result<(), String> {
        if is_empty_signal(value) {
            return cx
                .repo
                .delete_field(cx.target, key)
                .await
                .map_err(|e| e.to_string());
        }

        let field_type = cx.field_type(key).await.unwrap_or_default();
        let outgoing = match value {
            Value::String(text) if self.types.is_translatable(&field_type) => {
                Value::String(cx.translate(text).await?)
            }
            other => other.clone(),
        };
        cx.repo
            .set_field(cx.target, key, outgoing)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Decides, given a field key and its text, that the text should be copied
/// instead of translated.
pub type SkipFilter = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Fallback handler for plain stored fields. Claims everything; translates
/// string values long enough to be prose, copies the rest verbatim.
pub struct StoreFieldHandler {
    min_translate_len: usize,
    skip_when: Option<SkipFilter>,
}

impl StoreFieldHandler {
    pub fn new(min_translate_len: usize) -> Self {
        Self {
            min_translate_len,
            skip_when: None,
        }
    }

    /// Installs a filter that can opt individual values out of translation.
    pub fn with_skip_filter(mut self, filter: SkipFilter) -> Self {
        self.skip_when = Some(filter);
        self
    }
}

#[async_trait]
impl FieldHandler for StoreFieldHandler {
    fn id(&self) -> &str {
        "store"
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn claims(&self, _cx: &FieldCx<'_>, _key: &str, _value: &Value) -> bool {
        true
    }

    async fn apply(&self, cx: &FieldCx<'_>, key: &str, value: &Value) -> Result<(), String> {
        if let Value::String(text) = value {
            let long_enough = text.chars().count() >= self.min_translate_len;
            let opted_out = self
                .skip_when
                .as_ref()
                .is_some_and(|skip| skip(key, text));
            if long_enough && !opted_out {
                let translated = cx.translate(text).await?;
                return cx
                    .repo
                    .set_field(cx.target, key, Value::String(translated))
                    .await
                    .map_err(|e| e.to_string());
            }
        }
        cx.repo
            .set_field(cx.target, key, value.clone())
            .await
            .map_err(|e| e.to_string())
    }
}
