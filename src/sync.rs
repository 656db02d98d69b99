//! The sync pipeline.
//!
//! [`SyncEngine`] drives one item through translation: validate that it is
//! a source item, resolve or create the target in the requested language,
//! machine translate the structured content, route the metadata fields,
//! and finish with the host-side copy step, observer notifications and
//! pending-flag cleanup.
//!
//! A freshly created target is assigned its language and related to the
//! source group before anything else touches it. If either step fails the
//! orphaned item is deleted again, so a failed sync never leaves an
//! unlinked draft behind.
//!
//! Field-level failures are not fatal. A sync that translated the content
//! but lost two metadata fields reports success with those two fields in
//! [`SyncOutcome::field_errors`].

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::host::{ContentRepository, FieldSubsystem, LinkingService};
use crate::language::LanguageTag;
use crate::metrics::SyncMetrics;
use crate::model::{ContentItem, ContentUpdate, ItemId, ItemStatus, NewItem};
use crate::provider::registry::ProviderRegistry;
use crate::router::{FieldCx, FieldRouter};
use crate::tracker::ChangeTracker;

/// Gets told when a translation item has been written.
///
/// Runs synchronously at the end of a sync, after fields are routed.
pub trait SyncObserver: Send + Sync {
    fn content_saved(&self, item: ItemId, language: &LanguageTag);
}

/// What one successful sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Whether the target item was created by this sync.
    pub created_new: bool,
    pub target: ItemId,
    pub translated_fields: usize,
    pub skipped_fields: usize,
    /// Metadata fields that failed to route, keyed by field name.
    pub field_errors: BTreeMap<String, String>,
}

impl SyncOutcome {
    /// Whether every metadata field routed cleanly.
    pub fn is_clean(&self) -> bool {
        self.field_errors.is_empty()
    }
}

/// Per-language entry in a [`BatchReport`].
#[derive(Debug)]
pub struct LanguageResult {
    pub language: LanguageTag,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Outcome of syncing one source into several languages.
#[derive(Debug)]
pub struct BatchReport {
    /// `true` only when every language synced without error.
    pub succeeded: bool,
    pub results: Vec<LanguageResult>,
}

impl BatchReport {
    pub fn result_for(&self, language: &LanguageTag) -> Option<&Result<SyncOutcome, SyncError>> {
        self.results
            .iter()
            .find(|entry| &entry.language == language)
            .map(|entry| &entry.result)
    }
}

/// Orchestrates translation syncs against a host.
pub struct SyncEngine {
    repo: Arc<dyn ContentRepository>,
    links: Arc<dyn LinkingService>,
    fields: Option<Arc<dyn FieldSubsystem>>,
    providers: Arc<ProviderRegistry>,
    router: FieldRouter,
    tracker: Option<Arc<ChangeTracker>>,
    observers: Vec<Arc<dyn SyncObserver>>,
    metrics: Arc<SyncMetrics>,
}

impl SyncEngine {
    /// An engine with the default field router. Metrics are shared with
    /// the provider registry so one report covers the whole pipeline.
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        links: Arc<dyn LinkingService>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        let metrics = providers.metrics();
        let router = FieldRouter::default().with_metrics(metrics.clone());
        Self {
            repo,
            links,
            fields: None,
            providers,
            router,
            tracker: None,
            observers: Vec::new(),
            metrics,
        }
    }

    /// Attaches the field subsystem used for typed routing, preference
    /// gates and the managed-field copy step.
    pub fn with_field_subsystem(mut self, fields: Arc<dyn FieldSubsystem>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Attaches a change tracker whose flags get cleared after each sync.
    pub fn with_tracker(mut self, tracker: Arc<ChangeTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Replaces the field router. The router is rewired onto the engine's
    /// metrics instance.
    pub fn with_router(mut self, router: FieldRouter) -> Self {
        self.router = router.with_metrics(self.metrics.clone());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        self.metrics.clone()
    }

    /// Syncs one source item into one target language.
    pub async fn translate_to_language(
        &self,
        source: ItemId,
        target_language: &LanguageTag,
    ) -> Result<SyncOutcome, SyncError> {
        let (item, source_language) = self.validate_source(source).await?;
        self.sync_one(&item, &source_language, target_language).await
    }

    /// Syncs one source item into several languages concurrently.
    ///
    /// Source validation runs once up front; a validation failure aborts
    /// the whole batch. After that each language gets its own result and
    /// one failing language never stops the others.
    pub async fn translate_to_languages(
        &self,
        source: ItemId,
        languages: &[LanguageTag],
    ) -> Result<BatchReport, SyncError> {
        let (item, source_language) = self.validate_source(source).await?;

        let item = &item;
        let source_language = &source_language;
        let syncs = languages.iter().map(|target_language| async move {
            let result = self
                .sync_one(&item, &source_language, target_language)
                .await;
            if let Err(err) = &result {
                warn!(
                    "Sync of item {} into {} failed: {}",
                    source, target_language, err
                );
            }
            LanguageResult {
                language: target_language.clone(),
                result,
            }
        });
        let results = join_all(syncs).await;

        let succeeded = results.iter().all(|entry| entry.result.is_ok());
        Ok(BatchReport { succeeded, results })
    }

    /// Checks that `source` exists and is its group's source item, and
    /// returns a snapshot plus its language.
    async fn validate_source(
        &self,
        source: ItemId,
    ) -> Result<(ContentItem, LanguageTag), SyncError> {
        let item = self
            .repo
            .get(source)
            .await?
            .ok_or(SyncError::SourceNotFound(source))?;
        if !self.links.is_source_item(source).await? {
            return Err(SyncError::NotSourceLanguage(source));
        }
        let language = self
            .links
            .language_of(source)
            .await?
            .ok_or(SyncError::NotSourceLanguage(source))?;
        Ok((item, language))
    }

    async fn sync_one(
        &self,
        source_item: &ContentItem,
        source_language: &LanguageTag,
        target_language: &LanguageTag,
    ) -> Result<SyncOutcome, SyncError> {
        if target_language == source_language {
            return Err(SyncError::TargetIsSource {
                language: target_language.clone(),
            });
        }

        let existing = self
            .links
            .translation_for(source_item.id, target_language)
            .await?;

        // blank fields short-circuit inside the registry, so an empty
        // summary costs no provider call
        let title = self
            .providers
            .translate(&source_item.title, target_language, Some(source_language))
            .await?;
        let body = self
            .providers
            .translate(&source_item.body, target_language, Some(source_language))
            .await?;
        let summary = self
            .providers
            .translate(&source_item.summary, target_language, Some(source_language))
            .await?;

        let (target, created_new) = match existing {
            Some(existing_id) => {
                let update = ContentUpdate {
                    title: Some(title),
                    body: Some(body),
                    summary: Some(summary),
                };
                self.repo.update(existing_id, update).await.map_err(|e| {
                    SyncError::ItemUpdateFailed {
                        id: existing_id,
                        reason: e.to_string(),
                    }
                })?;
                self.metrics.record_item_updated();
                debug!(
                    "Updated translation item {} of item {} in {}",
                    existing_id, source_item.id, target_language
                );
                (existing_id, false)
            }
            None => {
                let target = self
                    .repo
                    .create(NewItem {
                        title,
                        body,
                        summary,
                        status: ItemStatus::Draft,
                    })
                    .await
                    .map_err(|e| SyncError::ItemCreateFailed(e.to_string()))?;

                if let Err(err) = self.links.assign_language(target, target_language).await {
                    self.roll_back_create(target).await;
                    return Err(SyncError::RelationFailed {
                        id: target,
                        reason: format!("language assignment failed: {}", err),
                    });
                }
                if let Err(err) = self.links.relate(source_item.id, target).await {
                    self.roll_back_create(target).await;
                    return Err(SyncError::RelationFailed {
                        id: target,
                        reason: err.to_string(),
                    });
                }
                self.metrics.record_item_created();
                info!(
                    "Created translation item {} for item {} in {}",
                    target, source_item.id, target_language
                );
                (target, true)
            }
        };

        let cx = FieldCx {
            repo: self.repo.as_ref(),
            fields: self.fields.as_deref(),
            providers: self.providers.as_ref(),
            source: source_item.id,
            target,
            source_language,
            target_language,
        };
        let report = self.router.route_all(&cx).await?;
        if !report.is_clean() {
            warn!(
                "{} field(s) failed to route onto item {}: {:?}",
                report.errors.len(),
                target,
                report.errors.keys().collect::<Vec<_>>()
            );
        }

        // idempotent, affirms the group link on re-syncs
        self.links
            .relate(source_item.id, target)
            .await
            .map_err(|e| SyncError::RelationFailed {
                id: target,
                reason: e.to_string(),
            })?;

        if let Some(fields) = &self.fields {
            if let Err(err) = fields.copy_managed_fields(source_item.id, target).await {
                warn!(
                    "Failed to copy managed fields from item {} to item {}: {}",
                    source_item.id, target, err
                );
            }
        }
        for observer in &self.observers {
            observer.content_saved(target, target_language);
        }
        if let Some(tracker) = &self.tracker {
            if let Err(err) = tracker.clear(source_item.id, None, Some(target_language)).await {
                warn!(
                    "Failed to clear pending flags on item {} for {}: {}",
                    source_item.id, target_language, err
                );
            }
        }

        Ok(SyncOutcome {
            created_new,
            target,
            translated_fields: report.translated,
            skipped_fields: report.skipped,
            field_errors: report.errors,
        })
    }

    /// Removes a just-created target after a failed assign or relate, so a
    /// failed sync leaves no orphaned draft.
    async fn roll_back_create(&self, target: ItemId) {
        if let Err(err) = self.repo.delete(target).await {
            warn!(
                "Failed to remove orphaned translation item {}: {}",
                target, err
            );
        }
    }
}
