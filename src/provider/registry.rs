//! Provider registration and dispatch.
//!
//! The registry owns every configured [`TranslationProvider`] and funnels all
//! translation requests through the default one. The first provider that is
//! available at registration time becomes the default. Pre and post hooks
//! let embedders rewrite text around the provider call (glossary pinning,
//! placeholder freezing and the like).

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::language::LanguageTag;
use crate::metrics::SyncMetrics;
use crate::provider::TranslationProvider;
use crate::validate::TranslationCheck;

/// Text rewrite applied before or after the provider call.
pub type TranslateHook =
    Arc<dyn Fn(&str, &LanguageTag, Option<&LanguageTag>) -> String + Send + Sync>;

/// Holds registered providers and routes translation requests.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TranslationProvider>>,
    default_id: Option<String>,
    pre_hooks: Vec<TranslateHook>,
    post_hooks: Vec<TranslateHook>,
    metrics: Arc<SyncMetrics>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            default_id: None,
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    /// Shares a metrics instance owned by the caller.
    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registers a provider.
    ///
    /// # Returns
    ///
    /// `false` when a provider with the same id is already registered; the
    /// existing registration is kept untouched. The first registered provider
    /// that reports itself available becomes the default.
    pub fn register(&mut self, provider: Arc<dyn TranslationProvider>) -> bool {
        let id = provider.id().to_string();
        if self.providers.iter().any(|existing| existing.id() == id) {
            warn!("Provider '{}' is already registered, keeping the existing one", id);
            return false;
        }

        if self.default_id.is_none() && provider.is_available() {
            info!("Provider '{}' is now the default translation provider", id);
            self.default_id = Some(id.clone());
        }

        info!("Registered translation provider '{}' ({})", id, provider.name());
        self.providers.push(provider);
        true
    }

    /// Appends a hook run on the text before it reaches the provider.
    pub fn add_pre_hook(&mut self, hook: TranslateHook) {
        self.pre_hooks.push(hook);
    }

    /// Appends a hook run on the provider's output.
    pub fn add_post_hook(&mut self, hook: TranslateHook) {
        self.post_hooks.push(hook);
    }

    /// Looks up a provider by id.
    pub fn provider(&self, id: &str) -> Option<Arc<dyn TranslationProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.id() == id)
            .cloned()
    }

    /// The provider translation requests are routed to, if any.
    pub fn default_provider(&self) -> Option<Arc<dyn TranslationProvider>> {
        let id = self.default_id.as_deref()?;
        self.provider(id)
    }

    /// Ids of all registered providers, in registration order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.id().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The metrics instance shared with this registry.
    pub fn metrics(&self) -> Arc<SyncMetrics> {
        self.metrics.clone()
    }

    /// Translates `text` into `target` through the default provider.
    ///
    /// Blank input never reaches a provider: it resolves to an empty string
    /// immediately. Language support is checked for the target and, when
    /// given, the source before any hook or provider call runs.
    pub async fn translate(
        &self,
        text: &str,
        target: &LanguageTag,
        source: Option<&LanguageTag>,
    ) -> Result<String, SyncError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let provider = self
            .default_provider()
            .ok_or(SyncError::NoProviderConfigured)?;
        if !provider.is_available() {
            return Err(SyncError::ProviderUnavailable {
                provider: provider.id().to_string(),
            });
        }

        let supported = provider.supported_languages();
        if !target.is_supported_by(&supported) {
            return Err(SyncError::UnsupportedLanguage {
                provider: provider.id().to_string(),
                language: target.clone(),
            });
        }
        if let Some(source) = source {
            if !source.is_supported_by(&supported) {
                return Err(SyncError::UnsupportedLanguage {
                    provider: provider.id().to_string(),
                    language: source.clone(),
                });
            }
        }

        let mut input = text.to_string();
        for hook in &self.pre_hooks {
            input = hook(&input, target, source);
        }

        self.metrics.record_provider_call();
        let mut output = match provider.translate(&input, target, source).await {
            Ok(output) => output,
            Err(failure) => {
                self.metrics.record_provider_failure();
                return Err(SyncError::Provider {
                    provider: provider.id().to_string(),
                    status: failure.status,
                    message: failure.message,
                });
            }
        };

        for hook in &self.post_hooks {
            output = hook(&output, target, source);
        }

        let report = TranslationCheck::check(&input, &output);
        for warning in &report.warnings {
            warn!(
                "Translation check for '{}' into {}: {}",
                provider.id(),
                target,
                warning
            );
        }

        Ok(output)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
