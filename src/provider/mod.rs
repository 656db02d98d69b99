//! Translation providers.
//!
//! A provider turns text in one language into text in another. The crate
//! ships two implementations: [`mock::MockProvider`] for tests and
//! [`http::LibreTranslateProvider`] for a real HTTP backend. Providers are
//! registered with a [`registry::ProviderRegistry`], which owns language
//! checks, hooks and failure mapping.

pub mod http;
pub mod mock;
pub mod registry;

use async_trait::async_trait;
use thiserror::Error;

use crate::language::LanguageTag;

/// Failure raised by a provider implementation.
///
/// The registry maps this into the crate-level error surface; the optional
/// HTTP status drives retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderFailure {
    pub message: String,
    pub status: Option<u16>,
}

impl ProviderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Whether the failure is worth retrying.
    ///
    /// Rate limits (429) and server errors (5xx) are transient; other client
    /// errors are not. Failures without a status come from the network or
    /// response parsing and are treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            Some(status) => status == 429 || status >= 500,
            None => true,
        }
    }
}

/// A machine translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Stable identifier used for registration and error reporting.
    fn id(&self) -> &str;

    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// True when the provider is configured well enough to accept calls.
    fn is_available(&self) -> bool;

    /// Languages the provider can translate to and from.
    fn supported_languages(&self) -> Vec<LanguageTag>;

    /// Translates `text` into `target`. A `None` source means the provider
    /// should detect the source language itself.
    async fn translate(
        &self,
        text: &str,
        target: &LanguageTag,
        source: Option<&LanguageTag>,
    ) -> Result<String, ProviderFailure>;
}
