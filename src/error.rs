//! Error types for the synchronization core.
//!
//! `SyncError` is the error surface of every sync-facing operation. Host
//! collaborators (repository, linking service, field subsystem) report
//! `HostError`, which flows into `SyncError` either transparently (reads) or
//! mapped to an operation-specific variant (create/update/relate).

use crate::language::LanguageTag;
use crate::model::ItemId;
use thiserror::Error;

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The referenced item does not exist in the host.
    #[error("item {0} not found")]
    NotFound(ItemId),

    /// Any other host-side failure (storage, constraint, transport).
    #[error("{0}")]
    Backend(String),
}

impl HostError {
    /// Convenience constructor for backend failures.
    pub fn backend(message: impl Into<String>) -> Self {
        HostError::Backend(message.into())
    }
}

/// Errors produced while synchronizing translations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A language identifier could not be parsed.
    #[error("invalid language code '{code}': {reason}")]
    InvalidLanguageCode { code: String, reason: String },

    /// No translation provider has been registered as the default.
    #[error("no translation provider configured")]
    NoProviderConfigured,

    /// The default provider reports missing credentials or configuration.
    #[error("translation provider '{provider}' is not available")]
    ProviderUnavailable { provider: String },

    /// The provider does not support the requested language.
    #[error("language '{language}' is not supported by provider '{provider}'")]
    UnsupportedLanguage {
        provider: String,
        language: LanguageTag,
    },

    /// The provider call itself failed (transport, quota, malformed response).
    #[error("provider '{provider}' failed{}: {message}", status_suffix(.status))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The requested source item does not exist.
    #[error("source item {0} not found")]
    SourceNotFound(ItemId),

    /// The item is itself a translation; only source items can be fanned out.
    #[error("item {0} is not in its group's source language")]
    NotSourceLanguage(ItemId),

    /// The requested target language is the source item's own language.
    #[error("target language '{language}' is the source item's language")]
    TargetIsSource { language: LanguageTag },

    /// The repository rejected the new target item.
    #[error("failed to create translation item: {0}")]
    ItemCreateFailed(String),

    /// The repository rejected the content write to an existing target.
    #[error("failed to update translation item {id}: {reason}")]
    ItemUpdateFailed { id: ItemId, reason: String },

    /// Language assignment or group relation failed for a new target item.
    #[error("failed to relate translation item {id}: {reason}")]
    RelationFailed { id: ItemId, reason: String },

    /// A host collaborator failed outside the mapped operations above.
    #[error(transparent)]
    Host(#[from] HostError),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}
