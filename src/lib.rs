//! Keeps translations of content items in sync across languages.
//!
//! A content item lives in a translation group: one source item plus any
//! number of translations, each in its own language. This crate watches
//! the source, machine translates its content and metadata fields into
//! the group's other languages, and keeps track of what is still pending.
//!
//! The host system plugs in through three traits in [`host`]: a
//! [`host::ContentRepository`] for item storage, a [`host::LinkingService`]
//! for languages and group relations, and an optional
//! [`host::FieldSubsystem`] for typed metadata. Translation backends
//! implement [`provider::TranslationProvider`] and register with a
//! [`provider::registry::ProviderRegistry`].
//!
//! [`sync::SyncEngine`] ties it together:
//!
//! ```no_run
//! use std::sync::Arc;
//! use translation_sync::host::memory::MemoryHost;
//! use translation_sync::provider::mock::MockProvider;
//! use translation_sync::{LanguageTag, ProviderRegistry, SyncEngine};
//!
//! # async fn run() -> Result<(), translation_sync::SyncError> {
//! let host = Arc::new(MemoryHost::new());
//! let source = host.seed_source(&LanguageTag::parse("en")?, "Hello", "Body", "");
//!
//! let mut providers = ProviderRegistry::new();
//! providers.register(Arc::new(MockProvider::new()));
//!
//! let engine = SyncEngine::new(host.clone(), host.clone(), Arc::new(providers))
//!     .with_field_subsystem(host.clone());
//! let outcome = engine.translate_to_language(source, &LanguageTag::parse("de")?).await?;
//! assert!(outcome.created_new);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod language;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod retry;
pub mod router;
pub mod sync;
pub mod tracker;
pub mod validate;

pub use config::Config;
pub use error::{HostError, SyncError};
pub use host::{ContentRepository, FieldSubsystem, LinkingService};
pub use language::LanguageTag;
pub use ledger::{PendingEntry, PendingLedger};
pub use metrics::{MetricsReport, SyncMetrics};
pub use model::{
    ContentField, ContentItem, ContentUpdate, FieldMap, ItemId, ItemStatus, NewItem,
    TranslationPreference,
};
pub use provider::registry::ProviderRegistry;
pub use provider::{ProviderFailure, TranslationProvider};
pub use router::{FieldHandler, FieldRouter, FieldTypeRegistry, RouteReport};
pub use sync::{BatchReport, SyncEngine, SyncObserver, SyncOutcome};
pub use tracker::ChangeTracker;
