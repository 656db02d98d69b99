//! Scripted provider for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::language::LanguageTag;
use crate::provider::{ProviderFailure, TranslationProvider};

/// How the mock answers translation requests.
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Uppercase the text and append the target tag: `"Hello"` into `de`
    /// becomes `"HELLO-DE"`. Makes assertions self-describing.
    Marked,
    /// Answer from a fixed text -> translation map; unmapped text falls back
    /// to `Marked` behavior.
    Mapped(HashMap<String, String>),
    /// Return the input untouched.
    Echo,
    /// Fail every call.
    Fail { message: String, status: Option<u16> },
}

const DEFAULT_LANGUAGES: [&str; 8] = ["en", "es", "de", "fr", "it", "pt", "ja", "zh-Hans"];

/// In-memory provider with scripted behavior and a call counter.
pub struct MockProvider {
    id: String,
    available: AtomicBool,
    languages: Vec<LanguageTag>,
    mode: MockMode,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        let languages = DEFAULT_LANGUAGES
            .iter()
            .map(|code| LanguageTag::parse(code).expect("default language codes are valid"))
            .collect();
        Self {
            id: "mock".to_string(),
            available: AtomicBool::new(true),
            languages,
            mode: MockMode::Marked,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_languages(mut self, languages: Vec<LanguageTag>) -> Self {
        self.languages = languages;
        self
    }

    /// Starts the provider in the unavailable state.
    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    /// Flips availability at runtime, e.g. to simulate lost credentials.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of translate calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock translation provider"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn supported_languages(&self) -> Vec<LanguageTag> {
        self.languages.clone()
    }

    async fn translate(
        &self,
        text: &str,
        target: &LanguageTag,
        _source: Option<&LanguageTag>,
    ) -> Result<String, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.mode {
            MockMode::Marked => Ok(marked(text, target)),
            MockMode::Mapped(map) => Ok(map
                .get(text)
                .cloned()
                .unwrap_or_else(|| marked(text, target))),
            MockMode::Echo => Ok(text.to_string()),
            MockMode::Fail { message, status } => match status {
                Some(status) => Err(ProviderFailure::with_status(message.clone(), *status)),
                None => Err(ProviderFailure::new(message.clone())),
            },
        }
    }
}

fn marked(text: &str, target: &LanguageTag) -> String {
    format!(
        "{}-{}",
        text.to_uppercase(),
        target.to_string().to_uppercase()
    )
}
