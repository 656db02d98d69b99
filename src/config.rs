use crate::language::LanguageTag;
use anyhow::{Context, Result};

/// Comma-separated language list used when TRANSLATE_LANGUAGES is not set.
const DEFAULT_LANGUAGES: &str = "en,es,de,fr,it,pt,ja,zh-Hans";

#[derive(Debug, Clone)]
pub struct Config {
    // Translation API
    pub translate_api_url: String,
    pub translate_api_key: Option<String>,
    pub translate_timeout_secs: u64,

    // Languages the installation works with
    pub languages: Vec<LanguageTag>,

    // Field routing
    pub min_translate_len: usize,
    pub reserved_prefixes: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Translation API
            translate_api_url: std::env::var("TRANSLATE_API_URL")
                .context("TRANSLATE_API_URL not set")?,
            translate_api_key: std::env::var("TRANSLATE_API_KEY").ok(),
            translate_timeout_secs: std::env::var("TRANSLATE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            // Languages
            languages: parse_languages(
                &std::env::var("TRANSLATE_LANGUAGES")
                    .unwrap_or_else(|_| DEFAULT_LANGUAGES.to_string()),
            )?,

            // Field routing
            min_translate_len: std::env::var("SYNC_MIN_TRANSLATE_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            reserved_prefixes: std::env::var("SYNC_RESERVED_PREFIXES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        })
    }
}

/// The language set used when nothing is configured.
pub fn default_languages() -> Vec<LanguageTag> {
    parse_languages(DEFAULT_LANGUAGES).expect("default language list is valid")
}

fn parse_languages(raw: &str) -> Result<Vec<LanguageTag>> {
    let mut languages = Vec::new();
    for code in raw.split(',') {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        languages.push(LanguageTag::parse(code).with_context(|| {
            format!("Invalid language code '{}' in TRANSLATE_LANGUAGES", code)
        })?);
    }
    Ok(languages)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
