//! Translation quality checks.
//!
//! This module inspects translated content to ensure that non-linguistic
//! elements survive the provider round trip: URLs, `{placeholder}` tokens,
//! shortcodes and HTML structure. Findings are reported as warnings; the
//! sync pipeline logs them but never fails a field over them.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Checker for translated content.
pub struct TranslationCheck;

// Regex patterns for extraction (cached for performance)
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static SHORTCODE_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationCheck {
    /// Validate that a translation preserves important elements from the original.
    ///
    /// This function checks that:
    /// - URLs are preserved
    /// - `{placeholder}` tokens are preserved
    /// - Shortcodes (`[gallery ...]`) are preserved
    /// - The HTML tag structure keeps the same shape
    ///
    /// # Arguments
    /// * `original` - The original text (before translation)
    /// * `translated` - The translated text
    ///
    /// # Returns
    /// A `ValidationReport` containing any errors or warnings found.
    pub fn check(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        // Check URLs
        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        // Check {placeholder} tokens
        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        if orig_placeholders != trans_placeholders {
            report.warnings.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        // Check shortcode names
        let orig_shortcodes = Self::extract_shortcodes(original);
        let trans_shortcodes = Self::extract_shortcodes(translated);
        if orig_shortcodes != trans_shortcodes {
            report.warnings.push(format!(
                "Shortcode mismatch: original has {:?}, translation has {:?}",
                orig_shortcodes, trans_shortcodes
            ));
        }

        // Check HTML tag counts (approximate structural check)
        let orig_tags = Self::extract_html_tags(original);
        let trans_tags = Self::extract_html_tags(translated);
        if orig_tags.len() != trans_tags.len() {
            report.warnings.push(format!(
                "HTML tag count mismatch: original has {}, translation has {}",
                orig_tags.len(),
                trans_tags.len()
            ));
        }

        report
    }

    /// Extract all URLs from text
    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]]+").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract all `{placeholder}` tokens from text
    fn extract_placeholders(text: &str) -> Vec<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{[a-zA-Z0-9_]+\}").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Extract shortcode names (`[gallery id="3"]` yields `gallery`)
    fn extract_shortcodes(text: &str) -> Vec<String> {
        let regex = SHORTCODE_REGEX.get_or_init(|| Regex::new(r"\[([a-z][a-z0-9_]*)").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Extract HTML tag names, opening and closing alike
    fn extract_html_tags(text: &str) -> Vec<String> {
        let regex =
            HTML_TAG_REGEX.get_or_init(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_lowercase()))
            .collect()
    }
}
