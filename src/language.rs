//! BCP 47-flavored language tags.
//!
//! Tags are parsed into a primary language subtag plus optional script and
//! region subtags, and normalized to canonical casing (`zh-Hans`, `pt-BR`,
//! `es-419`). Both `-` and `_` separate subtags on input; output always uses
//! `-`. Comparisons happen on the normalized form, so membership checks are
//! case-insensitive by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// A normalized language tag: primary subtag, optional script, optional region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag {
    language: String,
    script: Option<String>,
    region: Option<String>,
}

impl LanguageTag {
    /// Parses and normalizes a language code.
    ///
    /// # Arguments
    ///
    /// * `code` - Raw tag such as `"en"`, `"PT_br"` or `"zh-hans"`
    ///
    /// # Returns
    ///
    /// The normalized tag, or `SyncError::InvalidLanguageCode` when the code
    /// is empty or any subtag is malformed.
    pub fn parse(code: &str) -> Result<Self, SyncError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(invalid(code, "empty language code"));
        }

        let parts: Vec<&str> = trimmed.split(['-', '_']).collect();
        if parts.len() > 3 {
            return Err(invalid(code, "too many subtags"));
        }

        let primary = parts[0];
        if !(2..=3).contains(&primary.len())
            || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(invalid(code, "primary subtag must be 2-3 ASCII letters"));
        }

        let mut tag = LanguageTag {
            language: primary.to_ascii_lowercase(),
            script: None,
            region: None,
        };

        for part in &parts[1..] {
            if part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                if tag.script.is_some() {
                    return Err(invalid(code, "duplicate script subtag"));
                }
                if tag.region.is_some() {
                    return Err(invalid(code, "script subtag must precede the region"));
                }
                tag.script = Some(title_case(part));
            } else if part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                if tag.region.is_some() {
                    return Err(invalid(code, "duplicate region subtag"));
                }
                tag.region = Some(part.to_ascii_uppercase());
            } else if part.len() == 3 && part.chars().all(|c| c.is_ascii_digit()) {
                if tag.region.is_some() {
                    return Err(invalid(code, "duplicate region subtag"));
                }
                tag.region = Some((*part).to_string());
            } else {
                return Err(invalid(code, format!("unrecognized subtag '{}'", part)));
            }
        }

        Ok(tag)
    }

    /// The lowercase primary language subtag (`"en"` in `en-GB`).
    pub fn primary(&self) -> &str {
        &self.language
    }

    /// The Title-cased script subtag, if present (`"Hans"` in `zh-Hans`).
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// The region subtag, if present (`"BR"` in `pt-BR`, `"419"` in `es-419`).
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// True when this tag appears in a provider's supported list.
    ///
    /// Both sides are already normalized, so the comparison is effectively
    /// case-insensitive regardless of how either tag was written.
    pub fn is_supported_by(&self, supported: &[LanguageTag]) -> bool {
        supported.contains(self)
    }
}

fn invalid(code: &str, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidLanguageCode {
        code: code.to_string(),
        reason: reason.into(),
    }
}

fn title_case(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for (i, c) in part.chars().enumerate() {
        if i == 0 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if let Some(script) = &self.script {
            write!(f, "-{}", script)?;
        }
        if let Some(region) = &self.region {
            write!(f, "-{}", region)?;
        }
        Ok(())
    }
}

impl FromStr for LanguageTag {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageTag::parse(s)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LanguageTag::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.to_string()
    }
}
