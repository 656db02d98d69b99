//! LibreTranslate-compatible HTTP provider.
//!
//! Speaks the plain `POST /translate` JSON dialect used by LibreTranslate
//! and its self-hosted clones. Calls are retried with exponential backoff
//! for rate limits, server errors and transport failures.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{default_languages, Config};
use crate::language::LanguageTag;
use crate::provider::{ProviderFailure, TranslationProvider};
use crate::retry::{with_retry_if, RetryConfig};

/// LibreTranslate translate request
#[derive(Debug, Serialize)]
struct TranslateRequest {
    q: String,
    source: String,
    target: String,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP translation provider for LibreTranslate-style APIs.
pub struct LibreTranslateProvider {
    base_url: String,
    api_key: Option<String>,
    languages: Vec<LanguageTag>,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl LibreTranslateProvider {
    /// Creates a provider against `base_url` with a 30 second timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Creates a provider with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for LibreTranslate")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            languages: default_languages(),
            client,
            retry: RetryConfig::provider_call(),
        })
    }

    /// Creates a provider from application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut provider = Self::with_timeout(
            config.translate_api_url.clone(),
            Duration::from_secs(config.translate_timeout_secs),
        )?;
        provider.api_key = config.translate_api_key.clone();
        provider.languages = config.languages.clone();
        Ok(provider)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_languages(mut self, languages: Vec<LanguageTag>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn id(&self) -> &str {
        "libretranslate"
    }

    fn name(&self) -> &str {
        "LibreTranslate"
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn supported_languages(&self) -> Vec<LanguageTag> {
        self.languages.clone()
    }

    async fn translate(
        &self,
        text: &str,
        target: &LanguageTag,
        source: Option<&LanguageTag>,
    ) -> Result<String, ProviderFailure> {
        let url = format!("{}/translate", self.base_url);
        let request = TranslateRequest {
            q: text.to_string(),
            source: source
                .map(|language| language.to_string())
                .unwrap_or_else(|| "auto".to_string()),
            target: target.to_string(),
            format: "text".to_string(),
            api_key: self.api_key.clone(),
        };

        with_retry_if(
            &self.retry,
            &format!("Translation into {}", target),
            || async {
                let response = self.client.post(&url).json(&request).send().await.map_err(
                    |e| ProviderFailure::new(format!("Failed to send translation request: {}", e)),
                )?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    let message = serde_json::from_str::<ErrorResponse>(&body)
                        .map(|parsed| parsed.error)
                        .unwrap_or(body);
                    return Err(ProviderFailure::with_status(message, status.as_u16()));
                }

                let parsed: TranslateResponse = response.json().await.map_err(|e| {
                    ProviderFailure::new(format!("Failed to parse translation response: {}", e))
                })?;

                Ok(parsed.translated_text)
            },
            ProviderFailure::is_retryable,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tag(code: &str) -> LanguageTag {
        LanguageTag::parse(code).expect("valid tag")
    }

    fn create_test_provider(base_url: &str) -> LibreTranslateProvider {
        LibreTranslateProvider::new(base_url)
            .expect("provider builds")
            .with_retry(RetryConfig::new(3, Duration::from_millis(10)))
    }

    // ==================== Request Structure Tests ====================

    #[test]
    fn test_request_serialization_without_api_key() {
        let request = TranslateRequest {
            q: "Hello".to_string(),
            source: "auto".to_string(),
            target: "de".to_string(),
            format: "text".to_string(),
            api_key: None,
        };

        let json = serde_json::to_string(&request).expect("Should serialize");
        assert!(json.contains("\"q\":\"Hello\""));
        assert!(json.contains("\"target\":\"de\""));
        // api_key should not be serialized when None
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_request_serialization_with_api_key() {
        let request = TranslateRequest {
            q: "Hello".to_string(),
            source: "en".to_string(),
            target: "de".to_string(),
            format: "text".to_string(),
            api_key: Some("secret".to_string()),
        };

        let json = serde_json::to_string(&request).expect("Should serialize");
        assert!(json.contains("\"api_key\":\"secret\""));
    }

    // ==================== Provider Metadata Tests ====================

    #[test]
    fn test_provider_identity() {
        let provider = create_test_provider("http://localhost:5000");
        assert_eq!(provider.id(), "libretranslate");
        assert_eq!(provider.name(), "LibreTranslate");
        assert!(provider.is_available());
    }

    #[test]
    fn test_unconfigured_base_url_is_unavailable() {
        let provider = create_test_provider("");
        assert!(!provider.is_available());
    }

    #[test]
    fn test_from_config_carries_languages() {
        let config = Config {
            translate_api_url: "http://localhost:5000/".to_string(),
            translate_api_key: Some("secret".to_string()),
            translate_timeout_secs: 5,
            languages: vec![tag("en"), tag("nl")],
            min_translate_len: 3,
            reserved_prefixes: Vec::new(),
        };

        let provider = LibreTranslateProvider::from_config(&config).expect("provider builds");
        assert!(provider.is_available());
        assert_eq!(provider.supported_languages(), vec![tag("en"), tag("nl")]);
    }

    // ==================== Translate Tests ====================

    #[tokio::test]
    async fn test_translate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({
                "q": "Hello world",
                "source": "auto",
                "target": "de",
                "format": "text"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Hallo Welt"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let result = provider
            .translate("Hello world", &tag("de"), None)
            .await
            .expect("Should succeed");

        assert_eq!(result, "Hallo Welt");
    }

    #[tokio::test]
    async fn test_translate_sends_explicit_source_language() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({"source": "en"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Hola"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let result = provider
            .translate("Hello", &tag("es"), Some(&tag("en")))
            .await
            .expect("Should succeed");

        assert_eq!(result, "Hola");
    }

    #[tokio::test]
    async fn test_translate_sends_api_key_when_configured() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({"api_key": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Bonjour"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri()).with_api_key("secret");
        let result = provider
            .translate("Hello", &tag("fr"), None)
            .await
            .expect("Should succeed");

        assert_eq!(result, "Bonjour");
    }

    #[tokio::test]
    async fn test_translate_handles_trailing_slash_in_base_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Ciao"
            })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&format!("{}/", mock_server.uri()));
        let result = provider.translate("Hello", &tag("it"), None).await;
        assert!(result.is_ok());
    }

    // ==================== Error Handling Tests ====================

    #[tokio::test]
    async fn test_error_body_message_is_extracted() {
        let mock_server = MockServer::start().await;

        // 403 is a client error and should NOT be retried
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "Invalid API key"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());

        let start = std::time::Instant::now();
        let err = provider
            .translate("Hello", &tag("de"), None)
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err.status, Some(403));
        assert_eq!(err.message, "Invalid API key");
        assert!(
            elapsed < Duration::from_secs(1),
            "403 should fail immediately without retries, took {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_plain_text_error_body_is_kept() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let err = provider
            .translate("Hello", &tag("de"), None)
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("no such endpoint"));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let err = provider
            .translate("Hello", &tag("de"), None)
            .await
            .unwrap_err();

        assert!(err.message.contains("Failed to parse translation response"));
        assert_eq!(err.status, None);
    }

    // ==================== Retry Integration Tests ====================

    #[tokio::test]
    async fn test_retries_on_500_then_succeeds() {
        let mock_server = MockServer::start().await;

        // First two requests fail with 500, third succeeds
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Internal Server Error"
            })))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Nach Wiederholungen"
            })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let result = provider.translate("After retries", &tag("de"), None).await;

        assert!(result.is_ok(), "Should succeed after retries: {:?}", result);
        assert_eq!(result.unwrap(), "Nach Wiederholungen");
    }

    #[tokio::test]
    async fn test_exhausts_retries_on_persistent_500() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Persistent failure"
            })))
            .expect(3) // retry config has 3 attempts
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let err = provider
            .translate("Hello", &tag("de"), None)
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(500));
        assert_eq!(err.message, "Persistent failure");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": "Slowdown"
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Endlich"
            })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let result = provider.translate("Finally", &tag("de"), None).await;

        assert_eq!(result.unwrap(), "Endlich");
    }
}
