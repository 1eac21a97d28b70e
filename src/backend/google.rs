//! Google Translate API backend
//!
//! Implements the backend contract over the Google Translate v2 REST API.
//! Each created translator is a lightweight handle holding the pair and a
//! shared HTTP client; disposing it only blocks further calls.
//!
//! # Authentication
//!
//! The API key is read from the `GOOGLE_TRANSLATE_API_KEY` environment
//! variable by [`GoogleTranslateBackend::from_env`].

use super::translator::{TranslationBackend, Translator};
use crate::error::{BackendError, BackendResult};
use crate::language::{AUTO, LanguagePair, is_valid_code, primary_language};
use async_trait::async_trait;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Google Translate API v2 backend
#[derive(Clone)]
pub struct GoogleTranslateBackend {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateBackend {
    /// Maximum characters per string accepted by the API
    const MAX_CHARS_PER_STRING: usize = 30_000;

    pub fn new(api_key: String) -> BackendResult<Self> {
        if api_key.trim().is_empty() {
            return Err(BackendError::Unknown("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| BackendError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Create a backend from the `GOOGLE_TRANSLATE_API_KEY` environment variable
    pub fn from_env() -> BackendResult<Self> {
        let api_key =
            std::env::var("GOOGLE_TRANSLATE_API_KEY").map_err(|_| BackendError::ApiUnavailable)?;
        Self::new(api_key)
    }

    /// Point the backend at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for GoogleTranslateBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslateBackend")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateBackend {
    async fn check_availability(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn create_translator(&self, pair: &LanguagePair) -> BackendResult<Box<dyn Translator>> {
        let target_ok = pair.target != AUTO && is_valid_code(&pair.target);
        if !target_ok || !is_valid_code(&pair.source) {
            return Err(BackendError::PairUnsupported(format!(
                "Unsupported language pair: {}",
                pair
            )));
        }
        tracing::debug!(%pair, "created Google Translate handle");
        Ok(Box::new(GoogleTranslator {
            backend: self.clone(),
            pair: pair.clone(),
            disposed: false,
        }))
    }

    fn backend_name(&self) -> &str {
        "Google Translate"
    }
}

pub struct GoogleTranslator {
    backend: GoogleTranslateBackend,
    pair: LanguagePair,
    disposed: bool,
}

impl GoogleTranslator {
    fn request_body(&self, text: &str) -> serde_json::Value {
        let target = primary_language(&self.pair.target).unwrap_or_else(|| self.pair.target.clone());
        let mut body = json!({
            "q": [text],
            "target": target,
            "format": "text"
        });
        // omitting "source" asks the API to detect it
        if self.pair.source != AUTO {
            if let Some(source) = primary_language(&self.pair.source) {
                body["source"] = json!(source);
            }
        }
        body
    }
}

/// Map a non-success response onto the backend taxonomy.
fn classify_status(status: reqwest::StatusCode, body: &str) -> BackendError {
    let lower = body.to_lowercase();
    if status.is_client_error()
        && (lower.contains("bad language pair") || lower.contains("invalid value"))
    {
        return BackendError::PairUnsupported(format!("Unsupported language pair ({})", status));
    }
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return BackendError::ApiUnavailable;
    }
    BackendError::classify(&format!("API error ({}): {}", status, body))
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str) -> BackendResult<String> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        if text.is_empty() {
            return Ok(String::new());
        }
        if text.len() > GoogleTranslateBackend::MAX_CHARS_PER_STRING {
            return Err(BackendError::Unknown(format!(
                "Text exceeds maximum length of {} characters",
                GoogleTranslateBackend::MAX_CHARS_PER_STRING
            )));
        }

        let url = format!("{}?key={}", self.backend.base_url, self.backend.api_key);
        let response = self
            .backend
            .client
            .post(&url)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Unknown(format!("Failed to parse API response: {}", e)))?;

        json["data"]["translations"][0]["translatedText"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                BackendError::Unknown(
                    "Invalid API response: missing 'translatedText' field".to_string(),
                )
            })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_empty_key() {
        assert!(GoogleTranslateBackend::new("  ".to_string()).is_err());
    }

    #[tokio::test]
    async fn test_availability_with_key() {
        let backend = GoogleTranslateBackend::new("test-key".to_string()).unwrap();
        assert!(backend.check_availability().await);
        assert_eq!(backend.backend_name(), "Google Translate");
    }

    #[tokio::test]
    async fn test_invalid_pair_rejected() {
        let backend = GoogleTranslateBackend::new("test-key".to_string()).unwrap();
        let err = backend
            .create_translator(&LanguagePair::new("en", "auto"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::PairUnsupported(_)));
    }

    #[tokio::test]
    async fn test_request_body_omits_auto_source() {
        let backend = GoogleTranslateBackend::new("test-key".to_string()).unwrap();
        let handle = GoogleTranslator {
            backend,
            pair: LanguagePair::new("auto", "fr-CA"),
            disposed: false,
        };
        let body = handle.request_body("Hello");
        assert_eq!(body["target"], "fr");
        assert!(body.get("source").is_none());
        assert_eq!(body["q"][0], "Hello");
    }

    #[tokio::test]
    async fn test_disposed_handle_fails() {
        let backend = GoogleTranslateBackend::new("test-key".to_string()).unwrap();
        let mut handle = backend
            .create_translator(&LanguagePair::new("en", "de"))
            .await
            .unwrap();
        handle.dispose();
        assert_eq!(handle.translate("x").await.unwrap_err(), BackendError::Disposed);
    }

    #[test]
    fn test_classify_status() {
        let err = classify_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Bad language pair: en|xx"}}"#,
        );
        assert!(matches!(err, BackendError::PairUnsupported(_)));
        assert_eq!(
            classify_status(reqwest::StatusCode::FORBIDDEN, "denied"),
            BackendError::ApiUnavailable
        );
        assert!(matches!(
            classify_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            BackendError::Unknown(_)
        ));
    }
}
