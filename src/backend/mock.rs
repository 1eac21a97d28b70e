//! Mock translation backend for testing
//!
//! Deterministic, network-free backend used by the unit and integration
//! tests and by the CLI's `--mock` flag. Handles share a [`MockStats`]
//! record so tests can count creations, backend calls and disposals.
//!
//! # Example
//!
//! ```ignore
//! let backend = MockBackend::new(MockMode::Suffix);
//! let stats = backend.stats();
//! let handle = backend.create_translator(&LanguagePair::new("en", "fr")).await?;
//! assert_eq!(handle.translate("hello").await?, "hello_fr");
//! assert_eq!(stats.translate_calls(), 1);
//! ```

use super::translator::{TranslationBackend, Translator};
use crate::error::{BackendError, BackendResult};
use crate::language::LanguagePair;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append the target code: "hello" → "hello_fr"
    Suffix,

    /// Predefined (text, target) → translation, falling back to suffix mode
    Mappings(HashMap<(String, String), String>),

    /// Reverse word order
    Reorder,

    /// Every translate call fails with this message
    Error(String),

    /// Return input unchanged, like a backend declining to translate
    NoOp,
}

impl MockMode {
    /// Build a `Mappings` mode from `(text, target, translation)` triples.
    pub fn mappings<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        MockMode::Mappings(
            entries
                .into_iter()
                .map(|(text, target, out)| ((text.to_string(), target.to_string()), out.to_string()))
                .collect(),
        )
    }

    fn apply(&self, text: &str, target: &str) -> BackendResult<String> {
        match self {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => Ok(map
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", text, target))),
            MockMode::Reorder => Ok(text
                .split_whitespace()
                .rev()
                .collect::<Vec<_>>()
                .join(" ")),
            MockMode::Error(msg) => Err(BackendError::classify(msg)),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

/// Counters shared by a backend and every handle it created.
#[derive(Debug, Default)]
pub struct MockStats {
    created: AtomicUsize,
    translate_calls: AtomicUsize,
    disposed: AtomicUsize,
    texts: Mutex<Vec<String>>,
    pairs: Mutex<Vec<LanguagePair>>,
}

impl MockStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Texts passed to `translate`, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Pairs passed to `create_translator`, in call order.
    pub fn pairs(&self) -> Vec<LanguagePair> {
        self.pairs.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of backend calls made for `text`.
    pub fn calls_for(&self, text: &str) -> usize {
        self.texts().iter().filter(|t| t.as_str() == text).count()
    }
}

/// Mock backend that simulates availability, model downloads and failures
#[derive(Debug, Clone)]
pub struct MockBackend {
    mode: MockMode,
    /// Simulated per-call latency (in milliseconds)
    delay_ms: u64,
    /// Simulated translator creation time (in milliseconds)
    create_delay_ms: u64,
    available: bool,
    create_error: Option<String>,
    failures: HashMap<String, String>,
    stats: Arc<MockStats>,
}

impl MockBackend {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay_ms: 0,
            create_delay_ms: 0,
            available: true,
            create_error: None,
            failures: HashMap::new(),
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_create_delay(mut self, delay_ms: u64) -> Self {
        self.create_delay_ms = delay_ms;
        self
    }

    /// Report the capability as missing; creation fails with `ApiUnavailable`.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Make `create_translator` fail with `message` (classified).
    pub fn failing_create(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    /// Make translating exactly `text` fail with `message` (classified).
    pub fn fail_on(mut self, text: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(text.into(), message.into());
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn create_translator(&self, pair: &LanguagePair) -> BackendResult<Box<dyn Translator>> {
        if self.create_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.create_delay_ms)).await;
        }
        if !self.available {
            return Err(BackendError::ApiUnavailable);
        }
        if let Some(msg) = &self.create_error {
            return Err(BackendError::classify(msg));
        }

        self.stats.created.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pairs) = self.stats.pairs.lock() {
            pairs.push(pair.clone());
        }

        Ok(Box::new(MockTranslator {
            pair: pair.clone(),
            mode: self.mode.clone(),
            delay_ms: self.delay_ms,
            failures: self.failures.clone(),
            stats: self.stats.clone(),
            disposed: false,
        }))
    }

    fn backend_name(&self) -> &str {
        "Mock Translator"
    }
}

/// Handle created by [`MockBackend`].
#[derive(Debug)]
pub struct MockTranslator {
    pair: LanguagePair,
    mode: MockMode,
    delay_ms: u64,
    failures: HashMap<String, String>,
    stats: Arc<MockStats>,
    disposed: bool,
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str) -> BackendResult<String> {
        if self.disposed {
            return Err(BackendError::Disposed);
        }
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        self.stats.translate_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut texts) = self.stats.texts.lock() {
            texts.push(text.to_string());
        }

        if let Some(msg) = self.failures.get(text) {
            return Err(BackendError::classify(msg));
        }
        self.mode.apply(text, &self.pair.target)
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.stats.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en_fr() -> LanguagePair {
        LanguagePair::new("en", "fr")
    }

    // ========== Mode Tests ==========

    #[tokio::test]
    async fn test_suffix_translation() {
        let backend = MockBackend::new(MockMode::Suffix);
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        assert_eq!(handle.translate("hello").await.unwrap(), "hello_fr");
    }

    #[tokio::test]
    async fn test_mapping_translation_and_fallback() {
        let backend = MockBackend::new(MockMode::mappings([("Hello", "fr", "Bonjour")]));
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        assert_eq!(handle.translate("Hello").await.unwrap(), "Bonjour");
        assert_eq!(handle.translate("unknown").await.unwrap(), "unknown_fr");
    }

    #[tokio::test]
    async fn test_reorder() {
        let backend = MockBackend::new(MockMode::Reorder);
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        assert_eq!(handle.translate("one two three").await.unwrap(), "three two one");
    }

    #[tokio::test]
    async fn test_noop() {
        let backend = MockBackend::new(MockMode::NoOp);
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        assert_eq!(handle.translate("Paris").await.unwrap(), "Paris");
    }

    #[tokio::test]
    async fn test_error_mode_is_classified() {
        let backend = MockBackend::new(MockMode::Error(
            "Requires a user gesture while downloading".to_string(),
        ));
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        let err = handle.translate("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::ModelDownloading(_)));
    }

    // ========== Failure Injection Tests ==========

    #[tokio::test]
    async fn test_unavailable_backend() {
        let backend = MockBackend::new(MockMode::Suffix).unavailable();
        assert!(!backend.check_availability().await);
        assert_eq!(
            backend.create_translator(&en_fr()).await.err().unwrap(),
            BackendError::ApiUnavailable
        );
    }

    #[tokio::test]
    async fn test_failing_create() {
        let backend = MockBackend::new(MockMode::Suffix).failing_create("Unsupported language pair");
        let err = backend.create_translator(&en_fr()).await.err().unwrap();
        assert!(matches!(err, BackendError::PairUnsupported(_)));
        assert_eq!(backend.stats().created(), 0);
    }

    #[tokio::test]
    async fn test_per_text_failure() {
        let backend = MockBackend::new(MockMode::Suffix).fail_on("bad", "boom");
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        assert!(handle.translate("bad").await.is_err());
        assert_eq!(handle.translate("good").await.unwrap(), "good_fr");
    }

    // ========== Stats Tests ==========

    #[tokio::test]
    async fn test_stats_and_dispose() {
        let backend = MockBackend::new(MockMode::Suffix);
        let stats = backend.stats();
        let mut handle = backend.create_translator(&en_fr()).await.unwrap();
        handle.translate("a").await.unwrap();
        handle.translate("a").await.unwrap();
        handle.dispose();
        handle.dispose();

        assert_eq!(stats.created(), 1);
        assert_eq!(stats.translate_calls(), 2);
        assert_eq!(stats.calls_for("a"), 2);
        assert_eq!(stats.disposed(), 1);
        assert_eq!(stats.pairs(), vec![en_fr()]);
        assert_eq!(handle.translate("a").await.unwrap_err(), BackendError::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_adds_latency() {
        let backend = MockBackend::new(MockMode::Suffix).with_delay(50);
        let handle = backend.create_translator(&en_fr()).await.unwrap();
        let start = tokio::time::Instant::now();
        handle.translate("hello").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(MockBackend::new(MockMode::Suffix).backend_name(), "Mock Translator");
    }
}
