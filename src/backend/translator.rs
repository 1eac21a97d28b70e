//! Backend abstraction for translation providers.
//!
//! A [`TranslationBackend`] is the capability that can instantiate stateful
//! [`Translator`] handles for one language pair. Handles are owned by the
//! session layer and disposed explicitly when the pair changes.
//!
//! # Example
//!
//! ```ignore
//! use page_translator::backend::{MockBackend, MockMode, TranslationBackend};
//! use page_translator::LanguagePair;
//!
//! let backend = MockBackend::new(MockMode::Suffix);
//! let mut handle = backend.create_translator(&LanguagePair::new("en", "fr")).await?;
//! assert_eq!(handle.translate("hello").await?, "hello_fr");
//! handle.dispose();
//! ```

use crate::error::BackendResult;
use crate::language::LanguagePair;
use async_trait::async_trait;

/// Factory for per-pair translator handles.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Whether the capability exists in this context. Never fails.
    async fn check_availability(&self) -> bool;

    /// Create a translator for `pair`.
    ///
    /// May take a long time while a language model downloads; callers that
    /// want feedback wrap this in
    /// [`create_with_progress`](super::progress::create_with_progress).
    async fn create_translator(&self, pair: &LanguagePair) -> BackendResult<Box<dyn Translator>>;

    /// Name used in logs.
    fn backend_name(&self) -> &str;
}

/// A stateful translator bound to one language pair.
///
/// Implementations are not required to tolerate concurrent `translate` calls.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> BackendResult<String>;

    /// Release backend resources. Later `translate` calls fail with
    /// [`BackendError::Disposed`](crate::error::BackendError::Disposed).
    fn dispose(&mut self);

    fn pair(&self) -> &LanguagePair;
}
