//! Translation cache and language-pair session.
//!
//! The [`SessionManager`] owns the single active backend handle of a page.
//! Switching pairs disposes the old handle and clears the cache before a new
//! handle is created, so no translation is ever served under a stale pair.
//! Within one session each distinct text reaches the backend at most once.

use crate::backend::{TranslationBackend, Translator};
use crate::diagnostics;
use crate::error::{BackendError, BackendResult};
use crate::language::LanguagePair;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `(pair, source text) → translation` memo.
#[derive(Debug, Default, Clone)]
pub struct TranslationCache {
    entries: HashMap<(LanguagePair, String), String>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pair: &LanguagePair, text: &str) -> Option<&String> {
        self.entries.get(&(pair.clone(), text.to_string()))
    }

    pub fn insert(&mut self, pair: &LanguagePair, text: &str, translated: String) {
        self.entries
            .insert((pair.clone(), text.to_string()), translated);
    }

    /// Number of entries cached under `pair`.
    pub fn count_for(&self, pair: &LanguagePair) -> usize {
        self.entries.keys().filter(|(p, _)| p == pair).count()
    }

    /// `(source, translation)` entries cached under `pair`.
    pub fn entries_for<'a>(
        &'a self,
        pair: &'a LanguagePair,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(move |((p, _), _)| p == pair)
            .map(|((_, source), out)| (source.as_str(), out.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What [`SessionManager::ensure_session`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Reused,
    Created,
    Switched { previous: LanguagePair },
}

struct ActiveSession {
    pair: LanguagePair,
    handle: Box<dyn Translator>,
}

/// Owner of the active language-pair session.
pub struct SessionManager {
    backend: Arc<dyn TranslationBackend>,
    active: Option<ActiveSession>,
    cache: TranslationCache,
    flag_suspicious: bool,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            backend,
            active: None,
            cache: TranslationCache::new(),
            flag_suspicious: false,
        }
    }

    /// Log implausible backend output (see [`diagnostics::check_translation`]).
    pub fn with_suspicion_checks(mut self, enabled: bool) -> Self {
        self.flag_suspicious = enabled;
        self
    }

    pub fn backend(&self) -> &Arc<dyn TranslationBackend> {
        &self.backend
    }

    pub fn active_pair(&self) -> Option<&LanguagePair> {
        self.active.as_ref().map(|s| &s.pair)
    }

    /// True when `pair` differs from an existing active session.
    pub fn needs_switch(&self, pair: &LanguagePair) -> bool {
        self.active_pair().is_some_and(|p| p != pair)
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Make `pair` the active session, creating a handle if needed.
    ///
    /// A previous handle for another pair is disposed and the cache cleared
    /// before the new handle is requested. If creation fails no session is
    /// left active.
    pub async fn ensure_session(&mut self, pair: &LanguagePair) -> BackendResult<SessionChange> {
        if self.active_pair() == Some(pair) {
            return Ok(SessionChange::Reused);
        }

        let previous = self.retire_active();
        let handle = self.backend.create_translator(pair).await?;
        self.cache.clear();
        self.active = Some(ActiveSession {
            pair: pair.clone(),
            handle,
        });

        info!(%pair, backend = self.backend.backend_name(), "translation session ready");
        Ok(match previous {
            Some(previous) => SessionChange::Switched { previous },
            None => SessionChange::Created,
        })
    }

    /// Install a handle created elsewhere (the download flow) as the active session.
    pub fn install(&mut self, handle: Box<dyn Translator>) {
        let pair = handle.pair().clone();
        if let Some(previous) = self.retire_active() {
            debug!(%previous, %pair, "replacing session with downloaded translator");
        }
        self.cache.clear();
        self.active = Some(ActiveSession { pair, handle });
    }

    /// Translate `text` under `pair`, serving repeats from the cache.
    pub async fn translate(&mut self, pair: &LanguagePair, text: &str) -> BackendResult<String> {
        self.ensure_session(pair).await?;
        if let Some(hit) = self.cache.get(pair, text) {
            debug!(%pair, text, "cache hit");
            return Ok(hit.clone());
        }

        let session = self.active.as_ref().ok_or(BackendError::Disposed)?;
        let translated = session.handle.translate(text).await?;

        if translated == text {
            debug!(%pair, text, "backend returned text unchanged");
        }
        if self.flag_suspicious {
            if let Some(suspicion) =
                diagnostics::check_translation(text, &translated, self.cache.entries_for(pair))
            {
                warn!(%pair, text, translated = %translated, %suspicion, "suspicious translation");
            }
        }

        self.cache.insert(pair, text, translated.clone());
        Ok(translated)
    }

    /// Dispose the active handle and forget all cached translations.
    pub fn reset(&mut self) {
        self.retire_active();
        self.cache.clear();
    }

    fn retire_active(&mut self) -> Option<LanguagePair> {
        let mut session = self.active.take()?;
        session.handle.dispose();
        self.cache.clear();
        debug!(pair = %session.pair, "disposed translation session");
        Some(session.pair)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("backend", &self.backend.backend_name())
            .field("active", &self.active_pair())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.retire_active();
    }
}
