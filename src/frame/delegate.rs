//! Unit translators used by the orchestrator.
//!
//! The top frame translates through its own session; a nested frame sends
//! each unit to its parent and waits for the matching response. Both hold
//! the language pair they were built with, so a later pair change never
//! leaks into a translation already under way.

use crate::config::TranslatorConfig;
use crate::error::{TranslateError, TranslateResult};
use crate::language::LanguagePair;
use crate::protocol::{FrameMessage, PendingRequests, WindowHandle};
use crate::session::SessionManager;
use async_trait::async_trait;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Request id prefix for delegated unit translations.
pub const REQUEST_PREFIX: &str = "iframe-text";

const PROBE_PREFIX: &str = "readiness-probe";
const PROBE_TEXT: &str = "test";

#[async_trait(?Send)]
pub trait UnitTranslator {
    async fn translate_unit(&self, text: &str) -> TranslateResult<String>;

    fn pair(&self) -> &LanguagePair;
}

/// Translates through the shared session of the top frame.
pub struct SessionDelegate {
    session: Rc<Mutex<SessionManager>>,
    pair: LanguagePair,
}

impl SessionDelegate {
    pub fn new(session: Rc<Mutex<SessionManager>>, pair: LanguagePair) -> Self {
        Self { session, pair }
    }
}

#[async_trait(?Send)]
impl UnitTranslator for SessionDelegate {
    async fn translate_unit(&self, text: &str) -> TranslateResult<String> {
        let mut session = self.session.lock().await;
        Ok(session.translate(&self.pair, text).await?)
    }

    fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

/// Sends each unit to the parent window as a `TEXT_TRANSLATION_REQUEST`.
pub struct ParentDelegate {
    parent: WindowHandle,
    window: WindowHandle,
    pending: Rc<PendingRequests>,
    pair: LanguagePair,
    timeout: Duration,
}

impl ParentDelegate {
    pub fn new(
        parent: WindowHandle,
        window: WindowHandle,
        pending: Rc<PendingRequests>,
        pair: LanguagePair,
        timeout: Duration,
    ) -> Self {
        Self {
            parent,
            window,
            pending,
            pair,
            timeout,
        }
    }

    async fn request(&self, prefix: &str, text: &str, timeout: Duration) -> TranslateResult<String> {
        let (request_id, rx) = self.pending.register(prefix);
        let message = FrameMessage::TextTranslationRequest {
            request_id: request_id.clone(),
            text: text.to_string(),
            source_language: self.pair.source.clone(),
            target_language: self.pair.target.clone(),
        };
        if !self.parent.post(&message, &self.window) {
            self.pending.cancel(&request_id);
            return Err(TranslateError::ChannelClosed);
        }
        debug!(request_id = %request_id, pair = %self.pair, "translation requested from parent");
        self.pending.wait(&request_id, rx, timeout).await
    }

    /// Probe the parent until it can translate for this pair.
    ///
    /// The parent counts as ready once a probe succeeds or fails for a
    /// reason other than a model still downloading. Gives up after the
    /// readiness budget; callers translate anyway.
    pub async fn wait_for_parent_ready(&self, config: &TranslatorConfig) -> bool {
        let started = Instant::now();
        while started.elapsed() < config.readiness_budget() {
            match self
                .request(PROBE_PREFIX, PROBE_TEXT, config.readiness_probe_timeout())
                .await
            {
                Ok(_) => return true,
                Err(TranslateError::Delegated(message))
                    if !message.contains("downloading") || message.contains("downloadable") =>
                {
                    return true;
                }
                Err(e) => debug!(error = %e, "parent not ready yet"),
            }
            tokio::time::sleep(config.readiness_probe_interval()).await;
        }
        warn!(pair = %self.pair, "parent never became ready; translating anyway");
        false
    }
}

#[async_trait(?Send)]
impl UnitTranslator for ParentDelegate {
    async fn translate_unit(&self, text: &str) -> TranslateResult<String> {
        self.request(REQUEST_PREFIX, text, self.timeout).await
    }

    fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

impl std::fmt::Debug for ParentDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentDelegate")
            .field("parent", &self.parent)
            .field("pair", &self.pair)
            .finish()
    }
}
