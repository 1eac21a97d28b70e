//! Protocol message handling.
//!
//! Every message kind has one arm. Each kind is meant for one side of the
//! top/iframe relationship; a frame on the other side drops it.

use super::{BatchReport, PERMISSION_WARNING, PageTranslator, PendingSelection, decoration, split_whitespace};
use crate::config::SelectionDelegation;
use crate::error::{BackendError, TranslateError};
use crate::events::StatusEvent;
use crate::language::LanguagePair;
use crate::protocol::{FrameMessage, WindowHandle};
use tracing::{debug, info, trace, warn};

impl PageTranslator {
    pub(super) fn handle_message(&self, message: FrameMessage, source: Option<WindowHandle>) {
        let kind = message.kind();
        let top = self.is_top();
        trace!(frame = self.inner.window.id(), kind, "message received");

        match message {
            FrameMessage::TranslateFrame {
                source_language,
                target_language,
                decorate,
            } => {
                if top {
                    return self.wrong_role(kind);
                }
                let this = self.clone();
                let pair = LanguagePair::new(source_language, target_language);
                tokio::task::spawn_local(async move { this.translate_as_frame(pair, decorate).await });
            }
            FrameMessage::RestoreFrame => {
                if top {
                    return self.wrong_role(kind);
                }
                self.restore();
                self.post_parent(&FrameMessage::FrameRestoreComplete);
            }
            FrameMessage::FrameRestoreComplete => {
                if !top {
                    return self.wrong_role(kind);
                }
                debug!(from = ?source.map(|s| s.id()), "iframe restored");
            }
            FrameMessage::FrameTranslationSuccess => {
                if !top {
                    return self.wrong_role(kind);
                }
                debug!("iframe translation succeeded");
                self.record_frame_response(source.as_ref());
            }
            FrameMessage::FrameTranslationFailed { error } => {
                if !top {
                    return self.wrong_role(kind);
                }
                warn!(%error, "iframe translation failed");
                self.record_frame_response(source.as_ref());
                if error.contains("permission") || error.contains("policy") {
                    self.inner.events.emit(StatusEvent::IframeTranslationWarning {
                        message: PERMISSION_WARNING.to_string(),
                    });
                }
            }
            FrameMessage::CheckSelectionFromIframe => {
                if !top {
                    return self.wrong_role(kind);
                }
                let Some(source) = self.require_source(source, kind) else {
                    return;
                };
                let has_selection = self.has_local_selection();
                if !has_selection {
                    for window in self.child_windows() {
                        window.post(&FrameMessage::RequestSelectionStatus, &self.inner.window);
                    }
                }
                source.post(
                    &FrameMessage::SelectionStatusResponse { has_selection },
                    &self.inner.window,
                );
            }
            FrameMessage::SelectionStatusResponse { has_selection } => {
                if top {
                    return self.wrong_role(kind);
                }
                self.inner.parent_has_selection.set(Some(has_selection));
                let waiters: Vec<_> = self.inner.selection_waiters.borrow_mut().drain(..).collect();
                for waiter in waiters {
                    let _ = waiter.send(has_selection);
                }
            }
            FrameMessage::RequestSelectionStatus => {
                if top {
                    return self.wrong_role(kind);
                }
                let has_selection = self.has_local_selection();
                debug!(has_selection, "reporting selection status to parent");
                self.post_parent(&FrameMessage::FrameSelectionStatus { has_selection });
            }
            FrameMessage::FrameSelectionStatus { has_selection } => {
                if !top {
                    return self.wrong_role(kind);
                }
                if let Some(source) = &source {
                    self.inner
                        .frame_selection_status
                        .borrow_mut()
                        .insert(source.id(), has_selection);
                }
                if has_selection {
                    self.inner
                        .events
                        .emit(StatusEvent::IframeHasSelection { has_selection });
                }
            }
            FrameMessage::TranslateFrameSelection {
                source_language,
                target_language,
                decorate,
            } => {
                if top {
                    return self.wrong_role(kind);
                }
                let this = self.clone();
                let pair = LanguagePair::new(source_language, target_language);
                tokio::task::spawn_local(async move {
                    this.translate_selection_as_frame(pair, decorate).await
                });
            }
            FrameMessage::FrameSelectionTranslated => {
                if !top {
                    return self.wrong_role(kind);
                }
                let pair = self.inner.selection_request.borrow_mut().take();
                match pair {
                    Some(pair) => self.inner.events.emit(StatusEvent::complete(&pair)),
                    None => debug!("unsolicited iframe selection confirmation"),
                }
            }
            FrameMessage::FrameSelectionTranslationFailed { error } => {
                if top {
                    self.inner.selection_request.borrow_mut().take();
                    let error = if error.is_empty() {
                        "Iframe selection translation failed".to_string()
                    } else {
                        error
                    };
                    self.inner.events.emit(StatusEvent::error(error));
                } else {
                    debug!(%error, "parent could not translate selection");
                    self.inner.pending_selection.borrow_mut().take();
                }
            }
            FrameMessage::FrameSelectionContent {
                selected_text,
                original_selected_text,
                source_language,
                target_language,
                decorate,
            } => {
                if !top {
                    return self.wrong_role(kind);
                }
                let Some(source) = self.require_source(source, kind) else {
                    return;
                };
                let this = self.clone();
                let pair = LanguagePair::new(source_language, target_language);
                tokio::task::spawn_local(async move {
                    this.translate_frame_selection(
                        source,
                        pair,
                        selected_text,
                        original_selected_text,
                        decorate,
                    )
                    .await
                });
            }
            FrameMessage::TextTranslationRequest {
                request_id,
                text,
                source_language,
                target_language,
            } => {
                if !top {
                    return self.wrong_role(kind);
                }
                let Some(source) = self.require_source(source, kind) else {
                    return;
                };
                let this = self.clone();
                let pair = LanguagePair::new(source_language, target_language);
                tokio::task::spawn_local(async move {
                    this.serve_text_request(source, request_id, pair, text).await
                });
            }
            FrameMessage::TextTranslationResponse {
                request_id,
                translated_text,
                error,
                success,
            } => {
                if top {
                    return self.wrong_role(kind);
                }
                let outcome = if success {
                    Ok(translated_text.unwrap_or_default())
                } else {
                    Err(error.unwrap_or_else(|| "Translation failed".to_string()))
                };
                self.inner.pending.resolve(&request_id, outcome);
            }
            FrameMessage::FrameTranslatedContent {
                translated_text,
                leading_whitespace,
                trailing_whitespace,
                decorate,
                target_language,
            } => {
                if top {
                    return self.wrong_role(kind);
                }
                let pending = self.inner.pending_selection.borrow_mut().take();
                let reply = match pending {
                    Some(pending) => {
                        match self.apply_selection(
                            pending.range,
                            &pending.original_text,
                            &translated_text,
                            &leading_whitespace,
                            &trailing_whitespace,
                            decoration(&target_language, decorate, true),
                        ) {
                            Ok(()) => FrameMessage::FrameSelectionTranslated,
                            Err(e) => FrameMessage::FrameSelectionTranslationFailed {
                                error: e.to_string(),
                            },
                        }
                    }
                    None => FrameMessage::FrameSelectionTranslationFailed {
                        error: "No pending selection range found".to_string(),
                    },
                };
                self.post_parent(&reply);
            }
        }
    }

    fn wrong_role(&self, kind: &str) {
        debug!(kind, top = self.is_top(), "message not meant for this frame; ignoring");
    }

    fn require_source(&self, source: Option<WindowHandle>, kind: &str) -> Option<WindowHandle> {
        if source.is_none() {
            warn!(kind, "message without a source window; cannot reply");
        }
        source
    }

    fn post_parent(&self, message: &FrameMessage) {
        if let Some(parent) = &self.inner.parent {
            parent.post(message, &self.inner.window);
        }
    }

    fn record_frame_response(&self, source: Option<&WindowHandle>) {
        if let Some(source) = source {
            self.inner.frame_responses.borrow_mut().insert(source.id());
        }
    }

    /// Translate this iframe's page through the parent, then acknowledge.
    async fn translate_as_frame(&self, pair: LanguagePair, decorate: bool) {
        let Some(delegate) = self.parent_delegate(&pair) else {
            return;
        };
        let outcome = match self.begin() {
            None => {
                debug!(%pair, "frame translation already in progress");
                Ok(BatchReport::default())
            }
            Some(guard) => {
                self.restore_if_switching(&pair);
                if self.inner.config.probe_parent_readiness {
                    delegate.wait_for_parent_ready(&self.inner.config).await;
                }
                let result = self.run_batch(&delegate, decorate, false).await;
                drop(guard);
                result
            }
        };

        let reply = match outcome {
            Ok(report) => {
                info!(frame = self.inner.window.id(), %pair, ?report, "frame translated");
                FrameMessage::FrameTranslationSuccess
            }
            Err(e) => {
                warn!(frame = self.inner.window.id(), %pair, error = %e, "frame translation failed");
                FrameMessage::FrameTranslationFailed {
                    error: e.to_string(),
                }
            }
        };
        self.post_parent(&reply);
    }

    /// Translate this iframe's selection on request of the top frame. A
    /// frame without a selection stays silent.
    async fn translate_selection_as_frame(&self, pair: LanguagePair, decorate: bool) {
        let Some(range) = self.live_selection() else {
            debug!("no selection in this frame");
            return;
        };

        match self.inner.config.selection_delegation {
            SelectionDelegation::PerUnit => {
                let Some(delegate) = self.parent_delegate(&pair) else {
                    return;
                };
                let Some(_guard) = self.begin() else {
                    debug!("translation in progress; ignoring selection request");
                    return;
                };
                let reply = match self.translate_range(&delegate, range, decorate, true).await {
                    Ok(()) => FrameMessage::FrameSelectionTranslated,
                    Err(e) => {
                        warn!(%pair, error = %e, "frame selection translation failed");
                        FrameMessage::FrameSelectionTranslationFailed {
                            error: e.to_string(),
                        }
                    }
                };
                self.post_parent(&reply);
            }
            SelectionDelegation::WholeSelection => {
                let original = range.text();
                let (_, trimmed, _) = split_whitespace(&original);
                let message = FrameMessage::FrameSelectionContent {
                    selected_text: trimmed.to_string(),
                    original_selected_text: original.clone(),
                    source_language: pair.source.clone(),
                    target_language: pair.target.clone(),
                    decorate,
                };
                *self.inner.pending_selection.borrow_mut() = Some(PendingSelection {
                    range,
                    original_text: original,
                });
                self.post_parent(&message);
            }
        }
    }

    /// Translate one unit for an iframe through the shared session.
    async fn serve_text_request(
        &self,
        source: WindowHandle,
        request_id: String,
        pair: LanguagePair,
        text: String,
    ) {
        let result = match &self.inner.session {
            Some(session) => session.lock().await.translate(&pair, &text).await,
            None => Err(BackendError::ApiUnavailable),
        };

        let response = match result {
            Ok(translated) => FrameMessage::TextTranslationResponse {
                request_id,
                translated_text: Some(translated),
                error: None,
                success: true,
            },
            Err(e) => {
                warn!(%request_id, %pair, error = %e, "translation for iframe failed");
                if e.needs_download() {
                    self.offer_download(&pair, &e.to_string());
                }
                FrameMessage::TextTranslationResponse {
                    request_id,
                    translated_text: None,
                    error: Some(e.humanize(&pair)),
                    success: false,
                }
            }
        };
        source.post(&response, &self.inner.window);
    }

    /// Translate a whole iframe selection and send the result back.
    async fn translate_frame_selection(
        &self,
        source: WindowHandle,
        pair: LanguagePair,
        selected_text: String,
        original_selected_text: String,
        decorate: bool,
    ) {
        let result = match &self.inner.session {
            Some(session) => session.lock().await.translate(&pair, &selected_text).await,
            None => Err(BackendError::ApiUnavailable),
        };

        let reply = match result {
            Ok(translated_text) => {
                let (leading, _, trailing) = split_whitespace(&original_selected_text);
                FrameMessage::FrameTranslatedContent {
                    translated_text,
                    leading_whitespace: leading.to_string(),
                    trailing_whitespace: trailing.to_string(),
                    decorate,
                    target_language: pair.target.clone(),
                }
            }
            Err(e) => {
                let e = TranslateError::from(e);
                warn!(%pair, error = %e, "iframe selection translation failed");
                self.inner.selection_request.borrow_mut().take();
                self.report_failure(&pair, &e);
                FrameMessage::FrameSelectionTranslationFailed {
                    error: e.user_message(&pair),
                }
            }
        };
        source.post(&reply, &self.inner.window);
    }
}
