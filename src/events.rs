//! Host shell interface: commands in, status events out.

use crate::language::LanguagePair;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Asynchronous status reported to the host shell.
///
/// Serialized as `{"action": "translationProgress", "progress": 40}` etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum StatusEvent {
    TranslationProgress {
        progress: u32,
    },
    TranslationComplete {
        source_language: String,
        target_language: String,
    },
    TranslationError {
        error: String,
    },
    IframeTranslationWarning {
        message: String,
    },
    IframeHasSelection {
        has_selection: bool,
    },
    LanguageDownloadNeeded {
        source_language: String,
        target_language: String,
        error: String,
    },
    LanguageDownloadStarted {
        source_language: String,
        target_language: String,
    },
    LanguageDownloadProgress {
        progress: u32,
        source_language: String,
        target_language: String,
    },
    LanguageDownloadSuccess {
        source_language: String,
        target_language: String,
    },
    LanguageDownloadFailed {
        source_language: String,
        target_language: String,
        error: String,
    },
}

impl StatusEvent {
    pub fn complete(pair: &LanguagePair) -> Self {
        StatusEvent::TranslationComplete {
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StatusEvent::TranslationError {
            error: message.into(),
        }
    }

    /// True for the events that end a page or selection translation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusEvent::TranslationComplete { .. }
                | StatusEvent::TranslationError { .. }
                | StatusEvent::LanguageDownloadNeeded { .. }
        )
    }
}

/// Sender side of the status stream. Emitting never fails; events sent
/// after the shell stopped listening are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    pub fn emit(&self, event: StatusEvent) {
        trace!(?event, "status event");
        if self.tx.send(event).is_err() {
            debug!("status listener gone; event dropped");
        }
    }
}

/// Commands dispatched by the host shell.
///
/// Request/response commands carry the reply channel.
#[derive(Debug)]
pub enum Command {
    Translate {
        pair: LanguagePair,
        decorate: bool,
    },
    Restore,
    TranslateSelection {
        pair: LanguagePair,
        decorate: bool,
    },
    CheckAvailability {
        reply: oneshot::Sender<bool>,
    },
    DetectLanguage {
        reply: oneshot::Sender<String>,
    },
    CheckSelection {
        reply: oneshot::Sender<bool>,
    },
    CheckIframeSelections,
    DownloadLanguageModel {
        pair: LanguagePair,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Translate { .. } => "translate",
            Command::Restore => "restore",
            Command::TranslateSelection { .. } => "translateSelection",
            Command::CheckAvailability { .. } => "checkAvailability",
            Command::DetectLanguage { .. } => "detectLanguage",
            Command::CheckSelection { .. } => "checkSelection",
            Command::CheckIframeSelections => "checkIframeSelections",
            Command::DownloadLanguageModel { .. } => "downloadLanguageModel",
        }
    }
}
