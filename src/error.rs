//! Error taxonomy for backend calls, cross-frame requests and selection handling.

use crate::language::LanguagePair;
use thiserror::Error;

/// Failure reported by a translation backend.
///
/// Backends surface free-form messages; [`BackendError::classify`] maps them
/// onto the variants the orchestrator routes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("translation API is not available in this context")]
    ApiUnavailable,

    /// Model download in progress. Retry later.
    #[error("{0}")]
    ModelDownloading(String),

    /// Model must be downloaded after a user action.
    #[error("{0}")]
    ModelNotDownloaded(String),

    #[error("{0}")]
    PairUnsupported(String),

    #[error("translator has been disposed")]
    Disposed,

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unknown(String),
}

impl BackendError {
    /// Classify a raw backend message.
    ///
    /// A message mentioning a required user gesture together with
    /// "downloading" is a download in progress; together with "downloadable"
    /// it is a model that was never fetched. "language pair" marks an
    /// unsupported pair.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("user gesture") {
            if lower.contains("downloading") {
                return BackendError::ModelDownloading(message.to_string());
            }
            if lower.contains("downloadable") {
                return BackendError::ModelNotDownloaded(message.to_string());
            }
        }
        if lower.contains("language pair") {
            return BackendError::PairUnsupported(message.to_string());
        }
        if lower.contains("not available") || lower.contains("unavailable") {
            return BackendError::ApiUnavailable;
        }
        BackendError::Unknown(message.to_string())
    }

    /// True when the condition is resolved by downloading a language model.
    pub fn needs_download(&self) -> bool {
        matches!(
            self,
            BackendError::ModelDownloading(_) | BackendError::ModelNotDownloaded(_)
        )
    }

    /// User-facing message for this error under `pair`.
    pub fn humanize(&self, pair: &LanguagePair) -> String {
        match self {
            BackendError::ModelDownloading(_) => format!(
                "Language model for {} is downloading. Please wait and try again.",
                pair.target
            ),
            BackendError::ModelNotDownloaded(_) => {
                format!("Language model for {} needs to be downloaded.", pair.target)
            }
            BackendError::PairUnsupported(_) => format!(
                "Translation from {} to {} is not supported.",
                pair.source, pair.target
            ),
            other => other.to_string(),
        }
    }
}

/// A stored selection range no longer matches the live document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range boundary is not a text node")]
    NotText,
    #[error("range boundary is detached from the document")]
    Detached,
    #[error("range boundaries belong to different documents")]
    ForeignDocument,
    #[error("range start comes after its end")]
    Inverted,
    #[error("offset {offset} is out of bounds for a node of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },
}

/// Errors surfaced by page, selection and delegated translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cross-frame request {request_id} timed out")]
    RequestTimeout { request_id: String },

    /// Error text relayed by the parent frame.
    #[error("{0}")]
    Delegated(String),

    #[error("No text selected")]
    SelectionEmpty,

    #[error("selection is no longer valid: {0}")]
    RangeInvalidated(#[from] RangeError),

    #[error("frame channel closed")]
    ChannelClosed,
}

impl TranslateError {
    pub fn needs_download(&self) -> bool {
        match self {
            TranslateError::Backend(e) => e.needs_download(),
            TranslateError::Delegated(msg) => BackendError::classify(msg).needs_download(),
            _ => false,
        }
    }

    /// User-facing text: backend errors are humanized, the rest use `Display`.
    pub fn user_message(&self, pair: &LanguagePair) -> String {
        match self {
            TranslateError::Backend(e) => e.humanize(pair),
            other => other.to_string(),
        }
    }
}

/// Failure loading settings or runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {key}: {value}")]
    Env { key: String, value: String },
}

pub type BackendResult<T> = Result<T, BackendError>;
pub type TranslateResult<T> = Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> LanguagePair {
        LanguagePair::new("en", "fr")
    }

    #[test]
    fn test_classify_downloading() {
        let e = BackendError::classify(
            "Requires a user gesture when availability is \"downloading\" or \"downloadable\".",
        );
        assert!(matches!(e, BackendError::ModelDownloading(_)));
        assert!(e.needs_download());
    }

    #[test]
    fn test_classify_downloadable() {
        let e = BackendError::classify("A user gesture is required: model is downloadable");
        assert!(matches!(e, BackendError::ModelNotDownloaded(_)));
        assert!(e.needs_download());
    }

    #[test]
    fn test_gesture_without_download_is_unknown() {
        let e = BackendError::classify("user gesture required");
        assert!(matches!(e, BackendError::Unknown(_)));
        assert!(!e.needs_download());
    }

    #[test]
    fn test_classify_pair() {
        let e = BackendError::classify("Unsupported language pair");
        assert!(matches!(e, BackendError::PairUnsupported(_)));
        assert_eq!(
            e.humanize(&pair()),
            "Translation from en to fr is not supported."
        );
    }

    #[test]
    fn test_humanize_download_messages() {
        assert_eq!(
            BackendError::ModelDownloading(String::new()).humanize(&pair()),
            "Language model for fr is downloading. Please wait and try again."
        );
        assert_eq!(
            BackendError::ModelNotDownloaded(String::new()).humanize(&pair()),
            "Language model for fr needs to be downloaded."
        );
    }

    #[test]
    fn test_unknown_keeps_raw_message() {
        let e = BackendError::classify("boom");
        assert_eq!(e.humanize(&pair()), "boom");
    }

    #[test]
    fn test_delegated_download_detection() {
        let e = TranslateError::Delegated("user gesture needed while downloading".into());
        assert!(e.needs_download());
        let e = TranslateError::RequestTimeout {
            request_id: "x".into(),
        };
        assert!(!e.needs_download());
    }
}
