//! Wire messages exchanged between frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every message type this crate sends or accepts.
pub const NAMESPACE: &str = "PGTR_";

/// One message on the frame channel.
///
/// Serialized with the namespaced `type` as the discriminant and camelCase
/// fields, e.g. `{"type":"PGTR_TEXT_TRANSLATION_REQUEST","requestId":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum FrameMessage {
    /// Top → iframe: translate your whole page through delegation.
    #[serde(rename = "PGTR_TRANSLATE_FRAME")]
    TranslateFrame {
        source_language: String,
        target_language: String,
        #[serde(default)]
        decorate: bool,
    },

    /// Top → iframe: undo your translations.
    #[serde(rename = "PGTR_RESTORE_FRAME")]
    RestoreFrame,

    #[serde(rename = "PGTR_FRAME_RESTORE_COMPLETE")]
    FrameRestoreComplete,

    #[serde(rename = "PGTR_FRAME_TRANSLATION_SUCCESS")]
    FrameTranslationSuccess,

    #[serde(rename = "PGTR_FRAME_TRANSLATION_FAILED")]
    FrameTranslationFailed {
        #[serde(default)]
        error: String,
    },

    /// Iframe → top: does the top document hold a selection?
    #[serde(rename = "PGTR_CHECK_SELECTION_FROM_IFRAME")]
    CheckSelectionFromIframe,

    #[serde(rename = "PGTR_SELECTION_STATUS_RESPONSE")]
    SelectionStatusResponse { has_selection: bool },

    /// Top → iframe: report whether you hold a selection.
    #[serde(rename = "PGTR_REQUEST_SELECTION_STATUS")]
    RequestSelectionStatus,

    #[serde(rename = "PGTR_FRAME_SELECTION_STATUS")]
    FrameSelectionStatus { has_selection: bool },

    /// Top → iframe: translate your selection, if you have one.
    #[serde(rename = "PGTR_TRANSLATE_FRAME_SELECTION")]
    TranslateFrameSelection {
        source_language: String,
        target_language: String,
        #[serde(default)]
        decorate: bool,
    },

    #[serde(rename = "PGTR_FRAME_SELECTION_TRANSLATED")]
    FrameSelectionTranslated,

    #[serde(rename = "PGTR_FRAME_SELECTION_TRANSLATION_FAILED")]
    FrameSelectionTranslationFailed {
        #[serde(default)]
        error: String,
    },

    /// Iframe → top: translate this selected text for me.
    #[serde(rename = "PGTR_FRAME_SELECTION_CONTENT")]
    FrameSelectionContent {
        selected_text: String,
        original_selected_text: String,
        source_language: String,
        target_language: String,
        #[serde(default)]
        decorate: bool,
    },

    /// Iframe → top: translate one unit through the shared session.
    #[serde(rename = "PGTR_TEXT_TRANSLATION_REQUEST")]
    TextTranslationRequest {
        request_id: String,
        text: String,
        source_language: String,
        target_language: String,
    },

    #[serde(rename = "PGTR_TEXT_TRANSLATION_RESPONSE")]
    TextTranslationResponse {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translated_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        success: bool,
    },

    /// Top → iframe: translated text for the pending selection.
    #[serde(rename = "PGTR_FRAME_TRANSLATED_CONTENT")]
    FrameTranslatedContent {
        translated_text: String,
        #[serde(default)]
        leading_whitespace: String,
        #[serde(default)]
        trailing_whitespace: String,
        #[serde(default)]
        decorate: bool,
        target_language: String,
    },
}

impl FrameMessage {
    /// Parse raw channel data.
    ///
    /// Returns `Ok(None)` for traffic that is not ours (no `type`, or a
    /// `type` without the namespace prefix). A namespaced message that does
    /// not match any variant is an error.
    pub fn from_wire(data: &Value) -> Result<Option<FrameMessage>, serde_json::Error> {
        let ours = data
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.starts_with(NAMESPACE));
        if !ours {
            return Ok(None);
        }
        serde_json::from_value(data.clone()).map(Some)
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Wire name, e.g. `PGTR_RESTORE_FRAME`.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameMessage::TranslateFrame { .. } => "PGTR_TRANSLATE_FRAME",
            FrameMessage::RestoreFrame => "PGTR_RESTORE_FRAME",
            FrameMessage::FrameRestoreComplete => "PGTR_FRAME_RESTORE_COMPLETE",
            FrameMessage::FrameTranslationSuccess => "PGTR_FRAME_TRANSLATION_SUCCESS",
            FrameMessage::FrameTranslationFailed { .. } => "PGTR_FRAME_TRANSLATION_FAILED",
            FrameMessage::CheckSelectionFromIframe => "PGTR_CHECK_SELECTION_FROM_IFRAME",
            FrameMessage::SelectionStatusResponse { .. } => "PGTR_SELECTION_STATUS_RESPONSE",
            FrameMessage::RequestSelectionStatus => "PGTR_REQUEST_SELECTION_STATUS",
            FrameMessage::FrameSelectionStatus { .. } => "PGTR_FRAME_SELECTION_STATUS",
            FrameMessage::TranslateFrameSelection { .. } => "PGTR_TRANSLATE_FRAME_SELECTION",
            FrameMessage::FrameSelectionTranslated => "PGTR_FRAME_SELECTION_TRANSLATED",
            FrameMessage::FrameSelectionTranslationFailed { .. } => {
                "PGTR_FRAME_SELECTION_TRANSLATION_FAILED"
            }
            FrameMessage::FrameSelectionContent { .. } => "PGTR_FRAME_SELECTION_CONTENT",
            FrameMessage::TextTranslationRequest { .. } => "PGTR_TEXT_TRANSLATION_REQUEST",
            FrameMessage::TextTranslationResponse { .. } => "PGTR_TEXT_TRANSLATION_RESPONSE",
            FrameMessage::FrameTranslatedContent { .. } => "PGTR_FRAME_TRANSLATED_CONTENT",
        }
    }
}
