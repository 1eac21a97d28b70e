//! Language pairs and page language detection.

use crate::dom::{self, Document};
use icu_locale::Locale;
use serde::{Deserialize, Serialize};

/// Source language value meaning "let the backend detect it".
pub const AUTO: &str = "auto";

/// Fallback when a page declares no language.
pub const DEFAULT_PAGE_LANGUAGE: &str = "en";

/// Ordered (source, target) language codes identifying one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguagePair {
    #[serde(rename = "sourceLanguage")]
    pub source: String,
    #[serde(rename = "targetLanguage")]
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// Primary language subtag of a BCP 47 tag, lowercased.
///
/// Underscore separators are accepted (`pt_BR`). Returns `None` when the tag
/// does not parse.
///
/// ```ignore
/// assert_eq!(primary_language("en-US").as_deref(), Some("en"));
/// assert_eq!(primary_language("zh_Hant").as_deref(), Some("zh"));
/// ```
pub fn primary_language(tag: &str) -> Option<String> {
    let normalized = tag.trim().replace('_', "-");
    if normalized.is_empty() {
        return None;
    }
    let locale: Locale = normalized.parse().ok()?;
    let language = locale.id.language.as_str().to_lowercase();
    if language == "und" {
        return None;
    }
    Some(language)
}

/// Whether `code` is usable as a pair member (`auto` is only valid as a source).
pub fn is_valid_code(code: &str) -> bool {
    code == AUTO || primary_language(code).is_some()
}

/// Declared language of a page.
///
/// Reads `<html lang>` first, then `<meta http-equiv="content-language">`,
/// and falls back to [`DEFAULT_PAGE_LANGUAGE`].
pub fn detect_page_language(doc: &Document) -> String {
    if let Some(lang) = doc
        .document_element()
        .and_then(|html| dom::get_attr(&html, "lang"))
        .and_then(|lang| primary_language(&lang))
    {
        return lang;
    }

    let meta_lang = doc.find_elements("meta").into_iter().find_map(|meta| {
        let equiv = dom::get_attr(&meta, "http-equiv")?;
        if !equiv.eq_ignore_ascii_case("content-language") {
            return None;
        }
        let content = dom::get_attr(&meta, "content")?;
        // content may list several languages
        let first = content.split(',').next()?.to_string();
        primary_language(&first)
    });

    meta_lang.unwrap_or_else(|| DEFAULT_PAGE_LANGUAGE.to_string())
}
