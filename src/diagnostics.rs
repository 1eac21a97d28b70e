//! Heuristics for implausible backend output.
//!
//! Diagnostic only: callers log what [`check_translation`] reports and keep
//! the translation as returned.

use regex::Regex;
use std::sync::LazyLock;

static DATE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date pattern"));

static WORD_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("valid word pattern"));

#[derive(Debug, Clone, PartialEq)]
pub enum Suspicion {
    /// Long input came back as a bare date.
    DateLike,
    /// The same output was already produced for several other inputs.
    RepeatedOutput { count: usize },
    /// A lone "." expanded into a phrase.
    PunctuationExpanded,
    /// An unrelated input already produced this exact output.
    DivergentSources { other: String, similarity: f64 },
}

impl std::fmt::Display for Suspicion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Suspicion::DateLike => write!(f, "translation looks like a date"),
            Suspicion::RepeatedOutput { count } => {
                write!(f, "translation already returned for {} other inputs", count)
            }
            Suspicion::PunctuationExpanded => write!(f, "punctuation translated to a phrase"),
            Suspicion::DivergentSources { other, similarity } => write!(
                f,
                "same translation as unrelated input {:?} (similarity {:.2})",
                other, similarity
            ),
        }
    }
}

/// Check `translated` against earlier `(source, translation)` results of the
/// same session.
pub fn check_translation<'a>(
    original: &str,
    translated: &str,
    previous: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Option<Suspicion> {
    if original.chars().count() > 10
        && translated.chars().count() < 20
        && DATE_LIKE.is_match(translated)
    {
        return Some(Suspicion::DateLike);
    }

    let same_output: Vec<&str> = previous
        .into_iter()
        .filter(|(source, out)| *out == translated && *source != original)
        .map(|(source, _)| source)
        .collect();

    if same_output.len() >= 2 {
        return Some(Suspicion::RepeatedOutput {
            count: same_output.len(),
        });
    }

    if original == "." && translated.chars().count() > 10 {
        return Some(Suspicion::PunctuationExpanded);
    }

    if let Some(other) = same_output.first() {
        let similarity = word_similarity(original, other);
        if similarity < 0.3 {
            return Some(Suspicion::DivergentSources {
                other: other.to_string(),
                similarity,
            });
        }
    }

    None
}

/// Share of words (longer than two characters) the two texts have in common.
pub fn word_similarity(a: &str, b: &str) -> f64 {
    let words = |s: &str| -> Vec<String> {
        WORD_SPLIT
            .split(&s.to_lowercase())
            .filter(|w| w.chars().count() > 2)
            .map(|w| w.to_string())
            .collect()
    };
    let first = words(a);
    let second = words(b);
    if first.is_empty() || second.is_empty() {
        return 0.0;
    }
    let common = first.iter().filter(|w| second.contains(w)).count();
    common as f64 / first.len().max(second.len()) as f64
}
