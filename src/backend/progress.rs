//! Simulated download progress.
//!
//! Creating a translator can trigger a model download that reports no
//! progress of its own. [`create_with_progress`] runs the creation call and
//! emits a synthetic, strictly increasing percentage until it resolves.

use super::translator::{TranslationBackend, Translator};
use crate::error::BackendResult;
use crate::language::LanguagePair;
use rand::Rng;
use std::time::Duration;

/// Interval between simulated progress updates.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Simulated progress never reaches this value.
pub const PROGRESS_CAP: f64 = 75.0;

/// Monotonic progress estimate capped below [`PROGRESS_CAP`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedProgress {
    value: f64,
    capped: bool,
}

impl SimulatedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `increment`. Returns the new rounded value, or `None` once the
    /// rounded estimate would reach the cap (after which it stays stopped).
    pub fn step(&mut self, increment: f64) -> Option<u32> {
        if self.capped {
            return None;
        }
        let next = self.value + increment.max(0.0);
        let shown = next.round();
        if shown >= PROGRESS_CAP {
            self.capped = true;
            return None;
        }
        self.value = next;
        Some(shown as u32)
    }

    /// Advance by a random 5–20 point increment.
    pub fn tick(&mut self, rng: &mut impl Rng) -> Option<u32> {
        self.step(rng.gen_range(5.0..20.0))
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_capped(&self) -> bool {
        self.capped
    }
}

/// Create a translator for `pair`, calling `on_progress` with simulated
/// progress every [`PROGRESS_INTERVAL`] until the backend answers.
pub async fn create_with_progress<F>(
    backend: &dyn TranslationBackend,
    pair: &LanguagePair,
    mut on_progress: F,
) -> BackendResult<Box<dyn Translator>>
where
    F: FnMut(u32),
{
    let create = backend.create_translator(pair);
    tokio::pin!(create);

    let mut progress = SimulatedProgress::new();
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + PROGRESS_INTERVAL,
        PROGRESS_INTERVAL,
    );

    loop {
        tokio::select! {
            result = &mut create => return result,
            _ = ticker.tick(), if !progress.is_capped() => {
                let next = progress.tick(&mut rand::thread_rng());
                if let Some(value) = next {
                    on_progress(value);
                }
            }
        }
    }
}
