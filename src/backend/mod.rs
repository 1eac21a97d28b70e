//! Translation backends.
//!
//! - [`TranslationBackend`] / [`Translator`]: the capability contract
//! - [`MockBackend`]: deterministic backend for tests and offline runs
//! - [`GoogleTranslateBackend`]: HTTP backend
//! - [`create_with_progress`]: translator creation with simulated progress

pub mod google;
pub mod mock;
pub mod progress;
pub mod translator;

pub use google::GoogleTranslateBackend;
pub use mock::{MockBackend, MockMode, MockStats};
pub use progress::{SimulatedProgress, create_with_progress};
pub use translator::{TranslationBackend, Translator};
