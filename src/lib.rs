//! In-page translation coordinator
//!
//! Translates the visible text and accessibility attributes of an HTML page
//! through a pluggable backend, keeps exact records so every change can be
//! undone, and coordinates nested iframes that translate through the top
//! frame's single backend session.
//!
//! # Workflow Example
//!
//! ```ignore
//! use page_translator::{
//!     Command, Document, EventSink, Frame, FrameServices, LanguagePair, MockBackend, MockMode,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let local = tokio::task::LocalSet::new();
//!     local
//!         .run_until(async {
//!             // 1. Wire the frame tree
//!             let top = Frame::top(Document::parse("<p>Hello</p>"), "https://example.com");
//!             let (events, mut status) = EventSink::channel();
//!             let backend = Arc::new(MockBackend::new(MockMode::Suffix));
//!
//!             // 2. Install the translator and send it a command
//!             let translator = top.install(FrameServices::new(backend, events));
//!             translator
//!                 .dispatch(Command::Translate {
//!                     pair: LanguagePair::new("en", "fr"),
//!                     decorate: true,
//!                 })
//!                 .await;
//!
//!             // 3. Follow progress and the terminal event
//!             while let Ok(event) = status.try_recv() {
//!                 println!("{:?}", event);
//!             }
//!             println!("{}", top.document().to_html());
//!         })
//!         .await;
//! }
//! ```

pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod events;
pub mod frame;
pub mod language;
pub mod mutation;
pub mod protocol;
pub mod session;

// Integration tests (only available during testing)
#[cfg(test)]
mod integration_tests;

// Re-export main types for convenient access
pub use backend::{
    GoogleTranslateBackend, MockBackend, MockMode, MockStats, TranslationBackend, Translator,
};
pub use config::{SelectionDelegation, Settings, TranslatorConfig};
pub use discovery::{
    AttributeUnit, TextUnit, TranslationUnit, UnitId, UnitRegistry, discover_attribute_units,
    discover_text_units, discover_units_in_selection,
};
pub use dom::{Document, SelectionRange};
pub use error::{BackendError, ConfigError, RangeError, TranslateError, TranslateResult};
pub use events::{Command, EventSink, StatusEvent};
pub use frame::{BatchReport, ChildFrame, Frame, FrameServices, PageTranslator};
pub use language::{LanguagePair, detect_page_language};
pub use mutation::{Decoration, MutationEngine, RestoreReport};
pub use protocol::{FrameMessage, PendingRequests, WindowHandle};
pub use session::{SessionManager, TranslationCache};
