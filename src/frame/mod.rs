//! Frames and the per-frame orchestrator.
//!
//! A [`Frame`] is one document context: the top-level page or an iframe.
//! Installing a frame creates its single [`PageTranslator`], which owns the
//! frame's discovery registry, mutation records and selection, and listens
//! on the frame's window for protocol messages. Only the top frame holds a
//! translation session; nested frames translate through their parent.
//!
//! Everything here is `!Send`: the document is reference counted, so frames
//! run as local tasks on a [`tokio::task::LocalSet`].

pub mod delegate;
mod handlers;

use crate::backend::{TranslationBackend, create_with_progress};
use crate::config::TranslatorConfig;
use crate::discovery::{self, UnitRegistry};
use crate::dom::{Document, SelectionRange};
use crate::error::{BackendError, TranslateError, TranslateResult};
use crate::events::{Command, EventSink, StatusEvent};
use crate::language::{self, LanguagePair};
use crate::mutation::{Decoration, MutationEngine, RestoreReport};
use crate::protocol::{self, FrameMessage, Inbox, PendingRequests, WindowHandle};
use crate::session::SessionManager;
use delegate::{ParentDelegate, SessionDelegate, UnitTranslator};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, trace, warn};

const PERMISSION_WARNING: &str =
    "Some iframe content cannot be translated due to security restrictions from the content provider.";

/// What a frame gets from its host.
#[derive(Clone)]
pub struct FrameServices {
    /// Backend for the top frame. Nested frames run without one.
    pub backend: Option<Arc<dyn TranslationBackend>>,
    pub events: EventSink,
    pub config: TranslatorConfig,
}

impl FrameServices {
    pub fn new(backend: Arc<dyn TranslationBackend>, events: EventSink) -> Self {
        Self {
            backend: Some(backend),
            events,
            config: TranslatorConfig::default(),
        }
    }

    pub fn without_backend(events: EventSink) -> Self {
        Self {
            backend: None,
            events,
            config: TranslatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TranslatorConfig) -> Self {
        self.config = config;
        self
    }
}

/// An iframe element as seen from its parent document.
#[derive(Debug, Clone)]
pub struct ChildFrame {
    pub src: String,
    /// `None` when the iframe's window is not reachable.
    pub window: Option<WindowHandle>,
}

/// One document context.
pub struct Frame {
    document: Document,
    window: WindowHandle,
    inbox: RefCell<Option<Inbox>>,
    parent: Option<WindowHandle>,
    children: Rc<RefCell<Vec<ChildFrame>>>,
    translator: RefCell<Option<PageTranslator>>,
}

impl Frame {
    /// The top-level page.
    pub fn top(document: Document, origin: &str) -> Self {
        Self::build(document, origin, None)
    }

    /// An iframe document whose parent is `parent`. Attach it on the parent
    /// side with [`Frame::attach_child`].
    pub fn nested(document: Document, origin: &str, parent: &Frame) -> Self {
        Self::with_parent(document, origin, parent.window.clone())
    }

    /// An iframe document whose parent is only known by its window.
    pub fn with_parent(document: Document, origin: &str, parent: WindowHandle) -> Self {
        Self::build(document, origin, Some(parent))
    }

    fn build(document: Document, origin: &str, parent: Option<WindowHandle>) -> Self {
        let (window, inbox) = protocol::channel(origin);
        Self {
            document,
            window,
            inbox: RefCell::new(Some(inbox)),
            parent,
            children: Rc::new(RefCell::new(Vec::new())),
            translator: RefCell::new(None),
        }
    }

    /// Register `child` as an iframe of this document.
    pub fn attach_child(&self, child: &Frame, src: &str) {
        self.children.borrow_mut().push(ChildFrame {
            src: src.to_string(),
            window: Some(child.window.clone()),
        });
    }

    /// Register an iframe whose window cannot be reached.
    pub fn attach_opaque_child(&self, src: &str) {
        self.children.borrow_mut().push(ChildFrame {
            src: src.to_string(),
            window: None,
        });
    }

    /// Register an iframe that accepts messages but never answers.
    pub fn attach_sandboxed_child(&self, src: &str, origin: &str) {
        let (window, _inbox) = protocol::channel(origin);
        self.children.borrow_mut().push(ChildFrame {
            src: src.to_string(),
            window: Some(window),
        });
    }

    pub fn window(&self) -> &WindowHandle {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_top(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> Vec<ChildFrame> {
        self.children.borrow().clone()
    }

    /// The installed translator, if any.
    pub fn translator(&self) -> Option<PageTranslator> {
        self.translator.borrow().clone()
    }

    /// Create this frame's translator and start its message loop.
    ///
    /// Installing twice returns the existing translator. Must be called
    /// from within a `LocalSet`.
    pub fn install(&self, services: FrameServices) -> PageTranslator {
        if let Some(existing) = self.translator.borrow().as_ref() {
            debug!(frame = self.window.id(), "translator already installed; skipping");
            return existing.clone();
        }

        let session = match (&self.parent, &services.backend) {
            (None, Some(backend)) => Some(Rc::new(Mutex::new(
                SessionManager::new(backend.clone())
                    .with_suspicion_checks(services.config.flag_suspicious_translations),
            ))),
            _ => None,
        };

        let translator = PageTranslator {
            inner: Rc::new(Inner {
                document: self.document.clone(),
                window: self.window.clone(),
                parent: self.parent.clone(),
                children: self.children.clone(),
                events: services.events,
                config: services.config,
                backend: services.backend,
                session,
                pending: Rc::new(PendingRequests::new()),
                registry: RefCell::new(UnitRegistry::new()),
                engine: RefCell::new(MutationEngine::new()),
                translating: Cell::new(false),
                page_pair: RefCell::new(None),
                selection: RefCell::new(None),
                pending_selection: RefCell::new(None),
                selection_request: RefCell::new(None),
                frame_responses: RefCell::new(HashSet::new()),
                frame_selection_status: RefCell::new(HashMap::new()),
                parent_has_selection: Cell::new(None),
                selection_waiters: RefCell::new(Vec::new()),
                download_offered: RefCell::new(HashSet::new()),
            }),
        };

        if let Some(inbox) = self.inbox.borrow_mut().take() {
            tokio::task::spawn_local(translator.clone().listen(inbox));
        }
        info!(
            frame = self.window.id(),
            top = self.is_top(),
            origin = self.window.origin(),
            "translator installed"
        );
        *self.translator.borrow_mut() = Some(translator.clone());
        translator
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("window", &self.window)
            .field("top", &self.is_top())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

/// Selection handed to the top frame for whole-selection translation.
struct PendingSelection {
    range: SelectionRange,
    original_text: String,
}

struct Inner {
    document: Document,
    window: WindowHandle,
    parent: Option<WindowHandle>,
    children: Rc<RefCell<Vec<ChildFrame>>>,
    events: EventSink,
    config: TranslatorConfig,
    backend: Option<Arc<dyn TranslationBackend>>,
    session: Option<Rc<Mutex<SessionManager>>>,
    pending: Rc<PendingRequests>,
    registry: RefCell<UnitRegistry>,
    engine: RefCell<MutationEngine>,
    translating: Cell<bool>,
    /// Pair of the page translation currently applied.
    page_pair: RefCell<Option<LanguagePair>>,
    selection: RefCell<Option<SelectionRange>>,
    pending_selection: RefCell<Option<PendingSelection>>,
    /// Pair of the last selection request broadcast to iframes.
    selection_request: RefCell<Option<LanguagePair>>,
    /// Windows that acknowledged the last page translation.
    frame_responses: RefCell<HashSet<u64>>,
    frame_selection_status: RefCell<HashMap<u64, bool>>,
    parent_has_selection: Cell<Option<bool>>,
    selection_waiters: RefCell<Vec<oneshot::Sender<bool>>>,
    download_offered: RefCell<HashSet<LanguagePair>>,
}

/// Clears the in-flight flag when a translation ends, however it ends.
struct TranslatingGuard(Rc<Inner>);

impl Drop for TranslatingGuard {
    fn drop(&mut self) {
        self.0.translating.set(false);
    }
}

/// Counts from one batch translation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub text_units: usize,
    pub attribute_units: usize,
    pub translated: usize,
    pub failed: usize,
    /// Units skipped because they already show a translation.
    pub already_translated: usize,
}

/// Text units weigh 80 points, attribute units 20. An empty category counts
/// as complete.
#[derive(Debug, Clone, Copy)]
struct BatchProgress {
    text_total: usize,
    text_done: usize,
    attribute_total: usize,
    attribute_done: usize,
}

impl BatchProgress {
    fn new(text_total: usize, attribute_total: usize) -> Self {
        Self {
            text_total,
            text_done: 0,
            attribute_total,
            attribute_done: 0,
        }
    }

    fn percent(&self) -> u32 {
        let share = |done: usize, total: usize| {
            if total == 0 {
                1.0
            } else {
                done as f64 / total as f64
            }
        };
        let text = share(self.text_done, self.text_total) * 80.0;
        let attributes = share(self.attribute_done, self.attribute_total) * 20.0;
        (text + attributes).round() as u32
    }
}

/// The translator of one frame. Cheap to clone.
#[derive(Clone)]
pub struct PageTranslator {
    inner: Rc<Inner>,
}

impl PageTranslator {
    pub fn is_top(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn window(&self) -> &WindowHandle {
        &self.inner.window
    }

    pub fn is_translating(&self) -> bool {
        self.inner.translating.get()
    }

    /// Mutations currently applied in this frame.
    pub fn applied_count(&self) -> usize {
        self.inner.engine.borrow().applied_count()
    }

    /// Cross-frame requests still awaiting an answer.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Iframes that acknowledged the last page translation.
    pub fn acknowledged_frames(&self) -> usize {
        self.inner.frame_responses.borrow().len()
    }

    pub fn session(&self) -> Option<Rc<Mutex<SessionManager>>> {
        self.inner.session.clone()
    }

    pub fn set_selection(&self, range: SelectionRange) {
        *self.inner.selection.borrow_mut() = Some(range);
    }

    pub fn clear_selection(&self) {
        self.inner.selection.borrow_mut().take();
    }

    /// The current selection if it is still valid and not blank.
    pub fn live_selection(&self) -> Option<SelectionRange> {
        let range = self.inner.selection.borrow().clone()?;
        if range.validate().is_err() || range.is_collapsed() || range.text().trim().is_empty() {
            return None;
        }
        Some(range)
    }

    pub fn has_local_selection(&self) -> bool {
        self.live_selection().is_some()
    }

    /// Run one host shell command to completion.
    pub async fn dispatch(&self, command: Command) {
        debug!(frame = self.inner.window.id(), command = command.name(), "command received");
        match command {
            Command::Translate { pair, decorate } => {
                if self.is_top() {
                    self.translate_page(&pair, decorate).await;
                } else {
                    debug!("nested frame ignores direct translate; parent coordinates");
                }
            }
            Command::Restore => {
                self.restore();
            }
            Command::TranslateSelection { pair, decorate } => {
                if self.is_top() {
                    self.translate_selection(&pair, decorate).await;
                } else {
                    debug!("nested frame ignores direct selection translate");
                }
            }
            Command::CheckAvailability { reply } => {
                let _ = reply.send(self.check_availability().await);
            }
            Command::DetectLanguage { reply } => {
                let _ = reply.send(self.detect_language());
            }
            Command::CheckSelection { reply } => {
                let _ = reply.send(self.check_selection().await);
            }
            Command::CheckIframeSelections => self.check_iframe_selections(),
            Command::DownloadLanguageModel { pair } => self.download_language_model(&pair).await,
        }
    }

    fn begin(&self) -> Option<TranslatingGuard> {
        if self.inner.translating.replace(true) {
            return None;
        }
        Some(TranslatingGuard(self.inner.clone()))
    }

    /// Translate this page, then ask every iframe to translate itself.
    ///
    /// Emits exactly one terminal event. A call while a translation is in
    /// flight does nothing.
    pub async fn translate_page(&self, pair: &LanguagePair, decorate: bool) {
        let Some(guard) = self.begin() else {
            debug!(%pair, "translation already in progress; ignoring");
            return;
        };
        info!(%pair, decorate, "translating page");

        let result = match self.inner.session.clone() {
            Some(session) => self.translate_with_session(session, pair, decorate).await,
            None => Err(BackendError::ApiUnavailable.into()),
        };
        drop(guard);

        match result {
            Ok(report) => {
                info!(%pair, ?report, "page translated");
                self.inner.events.emit(StatusEvent::complete(pair));
                self.translate_frames(pair, decorate);
            }
            Err(e) => {
                warn!(%pair, error = %e, "page translation failed");
                self.report_failure(pair, &e);
            }
        }
    }

    async fn translate_with_session(
        &self,
        session: Rc<Mutex<SessionManager>>,
        pair: &LanguagePair,
        decorate: bool,
    ) -> TranslateResult<BatchReport> {
        self.restore_if_switching(pair);
        session.lock().await.ensure_session(pair).await?;
        let delegate = SessionDelegate::new(session, pair.clone());
        self.run_batch(&delegate, decorate, true).await
    }

    /// Undo a page translation made under another pair.
    fn restore_if_switching(&self, pair: &LanguagePair) {
        let previous = self.inner.page_pair.replace(Some(pair.clone()));
        if let Some(previous) = previous.filter(|p| p != pair) {
            info!(%previous, %pair, "switching language pair; restoring page first");
            self.inner
                .engine
                .borrow_mut()
                .restore_all(self.inner.document.root(), true);
        }
    }

    /// Discover and translate every unit of this frame, one at a time.
    async fn run_batch(
        &self,
        delegate: &dyn UnitTranslator,
        decorate: bool,
        report_progress: bool,
    ) -> TranslateResult<BatchReport> {
        let pair = delegate.pair().clone();
        let document = &self.inner.document;
        let (texts, attributes) = {
            let mut registry = self.inner.registry.borrow_mut();
            registry.prune();
            (
                discovery::discover_text_units(&document.body(), &mut registry),
                discovery::discover_attribute_units(document.root(), &mut registry),
            )
        };

        let mut report = BatchReport::default();
        let (texts, attributes) = {
            let engine = self.inner.engine.borrow();
            let texts: Vec<_> = texts
                .into_iter()
                .filter(|u| !engine.is_live_translation(u))
                .collect();
            let attributes: Vec<_> = attributes
                .into_iter()
                .filter(|u| !engine.is_live_attribute(u))
                .collect();
            (texts, attributes)
        };
        report.text_units = texts.len();
        report.attribute_units = attributes.len();
        debug!(
            frame = self.inner.window.id(),
            texts = texts.len(),
            attributes = attributes.len(),
            "units discovered"
        );

        let mut progress = BatchProgress::new(texts.len(), attributes.len());
        let emit_progress = |progress: &BatchProgress| {
            if report_progress {
                self.inner.events.emit(StatusEvent::TranslationProgress {
                    progress: progress.percent(),
                });
            }
        };
        if report_progress {
            self.inner
                .events
                .emit(StatusEvent::TranslationProgress { progress: 0 });
        }

        for (index, unit) in texts.iter().enumerate() {
            match delegate.translate_unit(&unit.original_text).await {
                Ok(translated) => {
                    let decoration = decorate.then(|| Decoration::new(&pair.target));
                    let applied = self.inner.engine.borrow_mut().apply_to_text_node(
                        unit,
                        &translated,
                        decoration,
                    );
                    if applied {
                        report.translated += 1;
                    }
                }
                Err(e) if e.needs_download() => return Err(e),
                Err(e) => {
                    warn!(unit = %unit.id, error = %e, "unit translation failed; keeping original");
                    report.failed += 1;
                }
            }
            progress.text_done += 1;
            emit_progress(&progress);
            if index + 1 < texts.len() {
                tokio::time::sleep(self.inner.config.inter_unit_delay()).await;
            }
        }

        for (index, unit) in attributes.iter().enumerate() {
            match delegate.translate_unit(unit.text()).await {
                Ok(translated) => {
                    self.inner
                        .engine
                        .borrow_mut()
                        .apply_to_attribute(unit, &translated);
                    report.translated += 1;
                }
                Err(e) if e.needs_download() => return Err(e),
                Err(e) => {
                    warn!(unit = %unit.id, error = %e, "attribute translation failed; keeping original");
                    report.failed += 1;
                }
            }
            progress.attribute_done += 1;
            emit_progress(&progress);
            if index + 1 < attributes.len() {
                tokio::time::sleep(self.inner.config.inter_unit_delay()).await;
            }
        }

        if texts.is_empty() && attributes.is_empty() {
            emit_progress(&progress);
        }
        Ok(report)
    }

    /// Post `TRANSLATE_FRAME` to every iframe and watch for acknowledgments.
    fn translate_frames(&self, pair: &LanguagePair, decorate: bool) {
        let children = self.inner.children.borrow().clone();
        if children.is_empty() {
            return;
        }
        self.inner.frame_responses.borrow_mut().clear();

        let message = FrameMessage::TranslateFrame {
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
            decorate,
        };
        let mut contacted = Vec::new();
        let mut unreachable = 0;
        for child in children {
            match &child.window {
                Some(window) => {
                    let external = window.origin() != self.inner.window.origin();
                    debug!(src = %child.src, external, "asking iframe to translate");
                    window.post(&message, &self.inner.window);
                    contacted.push((child.src.clone(), window.id(), external));
                }
                None => {
                    debug!(src = %child.src, "iframe window not reachable");
                    unreachable += 1;
                }
            }
        }

        let this = self.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(this.inner.config.frame_ack_timeout()).await;
            let silent = {
                let responses = this.inner.frame_responses.borrow();
                contacted
                    .iter()
                    .filter(|(_, id, _)| !responses.contains(id))
                    .inspect(|(src, _, external)| {
                        if *external {
                            warn!(%src, "external iframe may not allow translation");
                        } else {
                            debug!(%src, "iframe did not acknowledge translation");
                        }
                    })
                    .count()
            };
            let failed = unreachable + silent;
            if failed > 0 {
                this.inner.events.emit(StatusEvent::IframeTranslationWarning {
                    message: format!(
                        "Some content in {} iframe(s) could not be translated due to security restrictions.",
                        failed
                    ),
                });
            }
        });
    }

    /// Undo every translation in this frame; the top frame also tells its
    /// iframes to restore.
    pub fn restore(&self) -> RestoreReport {
        let report = self
            .inner
            .engine
            .borrow_mut()
            .restore_all(self.inner.document.root(), false);
        self.inner.page_pair.borrow_mut().take();
        self.inner.pending_selection.borrow_mut().take();
        info!(frame = self.inner.window.id(), ?report, "restored original content");

        if self.is_top() {
            for window in self.child_windows() {
                window.post(&FrameMessage::RestoreFrame, &self.inner.window);
            }
        }
        report
    }

    /// Translate the current selection, or ask the iframes to translate
    /// theirs when this page has none.
    pub async fn translate_selection(&self, pair: &LanguagePair, decorate: bool) {
        if self.is_translating() {
            debug!("translation in progress; ignoring selection request");
            return;
        }
        let Some(range) = self.live_selection() else {
            let windows = self.child_windows();
            if self.is_top() && !windows.is_empty() {
                debug!(iframes = windows.len(), "no local selection; asking iframes");
                *self.inner.selection_request.borrow_mut() = Some(pair.clone());
                let message = FrameMessage::TranslateFrameSelection {
                    source_language: pair.source.clone(),
                    target_language: pair.target.clone(),
                    decorate,
                };
                for window in windows {
                    window.post(&message, &self.inner.window);
                }
                return;
            }
            self.inner
                .events
                .emit(StatusEvent::error(TranslateError::SelectionEmpty.to_string()));
            return;
        };

        let Some(_guard) = self.begin() else {
            return;
        };
        let result = match self.inner.session.clone() {
            Some(session) => {
                let delegate = SessionDelegate::new(session, pair.clone());
                self.translate_range(&delegate, range, decorate, false).await
            }
            None => Err(BackendError::ApiUnavailable.into()),
        };
        match result {
            Ok(()) => self.inner.events.emit(StatusEvent::complete(pair)),
            Err(e) => {
                warn!(%pair, error = %e, "selection translation failed");
                self.report_failure(pair, &e);
            }
        }
    }

    /// Translate the trimmed text of `range` as one unit and put the
    /// result in its place, keeping the surrounding whitespace.
    async fn translate_range(
        &self,
        delegate: &dyn UnitTranslator,
        range: SelectionRange,
        decorate: bool,
        from_frame: bool,
    ) -> TranslateResult<()> {
        range.validate()?;
        let original = range.text();
        let (leading, trimmed, trailing) = split_whitespace(&original);
        if trimmed.is_empty() {
            return Err(TranslateError::SelectionEmpty);
        }

        let translated = delegate.translate_unit(trimmed).await?;
        let target = &delegate.pair().target;
        self.apply_selection(
            range,
            &original,
            &translated,
            leading,
            trailing,
            decoration(target, decorate, from_frame),
        )
    }

    fn apply_selection(
        &self,
        range: SelectionRange,
        original: &str,
        translated: &str,
        leading: &str,
        trailing: &str,
        decoration: Option<Decoration<'_>>,
    ) -> TranslateResult<()> {
        let id = self.inner.registry.borrow_mut().next_selection_id();
        self.inner.engine.borrow_mut().apply_to_selection_range(
            id,
            &range,
            original,
            translated,
            leading,
            trailing,
            decoration,
        )?;
        self.clear_selection();
        Ok(())
    }

    /// Answer the host's availability probe. Nested frames have no backend.
    pub async fn check_availability(&self) -> bool {
        if !self.is_top() {
            return false;
        }
        let Some(backend) = &self.inner.backend else {
            return false;
        };
        match tokio::time::timeout(
            self.inner.config.availability_timeout(),
            backend.check_availability(),
        )
        .await
        {
            Ok(available) => available,
            Err(_) => {
                warn!("availability check timed out");
                false
            }
        }
    }

    pub fn detect_language(&self) -> String {
        language::detect_page_language(&self.inner.document)
    }

    /// Whether a selection exists here or, for a nested frame, in its
    /// parent. The parent's answer is awaited briefly and cached until the
    /// next check.
    pub async fn check_selection(&self) -> bool {
        if self.has_local_selection() {
            return true;
        }
        let Some(parent) = &self.inner.parent else {
            return false;
        };

        if !parent.post(&FrameMessage::CheckSelectionFromIframe, &self.inner.window) {
            return false;
        }
        let (tx, rx) = oneshot::channel();
        self.inner.selection_waiters.borrow_mut().push(tx);
        let wait = self.inner.config.selection_probe_timeout();
        let answer = match tokio::time::timeout(wait, rx).await {
            Ok(Ok(has_selection)) => Some(has_selection),
            _ => None,
        };
        // drop waiters whose receiver timed out
        self.inner
            .selection_waiters
            .borrow_mut()
            .retain(|tx| !tx.is_closed());
        answer.unwrap_or_else(|| self.inner.parent_has_selection.get().unwrap_or(false))
    }

    /// Ask every iframe whether it holds a selection. Positive answers are
    /// reported as `iframeHasSelection`.
    pub fn check_iframe_selections(&self) {
        if !self.is_top() {
            return;
        }
        self.inner.frame_selection_status.borrow_mut().clear();
        let windows = self.child_windows();
        debug!(iframes = windows.len(), "checking iframe selections");
        for window in windows {
            window.post(&FrameMessage::RequestSelectionStatus, &self.inner.window);
        }
    }

    /// Selection status reported by the iframe behind `window_id`.
    pub fn frame_selection_status(&self, window_id: u64) -> Option<bool> {
        self.inner.frame_selection_status.borrow().get(&window_id).copied()
    }

    /// Create (and thereby download) the model for `pair`, reporting
    /// progress, then make it the active session.
    pub async fn download_language_model(&self, pair: &LanguagePair) {
        self.inner.download_offered.borrow_mut().remove(pair);
        let events = self.inner.events.clone();
        events.emit(StatusEvent::LanguageDownloadStarted {
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
        });

        let progress = |progress: u32| {
            events.emit(StatusEvent::LanguageDownloadProgress {
                progress,
                source_language: pair.source.clone(),
                target_language: pair.target.clone(),
            });
        };

        let result = match &self.inner.backend {
            Some(backend) => async {
                let mut handle = create_with_progress(backend.as_ref(), pair, progress).await?;
                progress(80);
                if let Err(e) = handle.translate("Hello").await {
                    handle.dispose();
                    return Err(e);
                }
                progress(100);
                Ok::<_, BackendError>(handle)
            }
            .await,
            None => Err(BackendError::ApiUnavailable),
        };

        match result {
            Ok(handle) => {
                if let Some(session) = &self.inner.session {
                    session.lock().await.install(handle);
                }
                info!(%pair, "language model ready");
                tokio::time::sleep(self.inner.config.download_success_delay()).await;
                events.emit(StatusEvent::LanguageDownloadSuccess {
                    source_language: pair.source.clone(),
                    target_language: pair.target.clone(),
                });
            }
            Err(e) => {
                warn!(%pair, error = %e, "language model download failed");
                events.emit(StatusEvent::LanguageDownloadFailed {
                    source_language: pair.source.clone(),
                    target_language: pair.target.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit the terminal event for a failed operation: the download offer
    /// the first time a pair needs a model, a translation error otherwise.
    fn report_failure(&self, pair: &LanguagePair, error: &TranslateError) {
        if error.needs_download() && self.offer_download(pair, &error.to_string()) {
            return;
        }
        self.inner
            .events
            .emit(StatusEvent::error(error.user_message(pair)));
    }

    /// Emit `languageDownloadNeeded` unless already offered for `pair`.
    fn offer_download(&self, pair: &LanguagePair, error: &str) -> bool {
        if !self.inner.download_offered.borrow_mut().insert(pair.clone()) {
            debug!(%pair, "download already offered");
            return false;
        }
        info!(%pair, "language model download needed");
        self.inner.events.emit(StatusEvent::LanguageDownloadNeeded {
            source_language: pair.source.clone(),
            target_language: pair.target.clone(),
            error: error.to_string(),
        });
        true
    }

    fn child_windows(&self) -> Vec<WindowHandle> {
        self.inner
            .children
            .borrow()
            .iter()
            .filter_map(|c| c.window.clone())
            .collect()
    }

    fn parent_delegate(&self, pair: &LanguagePair) -> Option<ParentDelegate> {
        let parent = self.inner.parent.clone()?;
        Some(ParentDelegate::new(
            parent,
            self.inner.window.clone(),
            self.inner.pending.clone(),
            pair.clone(),
            self.inner.config.request_timeout(),
        ))
    }

    async fn listen(self, mut inbox: Inbox) {
        while let Some(envelope) = inbox.recv().await {
            match FrameMessage::from_wire(&envelope.data) {
                Ok(Some(message)) => self.handle_message(message, envelope.source),
                Ok(None) => trace!("ignoring foreign message"),
                Err(e) => warn!(error = %e, "malformed frame message"),
            }
        }
    }
}

impl std::fmt::Debug for PageTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTranslator")
            .field("frame", &self.inner.window.id())
            .field("top", &self.is_top())
            .field("translating", &self.inner.translating.get())
            .field("engine", &self.inner.engine.borrow())
            .finish()
    }
}

fn decoration(target: &str, decorate: bool, from_frame: bool) -> Option<Decoration<'_>> {
    match (decorate, from_frame) {
        (false, _) => None,
        (true, false) => Some(Decoration::new(target)),
        (true, true) => Some(Decoration::from_frame(target)),
    }
}

/// Split `text` into leading whitespace, trimmed body and trailing whitespace.
fn split_whitespace(text: &str) -> (&str, &str, &str) {
    let body_start = text.len() - text.trim_start().len();
    let body_end = text.trim_end().len().max(body_start);
    (&text[..body_start], &text[body_start..body_end], &text[body_end..])
}
