//! End-to-end tests over whole frame trees.
//!
//! Every test drives real frames on a `LocalSet`: a top page with a mock
//! backend and, where needed, nested iframes that translate through it.
//! Timer-dependent tests run on a paused clock, so timeouts of several
//! seconds complete instantly.

#[cfg(test)]
mod tests {
    use crate::backend::{MockBackend, MockMode, MockStats};
    use crate::config::{SelectionDelegation, TranslatorConfig};
    use crate::dom::{self, Document, SelectionRange};
    use crate::events::{Command, EventSink, StatusEvent};
    use crate::frame::{Frame, FrameServices, PageTranslator};
    use crate::language::LanguagePair;
    use crate::mutation::{FRAME_MARKER, TRANSLATED_MARKER};
    use crate::protocol::{self, FrameMessage};
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::oneshot;
    use tokio::task::LocalSet;

    const ORIGIN: &str = "https://example.com";

    fn en_fr() -> LanguagePair {
        LanguagePair::new("en", "fr")
    }

    async fn run_local(test: impl Future<Output = ()>) {
        LocalSet::new().run_until(test).await;
    }

    /// Let queued messages and spawned tasks run.
    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// A top-level page with an installed translator and its status stream.
    struct Page {
        frame: Frame,
        translator: PageTranslator,
        events: EventSink,
        status: UnboundedReceiver<StatusEvent>,
        stats: Arc<MockStats>,
    }

    impl Page {
        fn new(html: &str, backend: MockBackend) -> Self {
            Self::with_config(html, backend, TranslatorConfig::default())
        }

        fn with_config(html: &str, backend: MockBackend, config: TranslatorConfig) -> Self {
            let stats = backend.stats();
            let (events, status) = EventSink::channel();
            let frame = Frame::top(Document::parse(html), ORIGIN);
            let translator = frame
                .install(FrameServices::new(Arc::new(backend), events.clone()).with_config(config));
            Self {
                frame,
                translator,
                events,
                status,
                stats,
            }
        }

        fn add_iframe(&self, html: &str, src: &str) -> (Frame, PageTranslator) {
            self.add_iframe_with(html, src, TranslatorConfig::default())
        }

        fn add_iframe_with(
            &self,
            html: &str,
            src: &str,
            config: TranslatorConfig,
        ) -> (Frame, PageTranslator) {
            let child = Frame::nested(Document::parse(html), ORIGIN, &self.frame);
            self.frame.attach_child(&child, src);
            let translator = child
                .install(FrameServices::without_backend(self.events.clone()).with_config(config));
            (child, translator)
        }

        fn html(&self) -> String {
            self.frame.document().to_html()
        }

        fn drain(&mut self) -> Vec<StatusEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.status.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn progress_values(events: &[StatusEvent]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::TranslationProgress { progress } => Some(*progress),
                _ => None,
            })
            .collect()
    }

    fn count_complete(events: &[StatusEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, StatusEvent::TranslationComplete { .. }))
            .count()
    }

    fn warnings(events: &[StatusEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                StatusEvent::IframeTranslationWarning { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn hello_world_backend() -> MockBackend {
        MockBackend::new(MockMode::mappings([
            ("Hello", "fr", "Bonjour"),
            ("World", "fr", "Monde"),
        ]))
    }

    // ============================================================================
    // Page translation and restore
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_translate_page_and_restore_exactly() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p><p>World</p>", hello_world_backend());
            let original = page.html();

            page.translator.translate_page(&en_fr(), true).await;

            assert_eq!(page.frame.document().visible_texts(), vec!["Bonjour", "Monde"]);
            assert!(page.html().contains("lang=\"fr\""));
            let events = page.drain();
            assert_eq!(progress_values(&events), vec![0, 60, 100]);
            assert_eq!(
                events.last(),
                Some(&StatusEvent::TranslationComplete {
                    source_language: "en".to_string(),
                    target_language: "fr".to_string(),
                })
            );

            let report = page.translator.restore();
            assert_eq!(report.text_nodes, 2);
            assert_eq!(page.html(), original);
            assert_eq!(page.translator.applied_count(), 0);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_weights_text_and_attributes() {
        run_local(async {
            let html = "<p>One</p><p>Two</p><p>Three</p><p>Four</p><p>Five</p><p>Six</p>\
                        <p>Seven</p><a title=\"Home\">Link</a><img alt=\"Logo\">\
                        <script>var skipped = 1;</script><p hidden>Secret</p>";
            let mut page = Page::new(html, MockBackend::new(MockMode::Suffix));

            page.translator.translate_page(&en_fr(), false).await;

            let events = page.drain();
            assert_eq!(
                progress_values(&events),
                vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
            );
            assert_eq!(count_complete(&events), 1);

            let anchor = &page.frame.document().find_elements("a")[0];
            assert_eq!(dom::get_attr(anchor, "title").as_deref(), Some("Home_fr"));
            let img = &page.frame.document().find_elements("img")[0];
            assert_eq!(dom::get_attr(img, "alt").as_deref(), Some("Logo_fr"));
            assert_eq!(page.stats.calls_for("Secret"), 0);
            assert_eq!(page.stats.calls_for("var skipped = 1;"), 0);
            assert!(!page.html().contains("lang=\"fr\""));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_page_reports_full_progress() {
        run_local(async {
            let mut page = Page::new("<div>   </div>", MockBackend::new(MockMode::Suffix));
            page.translator.translate_page(&en_fr(), true).await;

            let events = page.drain();
            assert_eq!(progress_values(&events), vec![0, 100]);
            assert_eq!(count_complete(&events), 1);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retranslating_same_pair_skips_translated_units() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p><p>World</p>", hello_world_backend());
            page.translator.translate_page(&en_fr(), true).await;
            let calls = page.stats.translate_calls();

            page.translator.translate_page(&en_fr(), true).await;

            assert_eq!(page.stats.translate_calls(), calls);
            assert_eq!(page.frame.document().visible_texts(), vec!["Bonjour", "Monde"]);
            assert_eq!(count_complete(&page.drain()), 2);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_pair_restores_before_translating() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            page.translator.translate_page(&en_fr(), true).await;
            assert_eq!(page.frame.document().visible_texts(), vec!["Hello_fr"]);

            page.translator
                .translate_page(&LanguagePair::new("en", "de"), true)
                .await;

            assert_eq!(page.frame.document().visible_texts(), vec!["Hello_de"]);
            assert!(page.html().contains("lang=\"de\""));
            assert_eq!(page.stats.created(), 2);
            assert_eq!(page.stats.disposed(), 1);
            assert_eq!(count_complete(&page.drain()), 2);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_translate_is_ignored() {
        run_local(async {
            let backend = MockBackend::new(MockMode::Suffix).with_delay(100);
            let mut page = Page::new("<p>Hello</p><p>World</p>", backend);
            let pair = en_fr();

            tokio::join!(
                page.translator.translate_page(&pair, true),
                page.translator.translate_page(&pair, true),
            );

            assert_eq!(page.stats.created(), 1);
            assert_eq!(page.stats.translate_calls(), 2);
            assert_eq!(count_complete(&page.drain()), 1);
            assert!(!page.translator.is_translating());
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_unit_keeps_original_text() {
        run_local(async {
            let backend = MockBackend::new(MockMode::Suffix).fail_on("World", "server exploded");
            let mut page = Page::new("<p>Hello</p><p>World</p>", backend);

            page.translator.translate_page(&en_fr(), true).await;

            assert_eq!(page.frame.document().visible_texts(), vec!["Hello_fr", "World"]);
            let events = page.drain();
            assert_eq!(count_complete(&events), 1);
            assert!(
                !events
                    .iter()
                    .any(|e| matches!(e, StatusEvent::TranslationError { .. }))
            );
        })
        .await;
    }

    // ============================================================================
    // Language model downloads
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_download_needed_is_signalled_once() {
        run_local(async {
            let backend = MockBackend::new(MockMode::Error(
                "Requires a user gesture when the model is downloading".to_string(),
            ));
            let mut page = Page::new("<p>Hello</p><p>World</p>", backend);

            page.translator.translate_page(&en_fr(), true).await;
            let events = page.drain();
            assert!(events.contains(&StatusEvent::LanguageDownloadNeeded {
                source_language: "en".to_string(),
                target_language: "fr".to_string(),
                error: "Requires a user gesture when the model is downloading".to_string(),
            }));
            assert!(
                !events
                    .iter()
                    .any(|e| matches!(e, StatusEvent::TranslationError { .. }))
            );
            assert_eq!(count_complete(&events), 0);
            // the batch stops at the first unit
            assert_eq!(page.stats.translate_calls(), 1);

            page.translator.translate_page(&en_fr(), true).await;
            let events = page.drain();
            assert!(events.contains(&StatusEvent::error(
                "Language model for fr is downloading. Please wait and try again."
            )));
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_language_model_installs_session() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            let pair = en_fr();

            page.translator
                .dispatch(Command::DownloadLanguageModel { pair: pair.clone() })
                .await;

            let events = page.drain();
            assert_eq!(
                events.first(),
                Some(&StatusEvent::LanguageDownloadStarted {
                    source_language: "en".to_string(),
                    target_language: "fr".to_string(),
                })
            );
            assert_eq!(
                events.last(),
                Some(&StatusEvent::LanguageDownloadSuccess {
                    source_language: "en".to_string(),
                    target_language: "fr".to_string(),
                })
            );
            let progress: Vec<u32> = events
                .iter()
                .filter_map(|e| match e {
                    StatusEvent::LanguageDownloadProgress { progress, .. } => Some(*progress),
                    _ => None,
                })
                .collect();
            assert_eq!(progress[progress.len() - 2..], [80, 100]);
            assert_eq!(page.stats.calls_for("Hello"), 1);

            let session = page.translator.session().unwrap();
            assert_eq!(session.lock().await.active_pair(), Some(&pair));

            // the downloaded handle serves the next translation
            page.translator.translate_page(&pair, true).await;
            assert_eq!(page.stats.created(), 1);
            assert_eq!(page.frame.document().visible_texts(), vec!["Hello_fr"]);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_failure_is_reported() {
        run_local(async {
            let backend =
                MockBackend::new(MockMode::Suffix).failing_create("Unsupported language pair");
            let mut page = Page::new("<p>Hello</p>", backend);

            page.translator.download_language_model(&en_fr()).await;

            let events = page.drain();
            assert!(matches!(
                events.last(),
                Some(StatusEvent::LanguageDownloadFailed { error, .. })
                    if error == "Unsupported language pair"
            ));
            assert!(page.translator.session().unwrap().lock().await.active_pair().is_none());
        })
        .await;
    }

    // ============================================================================
    // Host queries
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_detect_language_and_availability() {
        run_local(async {
            let page = Page::new(
                "<html lang=\"de-AT\"><body><p>Hallo</p></body></html>",
                MockBackend::new(MockMode::Suffix),
            );
            let (child, nested) = page.add_iframe("<p>x</p>", "child.html");

            let (tx, rx) = oneshot::channel();
            page.translator
                .dispatch(Command::DetectLanguage { reply: tx })
                .await;
            assert_eq!(rx.await.unwrap(), "de");

            let (tx, rx) = oneshot::channel();
            page.translator
                .dispatch(Command::CheckAvailability { reply: tx })
                .await;
            assert!(rx.await.unwrap());

            assert!(!nested.check_availability().await);
            assert_eq!(child.translator().unwrap().detect_language(), "en");

            let unavailable = Page::new("<p>x</p>", MockBackend::new(MockMode::Suffix).unavailable());
            assert!(!unavailable.translator.check_availability().await);
        })
        .await;
    }

    // ============================================================================
    // Iframes
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_iframe_translates_through_parent_and_restores() {
        run_local(async {
            let mut page = Page::new(
                "<p>Hello</p><iframe src=\"child.html\"></iframe>",
                hello_world_backend(),
            );
            let (child, nested) = page.add_iframe("<p>World</p><p>Hello</p>", "child.html");
            let top_original = page.html();
            let child_original = child.document().to_html();

            page.translator.translate_page(&en_fr(), true).await;
            settle(100).await;

            assert_eq!(page.frame.document().visible_texts(), vec!["Bonjour"]);
            assert_eq!(child.document().visible_texts(), vec!["Monde", "Bonjour"]);
            assert_eq!(page.translator.acknowledged_frames(), 1);
            assert_eq!(nested.pending_requests(), 0);
            // one shared session; the iframe's "Hello" came from the cache
            assert_eq!(page.stats.created(), 1);
            assert_eq!(page.stats.calls_for("Hello"), 1);
            assert_eq!(page.stats.calls_for("test"), 1);

            settle(3_000).await;
            let events = page.drain();
            assert_eq!(count_complete(&events), 1);
            assert!(warnings(&events).is_empty());

            page.translator.restore();
            settle(10).await;
            assert_eq!(page.html(), top_original);
            assert_eq!(child.document().to_html(), child_original);
            assert_eq!(nested.applied_count(), 0);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_iframes_raise_one_warning() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            page.frame.attach_opaque_child("https://ads.example.net/frame");
            page.frame
                .attach_sandboxed_child("https://video.example.org/embed", "https://video.example.org");

            page.translator.translate_page(&en_fr(), true).await;
            settle(2_900).await;
            assert!(warnings(&page.drain()).is_empty());

            settle(200).await;
            assert_eq!(
                warnings(&page.drain()),
                vec![
                    "Some content in 2 iframe(s) could not be translated due to security restrictions."
                        .to_string()
                ]
            );
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_failure_from_iframe_warns() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            let (stranger, _inbox) = protocol::channel(ORIGIN);

            page.frame.window().post(
                &FrameMessage::FrameTranslationFailed {
                    error: "Blocked by permissions policy".to_string(),
                },
                &stranger,
            );
            page.frame.window().post(
                &FrameMessage::FrameTranslationFailed {
                    error: "Something else".to_string(),
                },
                &stranger,
            );
            settle(10).await;

            assert_eq!(
                warnings(&page.drain()),
                vec![
                    "Some iframe content cannot be translated due to security restrictions from the content provider."
                        .to_string()
                ]
            );
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegated_request_times_out() {
        run_local(async {
            // the parent window is only read by the test, so nothing answers
            let (parent, mut parent_inbox) = protocol::channel(ORIGIN);
            let child = Frame::with_parent(Document::parse("<p>Hello</p>"), ORIGIN, parent.clone());
            let (events, _status) = EventSink::channel();
            let config = TranslatorConfig {
                probe_parent_readiness: false,
                ..TranslatorConfig::default()
            };
            let nested = child.install(FrameServices::without_backend(events).with_config(config));
            let original = child.document().to_html();

            child.window().post(
                &FrameMessage::TranslateFrame {
                    source_language: "en".to_string(),
                    target_language: "fr".to_string(),
                    decorate: true,
                },
                &parent,
            );
            settle(5_000).await;
            assert_eq!(nested.pending_requests(), 1);
            assert!(nested.is_translating());

            let mut request_id = None;
            while let Ok(envelope) = parent_inbox.try_recv() {
                if let Ok(Some(FrameMessage::TextTranslationRequest { request_id: id, text, .. })) =
                    FrameMessage::from_wire(&envelope.data)
                {
                    assert_eq!(text, "Hello");
                    request_id = Some(id);
                }
            }
            let request_id = request_id.expect("the child asked its parent for a translation");

            settle(5_100).await;
            assert_eq!(nested.pending_requests(), 0);
            assert!(!nested.is_translating());
            assert_eq!(child.document().to_html(), original);

            // the real response arriving after the timeout is dropped
            child.window().post(
                &FrameMessage::TextTranslationResponse {
                    request_id,
                    translated_text: Some("Bonjour".to_string()),
                    error: None,
                    success: true,
                },
                &parent,
            );
            settle(10).await;
            assert_eq!(child.document().to_html(), original);
            assert_eq!(nested.pending_requests(), 0);
            assert_eq!(nested.applied_count(), 0);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_for_the_other_role_are_ignored() {
        run_local(async {
            let page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            let (stranger, _inbox) = protocol::channel(ORIGIN);

            page.frame.window().post(
                &FrameMessage::TranslateFrame {
                    source_language: "en".to_string(),
                    target_language: "fr".to_string(),
                    decorate: true,
                },
                &stranger,
            );
            page.frame
                .window()
                .post_raw(serde_json::json!({"type": "SOMEONE_ELSES_MESSAGE"}), None);
            page.frame
                .window()
                .post_raw(serde_json::json!({"type": "PGTR_NOT_A_MESSAGE"}), None);
            settle(50).await;

            assert_eq!(page.frame.document().visible_texts(), vec!["Hello"]);
            assert_eq!(page.stats.translate_calls(), 0);
        })
        .await;
    }

    // ============================================================================
    // Selections
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_selection_keeps_whitespace_and_restores() {
        run_local(async {
            let mut page = Page::new(
                "<p>Say  Hello  now</p>",
                MockBackend::new(MockMode::mappings([("Hello", "fr", "Bonjour")])),
            );
            let original = page.html();
            let range = SelectionRange::select_text(page.frame.document(), "  Hello  ").unwrap();
            page.translator.set_selection(range);

            page.translator
                .dispatch(Command::TranslateSelection {
                    pair: en_fr(),
                    decorate: true,
                })
                .await;

            let paragraph = &page.frame.document().find_elements("p")[0];
            assert_eq!(dom::text_content(paragraph), "Say  Bonjour  now");
            assert!(page.html().contains(&format!(
                "<span lang=\"fr\" {}=\"true\">Bonjour</span>",
                TRANSLATED_MARKER
            )));
            assert_eq!(page.stats.texts(), vec!["Hello".to_string()]);
            assert_eq!(count_complete(&page.drain()), 1);
            assert!(!page.translator.has_local_selection());

            page.translator.restore();
            assert_eq!(page.html(), original);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_without_decoration_is_plain_text() {
        run_local(async {
            let page = Page::new("<p>Say Hello</p>", MockBackend::new(MockMode::Suffix));
            let range = SelectionRange::select_text(page.frame.document(), "Hello").unwrap();
            page.translator.set_selection(range);

            page.translator.translate_selection(&en_fr(), false).await;

            assert!(!page.html().contains(TRANSLATED_MARKER));
            let paragraph = &page.frame.document().find_elements("p")[0];
            assert_eq!(dom::text_content(paragraph), "Say Hello_fr");
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_selection_reports_error() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            page.translator.translate_selection(&en_fr(), true).await;
            assert_eq!(page.drain(), vec![StatusEvent::error("No text selected")]);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_caret_is_not_a_selection() {
        run_local(async {
            let mut page = Page::new("<p>Hello</p>", MockBackend::new(MockMode::Suffix));
            let node = page.frame.document().find_text("Hello").unwrap();
            let caret = SelectionRange::new(node.clone(), 2, node, 2).unwrap();
            page.translator.set_selection(caret);

            assert!(!page.translator.has_local_selection());
            page.translator.translate_selection(&en_fr(), true).await;
            assert_eq!(page.drain(), vec![StatusEvent::error("No text selected")]);
            assert_eq!(page.stats.texts(), Vec::<String>::new());
        })
        .await;
    }

    async fn iframe_selection(delegation: SelectionDelegation) {
        let mut page = Page::new(
            "<p>Top</p><iframe src=\"child.html\"></iframe>",
            MockBackend::new(MockMode::mappings([("Hello", "fr", "Bonjour")])),
        );
        let config = TranslatorConfig {
            selection_delegation: delegation,
            ..TranslatorConfig::default()
        };
        let (child, nested) = page.add_iframe_with("<p>Say Hello </p>", "child.html", config);
        let original = child.document().to_html();
        nested.set_selection(SelectionRange::select_text(child.document(), "Hello ").unwrap());

        page.translator
            .dispatch(Command::TranslateSelection {
                pair: en_fr(),
                decorate: true,
            })
            .await;
        settle(50).await;

        let paragraph = &child.document().find_elements("p")[0];
        assert_eq!(dom::text_content(paragraph), "Say Bonjour ");
        let html = child.document().to_html();
        assert!(html.contains(&format!("{}=\"true\"", FRAME_MARKER)));
        assert!(html.contains("lang=\"fr\""));
        assert_eq!(page.frame.document().visible_texts(), vec!["Top"]);
        assert_eq!(page.stats.texts(), vec!["Hello".to_string()]);
        assert_eq!(count_complete(&page.drain()), 1);

        page.translator.restore();
        settle(10).await;
        assert_eq!(child.document().to_html(), original);
    }

    #[tokio::test(start_paused = true)]
    async fn test_iframe_selection_per_unit() {
        run_local(iframe_selection(SelectionDelegation::PerUnit)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_iframe_selection_whole_selection() {
        run_local(iframe_selection(SelectionDelegation::WholeSelection)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_selection_asks_parent() {
        run_local(async {
            let page = Page::new("<p>Hello there</p>", MockBackend::new(MockMode::Suffix));
            let (_child, nested) = page.add_iframe("<p>Inner</p>", "child.html");

            assert!(!nested.check_selection().await);

            let range = SelectionRange::select_text(page.frame.document(), "Hello").unwrap();
            page.translator.set_selection(range);
            let (tx, rx) = oneshot::channel();
            nested.dispatch(Command::CheckSelection { reply: tx }).await;
            assert!(rx.await.unwrap());
            assert!(page.translator.check_selection().await);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_iframe_selections_reports_positive_frames() {
        run_local(async {
            let mut page = Page::new("<p>Top</p>", MockBackend::new(MockMode::Suffix));
            let (with_selection, selecting) = page.add_iframe("<p>Pick me</p>", "a.html");
            let (without_selection, _) = page.add_iframe("<p>Not me</p>", "b.html");
            selecting.set_selection(
                SelectionRange::select_text(with_selection.document(), "Pick").unwrap(),
            );

            page.translator.dispatch(Command::CheckIframeSelections).await;
            settle(10).await;

            assert_eq!(
                page.translator
                    .frame_selection_status(with_selection.window().id()),
                Some(true)
            );
            assert_eq!(
                page.translator
                    .frame_selection_status(without_selection.window().id()),
                Some(false)
            );
            assert_eq!(
                page.drain(),
                vec![StatusEvent::IframeHasSelection {
                    has_selection: true
                }]
            );
        })
        .await;
    }
}
