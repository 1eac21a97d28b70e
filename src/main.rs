use clap::{Arg, ArgAction, Command};
use page_translator::{
    Document, EventSink, Frame, FrameServices, GoogleTranslateBackend, LanguagePair, MockBackend,
    MockMode, Settings, StatusEvent, TranslationBackend, TranslatorConfig,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

const PAGE_ORIGIN: &str = "file://local";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("page-translate")
        .version("0.1.0")
        .about("Translate an HTML page and its iframes, then optionally restore it")
        .arg(
            Arg::new("page")
                .help("HTML file of the top-level page")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .short('t')
                .help("Target language code (e.g., fr, es, de)"),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .help("Source language code (default: auto)"),
        )
        .arg(
            Arg::new("frame")
                .long("frame")
                .short('f')
                .help("HTML file loaded as an iframe of the page (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock backend instead of Google Translate")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-decorate")
                .long("no-decorate")
                .help("Do not add lang attributes to translated content")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("restore")
                .long("restore")
                .short('r')
                .help("Restore the page afterwards and check it matches the input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .help("JSON settings file {sourceLanguage, targetLanguage, addLangAttributes}"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON file with runtime tunables"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Show debug logs and status events")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let default_directive = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match matches.get_one::<String>("settings") {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let config = match matches.get_one::<String>("config") {
        Some(path) => TranslatorConfig::load(path)?,
        None => TranslatorConfig::default(),
    }
    .with_env_overrides()?;

    let source = matches
        .get_one::<String>("source")
        .cloned()
        .unwrap_or(settings.source_language.clone());
    let target = matches
        .get_one::<String>("target")
        .cloned()
        .unwrap_or(settings.target_language.clone());
    let pair = LanguagePair::new(source, target);
    let decorate = settings.add_lang_attributes && !matches.get_flag("no-decorate");

    let backend: Arc<dyn TranslationBackend> = if matches.get_flag("mock") {
        Arc::new(MockBackend::new(MockMode::Suffix))
    } else {
        match GoogleTranslateBackend::from_env() {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                eprintln!("❌ GOOGLE_TRANSLATE_API_KEY environment variable not set ({})", e);
                eprintln!("   Set it with: export GOOGLE_TRANSLATE_API_KEY=your_api_key");
                eprintln!("   Or use --mock to use the mock backend");
                return Err("Missing API key".into());
            }
        }
    };

    let page_path = matches
        .get_one::<String>("page")
        .ok_or("page argument is required")?;
    let page_html = fs::read_to_string(page_path)?;
    let mut frame_sources = Vec::new();
    for path in matches.get_many::<String>("frame").into_iter().flatten() {
        frame_sources.push((path.clone(), fs::read_to_string(path)?));
    }

    let local = tokio::task::LocalSet::new();
    local
        .run_until(run(
            page_html,
            frame_sources,
            backend,
            config,
            pair,
            decorate,
            matches.get_flag("restore"),
            verbose,
        ))
        .await
}

#[allow(clippy::too_many_arguments)]
async fn run(
    page_html: String,
    frame_sources: Vec<(String, String)>,
    backend: Arc<dyn TranslationBackend>,
    config: TranslatorConfig,
    pair: LanguagePair,
    decorate: bool,
    restore: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (events, mut status) = EventSink::channel();

    let top = Frame::top(Document::parse(&page_html), PAGE_ORIGIN);
    let frames: Vec<Frame> = frame_sources
        .iter()
        .map(|(src, html)| {
            let frame = Frame::nested(Document::parse(html), PAGE_ORIGIN, &top);
            top.attach_child(&frame, src);
            frame
        })
        .collect();
    let originals: Vec<String> = std::iter::once(&top)
        .chain(&frames)
        .map(|f| f.document().to_html())
        .collect();

    let translator = top.install(FrameServices::new(backend, events.clone()).with_config(config.clone()));
    for frame in &frames {
        frame.install(FrameServices::without_backend(events.clone()).with_config(config.clone()));
    }

    translator
        .dispatch(page_translator::Command::Translate {
            pair: pair.clone(),
            decorate,
        })
        .await;

    let mut failed = false;
    for event in drain(&mut status) {
        report(&event, verbose);
        failed |= matches!(
            event,
            StatusEvent::TranslationError { .. } | StatusEvent::LanguageDownloadNeeded { .. }
        );
    }
    if failed {
        return Err(format!("translation {} failed", pair).into());
    }

    let started = tokio::time::Instant::now();
    while translator.acknowledged_frames() < frames.len() && started.elapsed() < config.frame_ack_timeout() {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    for event in drain(&mut status) {
        report(&event, verbose);
    }

    println!("{}", top.document().to_html());
    for ((src, _), frame) in frame_sources.iter().zip(&frames) {
        println!("<!-- iframe: {} -->", src);
        println!("{}", frame.document().to_html());
    }

    if restore {
        translator.dispatch(page_translator::Command::Restore).await;
        let started = tokio::time::Instant::now();
        while frames.iter().any(|f| f.translator().is_some_and(|t| t.applied_count() > 0))
            && started.elapsed() < config.frame_ack_timeout()
        {
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let restored: Vec<String> = std::iter::once(&top)
            .chain(&frames)
            .map(|f| f.document().to_html())
            .collect();
        if restored != originals {
            eprintln!("❌ Restored document differs from the input");
            return Err("restore mismatch".into());
        }
        eprintln!("✅ Restore verified: document matches the input");
    }

    Ok(())
}

fn drain(status: &mut UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = status.try_recv() {
        events.push(event);
    }
    events
}

fn report(event: &StatusEvent, verbose: bool) {
    match event {
        StatusEvent::TranslationProgress { .. } | StatusEvent::LanguageDownloadProgress { .. } => {
            if verbose {
                eprintln!("   {:?}", event);
            }
        }
        StatusEvent::TranslationComplete {
            source_language,
            target_language,
        } => eprintln!("✅ Translated {} → {}", source_language, target_language),
        StatusEvent::TranslationError { error } => eprintln!("❌ {}", error),
        StatusEvent::IframeTranslationWarning { message } => eprintln!("⚠️  {}", message),
        StatusEvent::LanguageDownloadNeeded {
            target_language,
            error,
            ..
        } => eprintln!("❌ Language model for {} must be downloaded: {}", target_language, error),
        other => eprintln!("   {:?}", other),
    }
}
