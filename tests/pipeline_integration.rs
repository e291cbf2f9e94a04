//! Integration tests for the task pipeline.
//!
//! Every collaborator is a stub: the messenger records what it sends, the
//! parser, fetcher and engine return scripted results and count their calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::time::timeout;

use resume_pipeline::channels::{
    DocumentRef, EventStream, InboundEvent, Messenger, local_file_name,
};
use resume_pipeline::config::{ConcurrencyPolicy, PipelineConfig, SESSION_TTL};
use resume_pipeline::dispatch::{DispatchOutcome, Rejection};
use resume_pipeline::documents::DocumentParser;
use resume_pipeline::error::{ChannelError, LlmError, StoreError};
use resume_pipeline::fetcher::{FetchOutcome, PostingFetcher};
use resume_pipeline::llm::AnalysisEngine;
use resume_pipeline::messages;
use resume_pipeline::store::{ManualClock, MemorySessionStore, SessionKind, SessionStore};
use resume_pipeline::{Pipeline, PipelineDeps};

/// Maximum time any test waits for workers before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Stubs ───────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingMessenger {
    delivered: Mutex<Vec<(String, String)>>,
    statuses: Mutex<Vec<(String, String)>>,
    downloads: Mutex<Vec<PathBuf>>,
    status_delay: Option<Duration>,
}

impl RecordingMessenger {
    fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }

    fn delivered_to(&self, user_id: &str) -> Vec<String> {
        self.delivered()
            .into_iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, text)| text)
            .collect()
    }

    fn statuses_to(&self, user_id: &str) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn deliver_text(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        self.delivered
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_status(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn download_document(
        &self,
        document: &DocumentRef,
        dest_dir: &Path,
    ) -> Result<PathBuf, ChannelError> {
        if document.file_ref == "missing" {
            return Err(ChannelError::DownloadFailed {
                name: "recording".into(),
                file_ref: document.file_ref.clone(),
                reason: "not found".into(),
            });
        }
        tokio::fs::create_dir_all(dest_dir).await.unwrap();
        let path = dest_dir.join(local_file_name(document));
        tokio::fs::write(&path, document.file_ref.as_bytes())
            .await
            .unwrap();
        self.downloads.lock().unwrap().push(path.clone());
        Ok(path)
    }
}

/// Returns the downloaded file's content as the extracted text.
#[derive(Default)]
struct EchoParser {
    calls: AtomicUsize,
}

impl DocumentParser for EchoParser {
    fn extract(&self, path: &Path) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, FetchOutcome>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn with_page(mut self, url: &str, outcome: FetchOutcome) -> Self {
        self.pages.insert(url.to_string(), outcome);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PostingFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(FetchOutcome::UnsupportedDomain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineMode {
    Ok,
    Fail,
    Panic,
}

struct StubEngine {
    mode: Mutex<EngineMode>,
    compares: Mutex<Vec<(String, String)>>,
    questions: Mutex<Vec<(String, String, String)>>,
}

impl StubEngine {
    fn new(mode: EngineMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            compares: Mutex::new(Vec::new()),
            questions: Mutex::new(Vec::new()),
        }
    }

    fn set_mode(&self, mode: EngineMode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn mode(&self) -> EngineMode {
        *self.mode.lock().unwrap()
    }

    fn compares(&self) -> Vec<(String, String)> {
        self.compares.lock().unwrap().clone()
    }

    fn questions(&self) -> Vec<(String, String, String)> {
        self.questions.lock().unwrap().clone()
    }

    fn outcome(&self, ok: String) -> Result<String, LlmError> {
        match self.mode() {
            EngineMode::Ok => Ok(ok),
            EngineMode::Fail => Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "rate limited".into(),
            }),
            EngineMode::Panic => panic!("engine exploded"),
        }
    }
}

#[async_trait]
impl AnalysisEngine for StubEngine {
    async fn compare_resume_to_job(
        &self,
        resume_text: &str,
        job_text: &str,
    ) -> Result<String, LlmError> {
        self.compares
            .lock()
            .unwrap()
            .push((resume_text.to_string(), job_text.to_string()));
        self.outcome("Probability of success: 70%".to_string())
    }

    async fn answer_question(
        &self,
        resume_text: &str,
        job_text: &str,
        question_text: &str,
    ) -> Result<String, LlmError> {
        self.questions.lock().unwrap().push((
            resume_text.to_string(),
            job_text.to_string(),
            question_text.to_string(),
        ));
        self.outcome(format!("answer to: {question_text}"))
    }
}

/// A store whose backing service is down.
struct DownStore;

#[async_trait]
impl SessionStore for DownStore {
    async fn put(
        &self,
        _kind: SessionKind,
        _user_id: &str,
        _text: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _kind: SessionKind, _user_id: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// ── Harness ─────────────────────────────────────────────────────────

struct Harness {
    pipeline: Pipeline,
    store: Arc<dyn SessionStore>,
    messenger: Arc<RecordingMessenger>,
    parser: Arc<EchoParser>,
    fetcher: Arc<ScriptedFetcher>,
    engine: Arc<StubEngine>,
    uploads: TempDir,
}

struct HarnessBuilder {
    config: PipelineConfig,
    store: Option<Arc<dyn SessionStore>>,
    fetcher: ScriptedFetcher,
    engine: EngineMode,
    status_delay: Option<Duration>,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: None,
            fetcher: ScriptedFetcher::default(),
            engine: EngineMode::Ok,
            status_delay: None,
        }
    }

    /// Every status message takes `delay` to reach the chat.
    fn slow_status(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn fetcher(mut self, fetcher: ScriptedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    fn engine(mut self, mode: EngineMode) -> Self {
        self.engine = mode;
        self
    }

    fn config(mut self, f: impl FnOnce(&mut PipelineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    fn build(self) -> Harness {
        let uploads = TempDir::new().unwrap();
        let mut config = self.config;
        config.upload_dir = uploads.path().join("incoming");

        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None => MemorySessionStore::new(),
        };
        let messenger = Arc::new(RecordingMessenger {
            status_delay: self.status_delay,
            ..Default::default()
        });
        let parser = Arc::new(EchoParser::default());
        let fetcher = Arc::new(self.fetcher);
        let engine = Arc::new(StubEngine::new(self.engine));

        let pipeline = Pipeline::new(
            config,
            PipelineDeps {
                store: store.clone(),
                messenger: messenger.clone(),
                parser: parser.clone(),
                fetcher: fetcher.clone(),
                engine: engine.clone(),
            },
        );

        Harness {
            pipeline,
            store,
            messenger,
            parser,
            fetcher,
            engine,
            uploads,
        }
    }
}

impl Harness {
    async fn send(&self, event: InboundEvent) -> DispatchOutcome {
        self.pipeline.dispatcher().dispatch(event).await
    }

    async fn wait_finished(&self, count: usize) {
        timeout(TEST_TIMEOUT, self.pipeline.stats().wait_finished(count))
            .await
            .expect("tasks did not finish in time");
    }

    /// Dispatch and wait for the resulting task to finish.
    async fn run_one(&self, event: InboundEvent) {
        let before = self.pipeline.stats().finished();
        let outcome = self.send(event).await;
        assert!(
            matches!(outcome, DispatchOutcome::Enqueued(_)),
            "expected task to be queued, got {outcome:?}"
        );
        self.wait_finished(before + 1).await;
    }
}

fn resume(user_id: &str, text: &str) -> InboundEvent {
    InboundEvent::document(user_id, DocumentRef::new(text, "resume.pdf"))
}

const POSTING_URL: &str = "https://hh.ru/vacancy/123";
const POSTING_TEXT: &str = "Backend engineer. Requirements: Rust, PostgreSQL, Kafka.";

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn resume_then_posting_produces_one_comparison() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into())),
        )
        .build();
    h.pipeline.start();

    h.run_one(resume("u1", "Rust developer, 5 years")).await;
    assert_eq!(h.messenger.delivered_to("u1"), vec![messages::RESUME_SAVED]);

    h.run_one(InboundEvent::text("u1", POSTING_URL)).await;

    let delivered = h.messenger.delivered_to("u1");
    assert_eq!(delivered.len(), 2);
    assert!(delivered[1].starts_with(messages::ANALYSIS_HEADER));
    assert!(delivered[1].contains("70%"));

    assert_eq!(
        h.engine.compares(),
        vec![(
            "Rust developer, 5 years".to_string(),
            POSTING_TEXT.to_string()
        )]
    );
    assert_eq!(
        h.store.get(SessionKind::Job, "u1").await.unwrap().as_deref(),
        Some(POSTING_TEXT)
    );

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn posting_without_resume_is_saved_for_later() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into())),
        )
        .build();
    h.pipeline.start();

    h.run_one(InboundEvent::text("u1", POSTING_URL)).await;

    assert_eq!(
        h.messenger.delivered_to("u1"),
        vec![messages::POSTING_SAVED_NO_RESUME]
    );
    assert!(h.engine.compares().is_empty());
    assert!(h.store.get(SessionKind::Job, "u1").await.unwrap().is_some());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn every_task_gets_exactly_one_terminal_message() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into()))
                .with_page("https://hh.ru/vacancy/9", FetchOutcome::Empty),
        )
        .build();
    h.store
        .put(SessionKind::Resume, "asker", "Go developer", SESSION_TTL)
        .await
        .unwrap();
    h.pipeline.start();

    let events = vec![
        resume("r1", "Python developer"),
        resume("r2", ""),
        InboundEvent::document("r3", DocumentRef::new("missing", "cv.docx")),
        InboundEvent::text("p1", POSTING_URL),
        InboundEvent::text("p2", "https://hh.ru/vacancy/9"),
        InboundEvent::text("p3", "https://example.com/job/1"),
        InboundEvent::text("asker", "am I a fit?"),
        InboundEvent::text("stranger", "am I a fit?"),
    ];
    let users: Vec<String> = events.iter().map(|e| e.user_id.clone()).collect();
    for event in events {
        assert!(matches!(h.send(event).await, DispatchOutcome::Enqueued(_)));
    }
    h.wait_finished(users.len()).await;

    for user in &users {
        assert_eq!(
            h.messenger.delivered_to(user).len(),
            1,
            "user {user} should get exactly one result"
        );
        assert!(!h.messenger.statuses_to(user).is_empty());
    }
    assert_eq!(h.messenger.delivered_to("r2"), vec![messages::RESUME_EMPTY]);
    assert_eq!(h.messenger.delivered_to("r3"), vec![messages::DOWNLOAD_FAILED]);
    assert_eq!(h.messenger.delivered_to("p2"), vec![messages::POSTING_EMPTY]);
    assert_eq!(
        h.messenger.delivered_to("p3"),
        vec![messages::POSTING_UNSUPPORTED_DOMAIN]
    );
    assert_eq!(
        h.messenger.delivered_to("stranger"),
        vec![messages::UPLOAD_RESUME_FIRST]
    );

    let snapshot = h.pipeline.snapshot();
    assert_eq!(snapshot.enqueued, users.len());
    assert_eq!(snapshot.finished(), users.len());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn fifty_first_task_is_rejected_immediately() {
    let h = HarnessBuilder::new().build();

    for i in 0..50 {
        let outcome = h
            .send(InboundEvent::text(format!("user-{i}"), "question"))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Enqueued(_)));
    }
    assert_eq!(h.pipeline.queue_len(), 50);

    let outcome = timeout(
        Duration::from_millis(500),
        h.send(InboundEvent::text("user-50", "question")),
    )
    .await
    .expect("enqueue must not block");

    assert_eq!(outcome, DispatchOutcome::Rejected(Rejection::QueueFull));
    assert_eq!(h.pipeline.queue_len(), 50);
    assert_eq!(h.messenger.delivered_to("user-50"), vec![messages::QUEUE_FULL]);
    assert!(h.messenger.delivered_to("user-0").is_empty());
}

#[tokio::test]
async fn question_without_resume_never_calls_engine() {
    let h = HarnessBuilder::new().build();
    h.pipeline.start();

    h.run_one(InboundEvent::text("u1", "what should I improve?"))
        .await;

    assert_eq!(
        h.messenger.delivered_to("u1"),
        vec![messages::UPLOAD_RESUME_FIRST]
    );
    assert!(h.engine.questions().is_empty());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn question_without_posting_carries_caveat() {
    let h = HarnessBuilder::new().build();
    h.store
        .put(SessionKind::Resume, "u1", "Data engineer", SESSION_TTL)
        .await
        .unwrap();
    h.pipeline.start();

    h.run_one(InboundEvent::text("u1", "what should I improve?"))
        .await;

    let delivered = h.messenger.delivered_to("u1");
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].starts_with(messages::NO_POSTING_CAVEAT));
    assert!(delivered[0].contains("answer to: what should I improve?"));
    assert_eq!(
        h.engine.questions(),
        vec![(
            "Data engineer".to_string(),
            String::new(),
            "what should I improve?".to_string()
        )]
    );

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn session_values_expire_after_ttl() {
    let clock = ManualClock::new(Utc::now());
    let store = MemorySessionStore::with_clock(clock.clone());
    let h = HarnessBuilder::new().store(store).build();
    h.pipeline.start();

    h.run_one(resume("u1", "Rust developer")).await;

    clock.advance(SESSION_TTL - Duration::from_secs(1));
    assert!(h.store.get(SessionKind::Resume, "u1").await.unwrap().is_some());

    clock.advance(Duration::from_secs(2));
    assert!(h.store.get(SessionKind::Resume, "u1").await.unwrap().is_none());

    h.run_one(InboundEvent::text("u1", "am I a fit?")).await;
    assert_eq!(
        h.messenger.delivered_to("u1").last().map(String::as_str),
        Some(messages::UPLOAD_RESUME_FIRST)
    );
    assert!(h.engine.questions().is_empty());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn reingest_overwrites_and_resets_ttl() {
    let clock = ManualClock::new(Utc::now());
    let store = MemorySessionStore::with_clock(clock.clone());
    let h = HarnessBuilder::new().store(store).build();
    h.pipeline.start();

    h.run_one(resume("u1", "first version")).await;
    clock.advance(Duration::from_secs(100_000));
    h.run_one(resume("u1", "second version")).await;
    clock.advance(Duration::from_secs(100_000));

    assert_eq!(
        h.store
            .get(SessionKind::Resume, "u1")
            .await
            .unwrap()
            .as_deref(),
        Some("second version")
    );

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn failing_engine_does_not_lose_workers() {
    let h = HarnessBuilder::new()
        .engine(EngineMode::Fail)
        .config(|c| c.worker_count = 2)
        .build();
    for i in 0..4 {
        h.store
            .put(SessionKind::Resume, &format!("u{i}"), "resume", SESSION_TTL)
            .await
            .unwrap();
    }
    h.pipeline.start();

    for i in 0..4 {
        h.send(InboundEvent::text(format!("u{i}"), "question")).await;
    }
    h.wait_finished(4).await;
    for i in 0..4 {
        assert_eq!(
            h.messenger.delivered_to(&format!("u{i}")),
            vec![messages::ANSWER_FAILED]
        );
    }

    h.engine.set_mode(EngineMode::Ok);
    h.run_one(InboundEvent::text("u0", "question again")).await;
    assert_eq!(
        h.messenger.delivered_to("u0").last().cloned(),
        Some(format!(
            "{}\n\nanswer to: question again",
            messages::NO_POSTING_CAVEAT
        ))
    );

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn panicking_engine_does_not_lose_workers() {
    let h = HarnessBuilder::new()
        .engine(EngineMode::Panic)
        .config(|c| c.worker_count = 1)
        .build();
    for user in ["a", "b", "c"] {
        h.store
            .put(SessionKind::Resume, user, "resume", SESSION_TTL)
            .await
            .unwrap();
    }
    h.pipeline.start();

    for user in ["a", "b"] {
        h.send(InboundEvent::text(user, "question")).await;
    }
    h.wait_finished(2).await;
    assert_eq!(h.messenger.delivered_to("a"), vec![messages::TRY_LATER]);
    assert_eq!(h.messenger.delivered_to("b"), vec![messages::TRY_LATER]);
    assert_eq!(h.pipeline.snapshot().failed, 2);

    h.engine.set_mode(EngineMode::Ok);
    h.run_one(InboundEvent::text("c", "question")).await;
    assert_eq!(h.messenger.delivered_to("c").len(), 1);
    assert_eq!(h.pipeline.snapshot().delivered, 1);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn scenario_pdf_resume_and_hh_link() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into())),
        )
        .build();
    h.pipeline.start();

    h.run_one(resume("42", "Senior Rust engineer")).await;
    h.run_one(InboundEvent::text("42", POSTING_URL)).await;

    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.compares().len(), 1);

    let delivered = h.messenger.delivered_to("42");
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0], messages::RESUME_SAVED);
    assert!(delivered[1].starts_with(messages::ANALYSIS_HEADER));

    let statuses = h.messenger.statuses_to("42");
    assert!(statuses.iter().any(|s| s == messages::DOCUMENT_ACCEPTED));
    assert!(statuses.iter().any(|s| s == messages::POSTING_ACCEPTED));

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn downloaded_document_is_deleted_after_extraction() {
    let h = HarnessBuilder::new().build();
    h.pipeline.start();

    h.run_one(resume("u1", "Rust developer")).await;
    h.run_one(resume("u2", "")).await;

    let downloads = h.messenger.downloads();
    assert_eq!(downloads.len(), 2);
    for path in downloads {
        assert!(path.starts_with(h.uploads.path()));
        assert!(!path.exists(), "{} should be deleted", path.display());
    }

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn slow_fetch_times_out_with_one_message() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into()))
                .with_delay(Duration::from_millis(500)),
        )
        .config(|c| c.fetch_timeout = Duration::from_millis(50))
        .build();
    h.pipeline.start();

    h.run_one(InboundEvent::text("u1", POSTING_URL)).await;

    assert_eq!(
        h.messenger.delivered_to("u1"),
        vec![messages::POSTING_FETCH_FAILED]
    );
    assert!(h.store.get(SessionKind::Job, "u1").await.unwrap().is_none());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn resume_and_link_sent_back_to_back_compare_once() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into())),
        )
        .build();
    h.pipeline.start();

    let events = vec![
        resume("u1", "Rust developer, 5 years"),
        InboundEvent::text("u1", POSTING_URL),
    ];
    h.pipeline.run(Box::pin(futures::stream::iter(events))).await;
    h.wait_finished(2).await;

    assert_eq!(
        h.engine.compares(),
        vec![(
            "Rust developer, 5 years".to_string(),
            POSTING_TEXT.to_string()
        )]
    );
    let delivered = h.messenger.delivered_to("u1");
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0], messages::RESUME_SAVED);
    assert!(delivered[1].starts_with(messages::ANALYSIS_HEADER));
    assert_eq!(h.pipeline.snapshot().rejected, 0);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn busy_user_tasks_run_in_arrival_order() {
    let h = HarnessBuilder::new()
        .fetcher(
            ScriptedFetcher::default()
                .with_page(POSTING_URL, FetchOutcome::Text(POSTING_TEXT.into()))
                .with_delay(Duration::from_millis(200)),
        )
        .build();
    h.pipeline.start();

    assert!(matches!(
        h.send(InboundEvent::text("u1", POSTING_URL)).await,
        DispatchOutcome::Enqueued(_)
    ));
    assert!(matches!(
        h.send(InboundEvent::text("u1", "and another thing")).await,
        DispatchOutcome::Enqueued(_)
    ));

    h.wait_finished(2).await;
    assert_eq!(
        h.messenger.delivered_to("u1"),
        vec![
            messages::POSTING_SAVED_NO_RESUME.to_string(),
            messages::UPLOAD_RESUME_FIRST.to_string()
        ]
    );
    assert_eq!(
        h.messenger.statuses_to("u1"),
        vec![messages::POSTING_ACCEPTED, messages::QUESTION_ACCEPTED]
    );

    // The lane is free again once both results are out.
    h.run_one(InboundEvent::text("u1", "hello")).await;

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn slow_acknowledgement_does_not_hold_up_other_users() {
    let h = HarnessBuilder::new()
        .slow_status(Duration::from_secs(2))
        .build();

    let events = vec![
        InboundEvent::text("u1", "question"),
        InboundEvent::text("u2", "question"),
    ];
    timeout(
        Duration::from_millis(500),
        h.pipeline.run(Box::pin(futures::stream::iter(events))),
    )
    .await
    .expect("run must not wait for acknowledgements");

    assert_eq!(h.pipeline.queue_len(), 2);
    assert!(h.messenger.statuses_to("u2").is_empty());
}

#[tokio::test]
async fn interleave_policy_accepts_concurrent_tasks() {
    let h = HarnessBuilder::new()
        .config(|c| c.policy = ConcurrencyPolicy::Interleave)
        .build();
    h.pipeline.start();

    for _ in 0..3 {
        assert!(matches!(
            h.send(InboundEvent::text("u1", "question")).await,
            DispatchOutcome::Enqueued(_)
        ));
    }
    h.wait_finished(3).await;
    assert_eq!(h.messenger.delivered_to("u1").len(), 3);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn store_outage_reports_try_later() {
    let h = HarnessBuilder::new().store(Arc::new(DownStore)).build();
    h.pipeline.start();

    h.run_one(resume("u1", "Rust developer")).await;
    h.run_one(InboundEvent::text("u1", "am I a fit?")).await;

    assert_eq!(
        h.messenger.delivered_to("u1"),
        vec![messages::TRY_LATER, messages::TRY_LATER]
    );
    assert!(h.engine.questions().is_empty());

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn shutdown_drains_queued_tasks() {
    let h = HarnessBuilder::new().config(|c| c.worker_count = 1).build();

    for i in 0..5 {
        h.send(InboundEvent::text(format!("u{i}"), "question")).await;
    }
    h.pipeline.start();
    h.pipeline.start();
    timeout(TEST_TIMEOUT, h.pipeline.shutdown())
        .await
        .expect("shutdown hung");

    assert_eq!(h.pipeline.snapshot().finished(), 5);
    assert_eq!(h.pipeline.queue_len(), 0);
    assert_eq!(
        h.send(InboundEvent::text("late", "question")).await,
        DispatchOutcome::Rejected(Rejection::ShuttingDown)
    );
}
