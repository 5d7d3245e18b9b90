//! Scenario tests driving a session through the full task lifecycle

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kanal::AsyncReceiver;
use parrot_config::Config;
use parrot_core::error::StoreError;
use parrot_core::store::{MemoryStore, Store, StoreChange};
use parrot_core::trigger::TriggerPhase;
use parrot_generator::{ContentGenerator, GenerateError, ProviderMetadata};
use parrot_types::{
    AppEvent, ClientMessage, PageMessage, PracticeContent, QuizContent, QuizMode, QuizOutcome,
    ResultFilter, SampleSource, TaskEvent, TaskId, TestContent,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::{Instant, timeout};

use crate::events::Session;
use crate::state::AppState;

struct FakeGenerator {
    fail: bool,
    modes: Mutex<Vec<QuizMode>>,
}

impl FakeGenerator {
    fn succeeding() -> Self {
        Self {
            fail: false,
            modes: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            modes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn select_word(&self, context: &str) -> Result<String, GenerateError> {
        if self.fail {
            return Err(GenerateError::ApiError("upstream unavailable".into()));
        }
        context
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or(GenerateError::EmptyContext)
    }

    async fn generate(
        &self,
        word: &str,
        _target_language: &str,
        mode: QuizMode,
    ) -> Result<QuizContent, GenerateError> {
        self.modes.lock().unwrap().push(mode);
        Ok(match mode {
            QuizMode::Test => QuizContent::Test(TestContent {
                option1: format!("{word}-es"),
                option2: "gato".into(),
                option3: "mesa".into(),
                option4: "libro".into(),
                correct: format!("{word}-es"),
                option1_pronunciation: None,
                option2_pronunciation: None,
                option3_pronunciation: None,
                option4_pronunciation: None,
            }),
            QuizMode::Practice => QuizContent::Practice(PracticeContent {
                original_word: word.into(),
                translated_word: format!("{word}-es"),
                translated_word_pronunciation: String::new(),
                original_word_def: "a test word".into(),
                example_original: format!("I see the {word}."),
                example_translated: format!("Veo el {word}-es."),
                example_translated_pronunciation: String::new(),
            }),
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "fake".into(),
            model: "scripted".into(),
            requires_api_key: false,
        }
    }
}

/// Reads find nothing, every write fails
struct BrokenStore {
    changes: broadcast::Sender<StoreChange>,
}

impl BrokenStore {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(8);
        Self { changes }
    }
}

#[async_trait]
impl Store for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

struct Harness {
    session: Session,
    state: Arc<AppState>,
    events: AsyncReceiver<AppEvent>,
    page: AsyncReceiver<ClientMessage>,
    generator: Arc<FakeGenerator>,
}

impl Harness {
    async fn new(generator: FakeGenerator, configure: impl FnOnce(&mut Config)) -> Self {
        Self::with_store(generator, Arc::new(MemoryStore::new()), configure).await
    }

    async fn with_store(
        generator: FakeGenerator,
        store: Arc<dyn Store>,
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let mut config = Config::default();
        config.counter.word_threshold = 10;
        configure(&mut config);

        let generator = Arc::new(generator);
        let state = Arc::new(AppState::with_parts(config, store, generator.clone()));
        let (event_tx, events) = kanal::unbounded_async();
        let (page_tx, page) = kanal::unbounded_async();
        let session = Session::new(state.clone(), event_tx, page_tx)
            .await
            .unwrap();

        let mut harness = Self {
            session,
            state,
            events,
            page,
            generator,
        };
        harness
            .page_message(PageMessage::Attached {
                url: "https://example.org/article".into(),
            })
            .await;
        harness
    }

    async fn page_message(&mut self, message: PageMessage) {
        self.session.handle(AppEvent::Page(message)).await.unwrap();
    }

    /// Report visible text and run one poll tick
    async fn show(&mut self, text: &str) {
        self.page_message(PageMessage::VisibleText { text: text.into() })
            .await;
        self.session
            .handle(AppEvent::Sample(SampleSource::Poll))
            .await
            .unwrap();
    }

    /// Handle the next event reported by a spawned task job
    async fn pump(&mut self) -> TaskEvent {
        let event = timeout(Duration::from_secs(600), self.events.recv())
            .await
            .expect("no task event")
            .unwrap();
        let AppEvent::Task(task_event) = event.clone() else {
            panic!("unexpected event: {event:?}");
        };
        self.session.handle(event).await.unwrap();
        task_event
    }

    fn sent(&self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        while let Ok(Some(message)) = self.page.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn presented_task(&self) -> (TaskId, QuizMode) {
        self.sent()
            .into_iter()
            .find_map(|message| match message {
                ClientMessage::InitQuiz { task_id, mode, .. } => Some((task_id, mode)),
                _ => None,
            })
            .expect("quiz was not presented")
    }

    fn assert_counting(&self) {
        let state = self.session.accumulator().state();
        assert!(state.is_active);
        assert!(!state.has_pending_task);
        assert!(self.session.trigger().is_idle());
    }
}

/// `n` distinct alphabetic words sharing `prefix`
fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{}", char::from(b'a' + i as u8)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test(start_paused = true)]
async fn threshold_crossing_presents_quiz_and_records_answer() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    let init = h.sent();
    assert!(matches!(
        init[0],
        ClientMessage::InitWordCounter { threshold: 10, .. }
    ));
    assert!(init.contains(&ClientMessage::RequestVisibleText));

    h.show(&words("casa", 6)).await;
    assert_eq!(h.session.accumulator().state().cumulative_word_count, 6);
    assert!(!h.session.accumulator().state().has_pending_task);

    h.show(&format!("{} {}", words("casa", 6), words("perro", 6)))
        .await;
    let state = h.session.accumulator().state();
    assert!(state.has_pending_task);
    assert_eq!(state.last_trigger_count, 12);

    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    let (task_id, mode) = h.presented_task();
    assert_eq!(mode, QuizMode::Practice);

    h.page_message(PageMessage::QuizComplete {
        task_id,
        correct: true,
    })
    .await;
    assert!(matches!(h.pump().await, TaskEvent::Answered { .. }));

    let stats = h.state.stats.read_aggregate().await.unwrap();
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.correct_answers, 1);
    assert_eq!(stats.results[0].word, "casaa");
    assert_eq!(stats.results[0].translated_word.as_deref(), Some("casaa-es"));
    assert_eq!(stats.results[0].target_language, "Spanish");

    h.assert_counting();
    assert!(h.sent().contains(&ClientMessage::RequestVisibleText));
}

#[tokio::test(start_paused = true)]
async fn repeated_generation_failures_back_off_and_consume_progress() {
    let mut h = Harness::new(FakeGenerator::failing(), |_| {}).await;

    let mut text = String::new();
    for (round, prefix) in ["alpha", "beta", "gamma"].into_iter().enumerate() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&words(prefix, 12));
        h.show(&text).await;
        assert!(h.session.accumulator().state().has_pending_task);

        let started = Instant::now();
        assert!(matches!(h.pump().await, TaskEvent::GenerationFailed { .. }));
        assert!(matches!(
            h.session.trigger().phase(),
            TriggerPhase::CoolingDown(_)
        ));
        // Still pending while cooling down
        assert!(h.session.accumulator().state().has_pending_task);

        assert!(matches!(h.pump().await, TaskEvent::BackoffElapsed { .. }));
        assert!(started.elapsed() >= Duration::from_secs(5));

        h.assert_counting();
        assert_eq!(
            h.session.accumulator().consecutive_failures(),
            round as u32 + 1
        );
    }

    let state = h.session.accumulator().state();
    assert_eq!(state.last_trigger_count, state.cumulative_word_count);
    assert_eq!(h.session.trigger().error_count(), 3);
    assert!(h.generator.modes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unanswered_presentation_times_out() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    h.show(&words("libro", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));

    let started = Instant::now();
    assert!(matches!(
        h.pump().await,
        TaskEvent::PresentationTimedOut { .. }
    ));
    assert!(started.elapsed() >= Duration::from_secs(120));

    h.assert_counting();
    assert_eq!(h.session.accumulator().consecutive_failures(), 1);
    let stats = h.state.stats.read_aggregate().await.unwrap();
    assert_eq!(stats.total_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn closed_popup_ends_presentation_early() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    h.show(&words("mesa", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    let (task_id, _) = h.presented_task();

    let started = Instant::now();
    h.page_message(PageMessage::PopupClosed { task_id }).await;
    assert!(matches!(
        h.pump().await,
        TaskEvent::PresentationLost { .. }
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
    h.assert_counting();
}

#[tokio::test(start_paused = true)]
async fn navigation_aborts_task_and_forgets_sample() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    h.show(&words("silla", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    let (task_id, _) = h.presented_task();

    h.page_message(PageMessage::Navigated {
        url: "https://example.org/next".into(),
    })
    .await;
    h.assert_counting();
    assert!(h.session.accumulator().state().previous_sample.is_empty());
    assert_eq!(h.session.accumulator().consecutive_failures(), 0);

    // Late answer for the aborted task goes nowhere
    h.page_message(PageMessage::QuizComplete {
        task_id,
        correct: true,
    })
    .await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(h.events.is_empty());
    assert_eq!(h.state.stats.read_aggregate().await.unwrap().total_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn manual_test_mode_overrides_selector() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |config| {
        config.quiz.manual_test_mode = true;
    })
    .await;

    h.show(&words("ventana", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));

    assert_eq!(*h.generator.modes.lock().unwrap(), [QuizMode::Test]);
    assert_eq!(h.presented_task().1, QuizMode::Test);
}

#[tokio::test(start_paused = true)]
async fn config_updates_apply_at_runtime() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    h.page_message(PageMessage::ConfigUpdate {
        field: "autoLaunchEnabled".into(),
        value: "false".into(),
    })
    .await;
    h.show(&words("nube", 8)).await;
    assert_eq!(h.session.accumulator().state().cumulative_word_count, 0);

    h.page_message(PageMessage::ConfigUpdate {
        field: "autoLaunchEnabled".into(),
        value: "true".into(),
    })
    .await;
    h.page_message(PageMessage::ConfigUpdate {
        field: "wordThreshold".into(),
        value: "20".into(),
    })
    .await;
    h.show(&words("nube", 12)).await;
    assert_eq!(h.session.accumulator().state().cumulative_word_count, 12);
    assert_eq!(h.session.accumulator().threshold(), 20);
    assert!(!h.session.accumulator().state().has_pending_task);

    // Rejected values leave the config untouched
    h.page_message(PageMessage::ConfigUpdate {
        field: "selectedLanguage".into(),
        value: "Klingon".into(),
    })
    .await;
    assert_eq!(h.state.config.read().await.quiz.selected_language, "Spanish");
}

fn outcome(word: &str, language: &str, correct: bool, minute: u32) -> QuizOutcome {
    QuizOutcome {
        word: word.into(),
        target_language: language.into(),
        correct,
        translated_word: None,
        timestamp: format!("2024-05-01T10:{minute:02}:00+00:00"),
    }
}

#[tokio::test(start_paused = true)]
async fn failed_save_still_resumes_counting() {
    let mut h = Harness::with_store(
        FakeGenerator::succeeding(),
        Arc::new(BrokenStore::new()),
        |_| {},
    )
    .await;

    h.show(&words("puerta", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    let (task_id, _) = h.presented_task();

    h.page_message(PageMessage::QuizComplete {
        task_id,
        correct: true,
    })
    .await;
    assert!(matches!(h.pump().await, TaskEvent::Answered { .. }));

    h.assert_counting();
    assert_eq!(h.session.accumulator().consecutive_failures(), 0);

    // Counting carries on from where it was
    h.show(&format!("{} {}", words("puerta", 12), words("techo", 4)))
        .await;
    assert_eq!(h.session.accumulator().state().cumulative_word_count, 16);
}

#[tokio::test(start_paused = true)]
async fn navigation_abort_keeps_failure_streak() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;

    h.show(&words("lapiz", 12)).await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    assert!(matches!(
        h.pump().await,
        TaskEvent::PresentationTimedOut { .. }
    ));
    assert_eq!(h.session.accumulator().consecutive_failures(), 1);

    h.show(&format!("{} {}", words("lapiz", 12), words("goma", 12)))
        .await;
    assert!(matches!(h.pump().await, TaskEvent::Generated { .. }));
    h.page_message(PageMessage::Navigated {
        url: "https://example.org/other".into(),
    })
    .await;

    h.assert_counting();
    assert_eq!(h.session.accumulator().consecutive_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn history_request_returns_filtered_results() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;
    for (minute, (word, language, correct)) in [
        ("casa", "Spanish", true),
        ("maison", "French", false),
        ("perro", "Spanish", false),
        ("chat", "French", true),
    ]
    .into_iter()
    .enumerate()
    {
        h.state
            .stats
            .record(outcome(word, language, correct, minute as u32))
            .await
            .unwrap();
    }
    h.sent();

    h.page_message(PageMessage::RequestHistory {
        result: ResultFilter::All,
        language: None,
    })
    .await;
    let sent = h.sent();
    let [ClientMessage::History { results, languages }] = sent.as_slice() else {
        panic!("expected a single history message");
    };
    let words: Vec<_> = results.iter().map(|r| r.word.as_str()).collect();
    assert_eq!(words, ["chat", "perro", "maison", "casa"]);
    assert_eq!(languages, &["Spanish", "French"]);

    h.page_message(PageMessage::RequestHistory {
        result: ResultFilter::Incorrect,
        language: Some("Spanish".into()),
    })
    .await;
    let sent = h.sent();
    let [ClientMessage::History { results, languages }] = sent.as_slice() else {
        panic!("expected a single history message");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].word, "perro");
    assert_eq!(languages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn clear_stats_empties_history() {
    let mut h = Harness::new(FakeGenerator::succeeding(), |_| {}).await;
    h.state
        .stats
        .record(outcome("arbol", "Spanish", true, 0))
        .await
        .unwrap();
    let mut changes = h.state.stats.subscribe();

    h.page_message(PageMessage::ClearStats).await;
    assert!(changes.recv().await.is_ok());

    let stats = h.state.stats.read_aggregate().await.unwrap();
    assert_eq!(stats.total_attempts, 0);
    assert!(stats.results.is_empty());

    h.sent();
    h.page_message(PageMessage::RequestHistory {
        result: ResultFilter::All,
        language: None,
    })
    .await;
    assert_eq!(
        h.sent(),
        [ClientMessage::History {
            results: Vec::new(),
            languages: Vec::new(),
        }]
    );
}
