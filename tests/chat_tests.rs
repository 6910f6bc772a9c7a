//! External tests for the chat widget: submission rules, the single-flight
//! busy flag, and the fixed fallback turns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::rstest;
use tokio::sync::Notify;

use traffic_portfolio::chat::{CONNECTION_APOLOGY, EMPTY_REPLY_FALLBACK, GREETING};
use traffic_portfolio::{ChatWidget, GenerateError, Generator, ReplySource, Speaker, SubmitOutcome, Turn};

// -- Stub generators -----------------------------------------------------------

/// Replies with a canned result and records every prompt it sees.
struct Scripted {
    reply: Result<Option<&'static str>, fn() -> GenerateError>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn ok(text: &'static str) -> Self {
        Self { reply: Ok(Some(text)), prompts: Mutex::new(Vec::new()) }
    }

    fn none() -> Self {
        Self { reply: Ok(None), prompts: Mutex::new(Vec::new()) }
    }

    fn failing(err: fn() -> GenerateError) -> Self {
        Self { reply: Err(err), prompts: Mutex::new(Vec::new()) }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Generator for Scripted {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.map(str::to_string)),
            Err(make) => Err(make()),
        }
    }
}

/// Blocks until released, so a request can be held in flight.
#[derive(Default)]
struct Gated {
    calls: AtomicUsize,
    release: Notify,
}

impl Generator for Gated {
    async fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(Some("released".into()))
    }
}

struct Panics;

impl Generator for Panics {
    async fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerateError> {
        panic!("generator blew up");
    }
}

fn connect_err() -> GenerateError {
    GenerateError::Connect { url: "https://example.invalid".into(), detail: "dns".into() }
}

fn http_err() -> GenerateError {
    GenerateError::Http { status: 403, message: "PERMISSION_DENIED: API key not valid".into() }
}

fn json_err() -> GenerateError {
    GenerateError::Json { field: "candidates".into(), detail: "eof".into() }
}

async fn wait_until_busy<G>(chat: &ChatWidget<G>) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !chat.is_busy() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("widget never became busy");
}

// -- Initial state ----------------------------------------------------------------

#[test]
fn test_initial_transcript_is_greeting() {
    let chat = ChatWidget::new(Scripted::none());
    let turns = chat.transcript();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, Speaker::Assistant);
    assert_eq!(turns[0].text, GREETING);
    assert!(!chat.is_busy());
}

// -- Rejected input -----------------------------------------------------------------

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\t  \r\n")]
fn test_blank_message_is_ignored(#[case] text: &str) {
    let chat = ChatWidget::new(Scripted::ok("unused"));
    let outcome = tokio_test::block_on(chat.submit(text));
    assert_eq!(outcome, SubmitOutcome::Empty);
    assert_eq!(chat.len(), 1);
    assert_eq!(chat.generator().calls(), 0);
}

#[tokio::test]
async fn test_submit_while_busy_is_noop() {
    let chat = ChatWidget::new(Arc::new(Gated::default()));
    let first = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.submit("first question").await })
    };
    wait_until_busy(&chat).await;

    let len_before = chat.len();
    assert_eq!(chat.submit("second question").await, SubmitOutcome::Busy);
    assert_eq!(chat.len(), len_before);
    assert_eq!(chat.generator().calls.load(Ordering::SeqCst), 1);

    chat.generator().release.notify_one();
    let outcome = first.await.expect("first submit task");
    assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
    assert!(!chat.is_busy());
    assert_eq!(chat.len(), 3);
}

// -- Scenarios ----------------------------------------------------------------------

#[tokio::test]
async fn test_phd_topic_scenario() {
    let chat = ChatWidget::new(Scripted::ok("Mixed traffic behavior and ML."));
    let outcome = chat.submit("What is your PhD topic?").await;

    assert_eq!(
        outcome,
        SubmitOutcome::Replied {
            reply: "Mixed traffic behavior and ML.".into(),
            source: ReplySource::Generated,
        }
    );
    let turns = chat.transcript();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1], Turn::user("What is your PhD topic?"));
    assert_eq!(turns[2], Turn::assistant("Mixed traffic behavior and ML."));
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_prompt_wraps_question_in_persona() {
    let chat = ChatWidget::new(Scripted::ok("ok"));
    chat.submit("  Where do you teach?  ").await;
    let prompts = chat.generator().prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("IIT Kharagpur"));
    assert!(prompts[0].ends_with("QUESTION:\nWhere do you teach?"));
}

#[rstest]
#[case::connect(connect_err as fn() -> GenerateError)]
#[case::http(http_err as fn() -> GenerateError)]
#[case::json(json_err as fn() -> GenerateError)]
fn test_failure_becomes_apology(#[case] err: fn() -> GenerateError) {
    let chat = ChatWidget::new(Scripted::failing(err));
    let outcome = tokio_test::block_on(chat.submit("Tell me about TUTEM"));

    assert_eq!(
        outcome,
        SubmitOutcome::Replied {
            reply: CONNECTION_APOLOGY.into(),
            source: ReplySource::ConnectionFallback,
        }
    );
    let turns = chat.transcript();
    assert_eq!(turns.len(), 3);
    // the optimistic user turn is kept after a failed send
    assert_eq!(turns[1], Turn::user("Tell me about TUTEM"));
    assert_eq!(turns[2].text, CONNECTION_APOLOGY);
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn test_empty_reply_uses_fallback() {
    for generator in [Scripted::ok(""), Scripted::none()] {
        let chat = ChatWidget::new(generator);
        let outcome = chat.submit("anything").await;
        assert_eq!(
            outcome,
            SubmitOutcome::Replied {
                reply: EMPTY_REPLY_FALLBACK.into(),
                source: ReplySource::EmptyFallback,
            }
        );
        assert_eq!(chat.transcript()[2].text, EMPTY_REPLY_FALLBACK);
        assert_ne!(chat.transcript()[2].text, "");
    }
}

#[tokio::test]
async fn test_blank_but_nonempty_reply_is_shown() {
    let chat = ChatWidget::new(Scripted::ok("   "));
    let outcome = chat.submit("anything").await;
    assert_eq!(
        outcome,
        SubmitOutcome::Replied { reply: "   ".into(), source: ReplySource::Generated }
    );
    assert_eq!(chat.transcript()[2], Turn::assistant("   "));
}

#[tokio::test]
async fn test_repeated_failures_are_identical() {
    let chat = ChatWidget::new(Scripted::failing(connect_err));
    for _ in 0..3 {
        chat.submit("same question").await;
    }
    let turns = chat.transcript();
    assert_eq!(turns.len(), 7);
    let replies: Vec<&str> = turns
        .iter()
        .skip(1)
        .filter(|t| t.speaker == Speaker::Assistant)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(replies, vec![CONNECTION_APOLOGY; 3]);
    assert_eq!(chat.generator().calls(), 3);
}

#[tokio::test]
async fn test_turns_alternate_after_several_questions() {
    let chat = ChatWidget::new(Scripted::ok("answer"));
    for q in ["one", "two", "three"] {
        chat.submit(q).await;
    }
    let speakers: Vec<Speaker> = chat.transcript().iter().map(|t| t.speaker).collect();
    for (i, s) in speakers.iter().enumerate() {
        let expected = if i % 2 == 0 { Speaker::Assistant } else { Speaker::User };
        assert_eq!(*s, expected, "turn {i}");
    }
}

// -- Busy flag on abnormal exits ---------------------------------------------------------

#[tokio::test]
async fn test_busy_cleared_when_generator_panics() {
    let chat = ChatWidget::new(Panics);
    let task = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.submit("boom").await })
    };
    assert!(task.await.is_err());
    assert!(!chat.is_busy());
    assert_eq!(chat.len(), 2);
}

#[tokio::test]
async fn test_busy_cleared_when_submission_dropped() {
    let chat = ChatWidget::new(Arc::new(Gated::default()));
    let timed_out = tokio::time::timeout(Duration::from_millis(20), chat.submit("slow")).await;
    assert!(timed_out.is_err());
    assert!(!chat.is_busy());
    // ready for another attempt
    chat.generator().release.notify_one();
    assert!(matches!(chat.submit("again").await, SubmitOutcome::Replied { .. }));
}
