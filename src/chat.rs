//! Research-assistant chat widget.
//!
//! Holds the transcript and forwards each visitor question, wrapped in the
//! persona prompt, to a [`Generator`]. At most one question is in flight per
//! widget: a second `submit` while busy is rejected without touching the
//! transcript. Generator failures never escape; they become a fixed apology
//! turn and a log line.
//!
//! Views subscribe to [`ChatEvent`]s and scroll to the newest turn whenever
//! one arrives.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error};
use uuid::Uuid;

use crate::persona;
use crate::providers::Generator;

pub const GREETING: &str = "Hello! I'm Sai's AI research assistant. Ask me about my PhD work, publications, or consultancy projects.";

/// Assistant turn used when the generator answers with no text.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm sorry, I couldn't process that request.";

/// Assistant turn used when the generator call fails for any reason.
pub const CONNECTION_APOLOGY: &str = "I'm sorry, I'm having trouble connecting to the research database right now. Please try again later.";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Where an assistant reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Generated,
    EmptyFallback,
    ConnectionFallback,
}

/// Result of one [`ChatWidget::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Nothing left after trimming; nothing was sent.
    Empty,
    /// Another question is still in flight; nothing was sent.
    Busy,
    Replied { reply: String, source: ReplySource },
}

/// Transcript and busy-state changes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Appended { index: usize, turn: Turn },
    Busy(bool),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub session: String,
    pub busy: bool,
    pub turns: Vec<Turn>,
}

struct ChatState {
    turns: Vec<Turn>,
    busy: bool,
}

struct Inner<G> {
    session: Uuid,
    state: Mutex<ChatState>,
    events: broadcast::Sender<ChatEvent>,
    generator: G,
}

impl<G> Inner<G> {
    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Clears the busy flag on every exit path of a submission, including a
/// dropped future.
struct BusyGuard<'a, G> {
    inner: &'a Inner<G>,
}

impl<G> Drop for BusyGuard<'_, G> {
    fn drop(&mut self) {
        self.inner.state().busy = false;
        self.inner.emit(ChatEvent::Busy(false));
    }
}

/// Cloneable handle; clones share one transcript and one busy flag.
pub struct ChatWidget<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for ChatWidget<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: Generator> ChatWidget<G> {
    /// New widget whose transcript holds only the greeting.
    pub fn new(generator: G) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                session: Uuid::new_v4(),
                state: Mutex::new(ChatState {
                    turns: vec![Turn::assistant(GREETING)],
                    busy: false,
                }),
                events,
                generator,
            }),
        }
    }

    /// Send one question and wait for its reply.
    ///
    /// The user turn is appended before the generator is called and stays
    /// even when the call fails. Exactly one assistant turn follows it.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let question = text.trim();
        if question.is_empty() {
            return SubmitOutcome::Empty;
        }
        let Some(_busy) = self.begin(question) else {
            debug!(session = %self.inner.session, "submission rejected, request in flight");
            return SubmitOutcome::Busy;
        };

        let prompt = persona::build_prompt(question);
        debug!(
            session = %self.inner.session,
            prompt_len = prompt.len(),
            "asking generator"
        );

        let (reply, source) = match self.inner.generator.generate(&prompt).await {
            Ok(Some(text)) if !text.is_empty() => (text, ReplySource::Generated),
            Ok(_) => (EMPTY_REPLY_FALLBACK.to_string(), ReplySource::EmptyFallback),
            Err(e) => {
                error!(session = %self.inner.session, error = %e, "text generation failed");
                (CONNECTION_APOLOGY.to_string(), ReplySource::ConnectionFallback)
            }
        };

        self.append(Turn::assistant(reply.clone()));
        SubmitOutcome::Replied { reply, source }
    }

    fn begin(&self, question: &str) -> Option<BusyGuard<'_, G>> {
        let turn = Turn::user(question);
        let index = {
            let mut state = self.inner.state();
            if state.busy {
                return None;
            }
            state.busy = true;
            state.turns.push(turn.clone());
            state.turns.len() - 1
        };
        self.inner.emit(ChatEvent::Appended { index, turn });
        self.inner.emit(ChatEvent::Busy(true));
        Some(BusyGuard { inner: &self.inner })
    }
}

impl<G> ChatWidget<G> {
    fn append(&self, turn: Turn) {
        let index = {
            let mut state = self.inner.state();
            state.turns.push(turn.clone());
            state.turns.len() - 1
        };
        self.inner.emit(ChatEvent::Appended { index, turn });
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state().busy
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.inner.state().turns.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state().turns.len()
    }

    /// Never true: the greeting is always present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.inner.state();
        ChatSnapshot {
            session: self.inner.session.to_string(),
            busy: state.busy,
            turns: state.turns.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    pub fn generator(&self) -> &G {
        &self.inner.generator
    }
}
