//! Chat session: ordered question/answer transcript.
//!
//! The user's turn is appended before any await, so the transcript always
//! reflects what was submitted. Requests are serialized: a second `ask` queues
//! behind the one in flight, so answers land in submission order.

use chrono::{DateTime, Utc};
use datalens_core::ApiClient;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

pub struct ChatSession {
    api: ApiClient,
    fallback: String,
    transcript: watch::Sender<Vec<ChatTurn>>,
    typing: watch::Sender<Option<Uuid>>,
    in_flight: Mutex<()>,
}

impl ChatSession {
    pub fn new(api: ApiClient, fallback: impl Into<String>) -> Self {
        Self {
            api,
            fallback: fallback.into(),
            transcript: watch::channel(Vec::new()).0,
            typing: watch::channel(None).0,
            in_flight: Mutex::new(()),
        }
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.transcript.borrow().clone()
    }

    /// Id of the typing indicator currently shown, if any.
    pub fn typing_indicator(&self) -> Option<Uuid> {
        *self.typing.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatTurn>> {
        self.transcript.subscribe()
    }

    fn append(&self, speaker: Speaker, text: String) {
        self.transcript.send_modify(|turns| {
            turns.push(ChatTurn {
                speaker,
                text,
                at: Utc::now(),
            })
        });
    }

    /// Submit a question and append the answer (or the fallback). Returns the
    /// assistant text, or `None` for a blank question.
    pub async fn ask(&self, question: &str) -> Option<String> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        self.append(Speaker::User, question.to_string());

        let _turn = self.in_flight.lock().await;
        let indicator = Uuid::new_v4();
        self.typing.send_replace(Some(indicator));

        let answer = match self.api.chat(question).await {
            Ok(reply) => reply.answer.unwrap_or_else(|| self.fallback.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                self.fallback.clone()
            }
        };

        self.typing
            .send_if_modified(|t| *t == Some(indicator) && t.take().is_some());
        self.append(Speaker::Assistant, answer.clone());
        Some(answer)
    }

    /// Forget the transcript (session reset).
    pub fn clear(&self) {
        self.transcript.send_replace(Vec::new());
        self.typing.send_replace(None);
    }
}
