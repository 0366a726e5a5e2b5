use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use log::warn;
use tokio::sync::Mutex;

use crate::{
    db::models::{AnalysisResult, ChatMessage, Sender},
    device::{Haptics, Narrator},
    events::{CoreEvent, EventBus},
    inference::{ChatTurn, InferenceService, CHAT_FALLBACK_MESSAGE},
    language::Language,
    session::{SessionStore, CHAT_MESSAGES_KEY},
};

struct ConversationInner {
    messages: Mutex<Vec<ChatMessage>>,
    context: Mutex<Option<String>>,
    loading: Mutex<bool>,
    service: Arc<dyn InferenceService>,
    session: SessionStore,
    narrator: Arc<dyn Narrator>,
    haptics: Arc<dyn Haptics>,
    language: Arc<RwLock<Language>>,
    events: EventBus,
}

/// Append-only transcript of the follow-up conversation about the current
/// consultation. One reply can be in flight at a time; a send while the
/// previous one is pending is refused rather than queued.
#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<ConversationInner>,
}

impl ConversationController {
    pub fn new(
        service: Arc<dyn InferenceService>,
        session: SessionStore,
        narrator: Arc<dyn Narrator>,
        haptics: Arc<dyn Haptics>,
        language: Arc<RwLock<Language>>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ConversationInner {
                messages: Mutex::new(Vec::new()),
                context: Mutex::new(None),
                loading: Mutex::new(false),
                service,
                session,
                narrator,
                haptics,
                language,
                events,
            }),
        }
    }

    /// Reloads the transcript persisted by an earlier run, if any.
    pub async fn restore(&self) {
        if let Some(messages) = self
            .inner
            .session
            .get_json::<Vec<ChatMessage>>(CHAT_MESSAGES_KEY)
        {
            *self.inner.messages.lock().await = messages;
        }
    }

    /// Starts a fresh conversation for a completed analysis: the
    /// transcript opens with the explanation as the first assistant
    /// message, and later sends carry the diagnosis as hidden context.
    pub async fn seed_from_analysis(&self, analysis: &AnalysisResult) {
        *self.inner.context.lock().await = Some(context_line(analysis));

        let opening = ChatMessage::from_ai(&analysis.overall_explanation);
        let snapshot = {
            let mut messages = self.inner.messages.lock().await;
            messages.clear();
            messages.push(opening.clone());
            messages.clone()
        };
        self.persist(&snapshot);
        self.inner
            .events
            .emit(CoreEvent::MessageAppended { message: opening });
    }

    /// Re-derives the hidden context without touching the transcript.
    /// Used when a past consultation is reopened.
    pub async fn set_context(&self, analysis: &AnalysisResult) {
        *self.inner.context.lock().await = Some(context_line(analysis));
    }

    pub async fn clear(&self) {
        self.inner.messages.lock().await.clear();
        *self.inner.context.lock().await = None;
        *self.inner.loading.lock().await = false;
        self.inner.session.remove(CHAT_MESSAGES_KEY);
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.messages.lock().await.clone()
    }

    pub async fn is_loading(&self) -> bool {
        *self.inner.loading.lock().await
    }

    /// Sends a user message and appends the reply. A failed request still
    /// produces a reply message, carrying the stock apology, so the
    /// transcript never loses a turn.
    pub async fn send(&self, text: &str) -> Result<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            bail!("cannot send an empty message");
        }

        {
            let mut loading = self.inner.loading.lock().await;
            if *loading {
                bail!("a reply is already in flight");
            }
            *loading = true;
        }

        self.inner.haptics.pulse();

        // The history the model sees ends before this message; the
        // message itself rides separately as the prompt.
        let history: Vec<ChatTurn> = {
            let messages = self.inner.messages.lock().await;
            messages.iter().map(turn_for).collect()
        };
        let context = self.inner.context.lock().await.clone();

        self.append(ChatMessage::from_user(text)).await;

        let mut turns = Vec::with_capacity(history.len() + 1);
        if let Some(context) = context {
            turns.push(ChatTurn::user(context));
        }
        turns.extend(history);

        let language = *self.inner.language.read().unwrap();
        let reply_text = match self.inner.service.chat(&turns, text, language).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Chat request failed: {err}");
                CHAT_FALLBACK_MESSAGE.to_string()
            }
        };

        let reply = ChatMessage::from_ai(&reply_text);
        self.append(reply.clone()).await;
        *self.inner.loading.lock().await = false;

        self.inner
            .narrator
            .speak(&reply_text, language.speech_code());

        Ok(reply)
    }

    async fn append(&self, message: ChatMessage) {
        let snapshot = {
            let mut messages = self.inner.messages.lock().await;
            messages.push(message.clone());
            messages.clone()
        };
        self.persist(&snapshot);
        self.inner
            .events
            .emit(CoreEvent::MessageAppended { message });
    }

    fn persist(&self, messages: &Vec<ChatMessage>) {
        if let Err(err) = self.inner.session.put_json(CHAT_MESSAGES_KEY, messages) {
            warn!("Could not persist chat transcript: {err}");
        }
    }
}

fn turn_for(message: &ChatMessage) -> ChatTurn {
    match message.sender {
        Sender::User => ChatTurn::user(&message.text),
        Sender::Ai => ChatTurn::model(&message.text),
    }
}

fn context_line(analysis: &AnalysisResult) -> String {
    let diagnosis = analysis
        .primary_diagnosis()
        .map(|diagnosis| diagnosis.name.as_str())
        .unwrap_or("Unknown");
    let findings = analysis.finding_labels().join(", ");
    format!("[System Context: Patient diagnosis is {diagnosis}. Findings: {findings}.]")
}
