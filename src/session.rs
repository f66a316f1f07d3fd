//! Conversation session: the one stateful piece of the pipeline. A session
//! owns its history exclusively and mediates every outbound message; there
//! is no ambient module-level session slot.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::gemini::ChatModel;

/// Soft memory bound on the in-memory transcript. Turns dropped here are
/// gone: they are no longer sent to the model either.
pub const HISTORY_CAP: usize = 50;

/// Synthetic assistant opener, so a displayed transcript never starts empty.
pub const GREETING: &str = "Hey! Ask me anything, I'm all ears 👍";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// One chat session: fixed persona, bounded ordered history, model handle.
/// Created on first interaction and dropped at context end; there is no
/// terminal state and no persistence across sessions.
pub struct ChatSession<M: ChatModel> {
    id: Uuid,
    persona: String,
    history: Vec<ConversationTurn>,
    model: M,
}

impl<M: ChatModel> ChatSession<M> {
    /// Start a session with a composed persona instruction. The history is
    /// seeded with one assistant greeting before any user input.
    pub fn start(persona: String, model: M) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "session started");
        let mut session = Self {
            id,
            persona,
            history: Vec::new(),
            model,
        };
        session.push(Role::Assistant, GREETING);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Send free text straight through to the model.
    ///
    /// The user turn is appended before the call and stays in history even
    /// when the call fails; an assistant turn is appended only on success.
    /// That keeps the transcript ordering intact for a retry.
    pub async fn send_user_text(&mut self, text: &str) -> Result<String> {
        self.push(Role::User, text);
        self.exchange(text).await
    }

    /// Send a retrieval-augmented instruction payload.
    ///
    /// What the model receives (`instruction`) and what the transcript
    /// records as the user's turn (`displayed_question`, the preset button
    /// label) are deliberately different; conflating them would dump the
    /// instruction block into the visible transcript.
    pub async fn send_system_prompt(
        &mut self,
        displayed_question: &str,
        instruction: &str,
    ) -> Result<String> {
        self.push(Role::User, displayed_question);
        self.exchange(instruction).await
    }

    /// Record a user/assistant pair without touching the model. Used when a
    /// lookup degrades to the fixed apology reply.
    pub fn record_exchange(&mut self, user_text: &str, assistant_text: &str) {
        self.push(Role::User, user_text);
        self.push(Role::Assistant, assistant_text);
    }

    /// Forward `wire_message` to the model with the persona and the full
    /// prior history (everything except the user turn just appended, which
    /// the model receives as the new message).
    async fn exchange(&mut self, wire_message: &str) -> Result<String> {
        let prior = &self.history[..self.history.len() - 1];
        let result = self.model.complete(&self.persona, prior, wire_message).await;

        match result {
            Ok(reply) => {
                self.push(Role::Assistant, &reply);
                tracing::debug!(session = %self.id, turns = self.history.len(), "exchange complete");
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "model call failed");
                Err(e)
            }
        }
    }

    fn push(&mut self, role: Role, content: &str) {
        self.history.push(ConversationTurn {
            role,
            content: content.to_string(),
        });
        // Truncate from the front after every append, oldest turns first.
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AikenError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records what the session put on the wire and plays back a script.
    struct ScriptedModel {
        script: Mutex<VecDeque<std::result::Result<String, String>>>,
        calls: Mutex<Vec<(usize, String)>>, // (history len sent, wire message)
    }

    impl ScriptedModel {
        fn new(script: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always_ok() -> Self {
            Self::new(vec![])
        }
    }

    impl ChatModel for &ScriptedModel {
        async fn complete(
            &self,
            _persona: &str,
            history: &[ConversationTurn],
            new_message: &str,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((history.len(), new_message.to_string()));
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(msg)) => Err(AikenError::ModelUnavailable(msg)),
                None => Ok("ok".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn session_starts_with_greeting() {
        let model = ScriptedModel::always_ok();
        let session = ChatSession::start("persona".to_string(), &model);

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role, Role::Assistant);
        assert_eq!(session.history()[0].content, GREETING);
    }

    #[tokio::test]
    async fn send_user_text_appends_both_turns() {
        let model = ScriptedModel::new(vec![Ok("hi there".to_string())]);
        let mut session = ChatSession::start("persona".to_string(), &model);

        let reply = session.send_user_text("hello").await.unwrap();
        assert_eq!(reply, "hi there");

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::User);
        assert_eq!(history[1].content, "hello");
        assert_eq!(history[2].role, Role::Assistant);
        assert_eq!(history[2].content, "hi there");
    }

    #[tokio::test]
    async fn model_failure_keeps_user_turn_only() {
        let model = ScriptedModel::new(vec![Err("quota exceeded".to_string())]);
        let mut session = ChatSession::start("persona".to_string(), &model);

        let err = session.send_user_text("hello").await.unwrap_err();
        assert!(matches!(err, AikenError::ModelUnavailable(_)));

        let history = session.history();
        assert_eq!(history.len(), 2); // greeting + user turn, no assistant turn
        assert_eq!(history[1].role, Role::User);
        assert_eq!(history[1].content, "hello");
    }

    #[tokio::test]
    async fn system_prompt_displays_question_but_sends_instruction() {
        let model = ScriptedModel::new(vec![Ok("narrated reply".to_string())]);
        let mut session = ChatSession::start("persona".to_string(), &model);

        session
            .send_system_prompt("Button label?", "SECRET INSTRUCTION PAYLOAD")
            .await
            .unwrap();

        // The transcript shows the button label, never the payload.
        let history = session.history();
        assert_eq!(history[1].content, "Button label?");
        assert!(history.iter().all(|t| !t.content.contains("SECRET")));

        // The wire saw the payload, with the prior history minus the
        // just-appended displayed turn.
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 1); // greeting only
        assert_eq!(calls[0].1, "SECRET INSTRUCTION PAYLOAD");
    }

    #[tokio::test]
    async fn history_never_exceeds_cap_and_drops_oldest() {
        let model = ScriptedModel::always_ok();
        let mut session = ChatSession::start("persona".to_string(), &model);

        for i in 0..40 {
            session
                .send_user_text(&format!("message {}", i))
                .await
                .unwrap();
            assert!(session.history().len() <= HISTORY_CAP);
        }

        let history = session.history();
        assert_eq!(history.len(), HISTORY_CAP);
        // Greeting and the earliest exchanges fell off the front.
        assert_ne!(history[0].content, GREETING);
        assert_eq!(history.last().unwrap().content, "ok");
        assert!(history.iter().any(|t| t.content == "message 39"));
        assert!(history.iter().all(|t| t.content != "message 0"));
    }

    #[tokio::test]
    async fn record_exchange_skips_the_model() {
        let model = ScriptedModel::always_ok();
        let mut session = ChatSession::start("persona".to_string(), &model);

        session.record_exchange("a preset question", "the apology");

        assert_eq!(session.history().len(), 3);
        assert!(model.calls.lock().unwrap().is_empty());
    }
}
