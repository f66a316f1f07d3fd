//! UI boundary adapter: translates abstract UI events into store lookups,
//! prompt composition and session sends, and translates every failure into
//! an inline render command. Nothing past this layer panics or crashes the
//! process over a bad lookup or a flaky model call.

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{Category, Database, GoalStatus, PresetQuestion};
use crate::gemini::ChatModel;
use crate::persona::{compose_persona, PersonaConfig};
use crate::prompt::{build_prompt, DATA_NOT_FOUND_APOLOGY};
use crate::session::{ChatSession, ConversationTurn, Role};
use crate::wbs::{assemble_plan, GoalFlag};

/// Events the presentation layer emits. The core never sees widgets, only
/// these.
#[derive(Debug, Clone)]
pub enum UiEvent {
    SelectCategory(String),
    SelectPreset(i64),
    SubmitFreeText(String),
    ToggleGoal { goal_key: String, completed: bool },
    /// Explicit plan request. The core deliberately does not keyword-sniff
    /// free text for this; when and how the plan is surfaced is the
    /// caller's policy.
    AssemblePlan(HashSet<GoalFlag>),
}

/// Render commands the presentation layer consumes.
#[derive(Debug, Clone)]
pub enum Render {
    ShowCategories(Vec<Category>),
    ShowPresets(Vec<PresetQuestion>),
    AppendTurn(ConversationTurn),
    ShowPlan(String),
    ShowError(String),
}

/// One user's app context: shared read-only store, exclusively owned chat
/// session, and the logged-in user id. Created on first interaction and
/// dropped at context end.
pub struct App<M: ChatModel> {
    db: Arc<Database>,
    session: ChatSession<M>,
    user_id: String,
}

impl<M: ChatModel> App<M> {
    pub fn new(db: Arc<Database>, persona: &PersonaConfig, model: M, user_id: &str) -> Self {
        let session = ChatSession::start(compose_persona(persona), model);
        Self {
            db,
            session,
            user_id: user_id.to_string(),
        }
    }

    pub fn session(&self) -> &ChatSession<M> {
        &self.session
    }

    /// First paint: the category tabs plus the transcript so far (which is
    /// never empty thanks to the seeded greeting).
    pub fn initial_render(&self) -> Vec<Render> {
        let mut out = match self.db.list_categories() {
            Ok(categories) => vec![Render::ShowCategories(categories)],
            Err(e) => vec![Render::ShowError(e.to_string())],
        };
        for turn in self.session.history() {
            out.push(Render::AppendTurn(turn.clone()));
        }
        out
    }

    pub async fn handle_event(&mut self, event: UiEvent) -> Vec<Render> {
        match event {
            UiEvent::SelectCategory(category_id) => {
                match self.db.list_preset_questions(&category_id) {
                    Ok(presets) => vec![Render::ShowPresets(presets)],
                    Err(e) => vec![Render::ShowError(e.to_string())],
                }
            }

            UiEvent::SelectPreset(knowledge_id) => self.handle_preset(knowledge_id).await,

            UiEvent::SubmitFreeText(text) => {
                let user_turn = ConversationTurn {
                    role: Role::User,
                    content: text.clone(),
                };
                match self.session.send_user_text(&text).await {
                    Ok(reply) => vec![
                        Render::AppendTurn(user_turn),
                        Render::AppendTurn(ConversationTurn {
                            role: Role::Assistant,
                            content: reply,
                        }),
                    ],
                    // The user turn stays visible; only the reply is missing.
                    Err(e) => vec![Render::AppendTurn(user_turn), Render::ShowError(e.to_string())],
                }
            }

            UiEvent::ToggleGoal { goal_key, completed } => {
                let status = if completed {
                    GoalStatus::Completed
                } else {
                    GoalStatus::NotStarted
                };
                match self.db.set_goal_status(&self.user_id, &goal_key, status) {
                    Ok(()) => Vec::new(),
                    Err(e) => vec![Render::ShowError(e.to_string())],
                }
            }

            UiEvent::AssemblePlan(goals) => vec![Render::ShowPlan(assemble_plan(&goals))],
        }
    }

    /// Preset path: record lookup, then either the retrieval-augmented send
    /// or the apology fallback. The transcript always shows the button
    /// label as the user's turn, never the instruction payload.
    async fn handle_preset(&mut self, knowledge_id: i64) -> Vec<Render> {
        let facts = match self.db.get_knowledge_facts(knowledge_id) {
            Ok(facts) => facts,
            Err(e) => return vec![Render::ShowError(e.to_string())],
        };
        let question = match self.db.get_preset_question(knowledge_id) {
            Ok(Some(q)) => q,
            Ok(None) => "(unknown preset)".to_string(),
            Err(e) => return vec![Render::ShowError(e.to_string())],
        };

        let user_turn = ConversationTurn {
            role: Role::User,
            content: question.clone(),
        };

        // Empty means "not found": apologize, skip the model for this turn.
        if facts.is_empty() {
            tracing::debug!(knowledge_id, "no facts for preset, degrading to apology");
            self.session.record_exchange(&question, DATA_NOT_FOUND_APOLOGY);
            return vec![
                Render::AppendTurn(user_turn),
                Render::AppendTurn(ConversationTurn {
                    role: Role::Assistant,
                    content: DATA_NOT_FOUND_APOLOGY.to_string(),
                }),
            ];
        }

        let title = facts[0].success_title.clone();
        let instruction = build_prompt(&question, &facts, &title);

        match self.session.send_system_prompt(&question, &instruction).await {
            Ok(reply) => vec![
                Render::AppendTurn(user_turn),
                Render::AppendTurn(ConversationTurn {
                    role: Role::Assistant,
                    content: reply,
                }),
            ],
            Err(e) => vec![Render::AppendTurn(user_turn), Render::ShowError(e.to_string())],
        }
    }
}
