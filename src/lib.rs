//! AI-Ken: a persona-driven assistant over a small relational knowledge
//! base of life-hack presets.
//!
//! The pipeline: a UI event (category tab, preset button, or free text)
//! becomes either a knowledge lookup composed into a retrieval-augmented
//! instruction for the hosted model, or a straight free-text send - both
//! mediated by a session that owns a bounded, ordered transcript. A
//! separate pure assembler turns smart-home goal flags into a phased plan.

pub mod app;
pub mod db;
pub mod error;
pub mod gemini;
pub mod persona;
pub mod prompt;
pub mod session;
pub mod wbs;

pub use app::{App, Render, UiEvent};
pub use db::Database;
pub use error::{AikenError, Result};
pub use gemini::{ChatModel, GeminiClient};
pub use persona::{compose_persona, PersonaConfig};
pub use session::{ChatSession, ConversationTurn, Role};
pub use wbs::{assemble_plan, GoalFlag};
