//! Retrieval-augmented prompt assembly: turns one knowledge record's facts
//! into a single instruction turn for the model. The builder never filters
//! or summarizes - every fact goes in verbatim, in stored order. Only the
//! model's reply is expected to paraphrase.

use crate::db::KnowledgeFact;

/// Fixed reply used when a preset's knowledge record has no facts. The
/// caller shows this as the assistant turn and skips the model entirely.
pub const DATA_NOT_FOUND_APOLOGY: &str =
    "Whoops - I couldn't find my notes for that one... my bad! Try asking me something else?";

/// Compose the instruction payload for one preset question.
///
/// Fact order is a contract, not a presentation choice: the stored sequence
/// carries the narrative arc the persona follows (context, then success
/// reasoning, then failure anecdote), and the empathy rules key off the
/// per-fact flags, so the facts must be judged together and in sequence.
///
/// Must not be called with empty `facts`; callers substitute
/// [`DATA_NOT_FOUND_APOLOGY`] instead.
pub fn build_prompt(user_question: &str, facts: &[KnowledgeFact], title: &str) -> String {
    debug_assert!(!facts.is_empty(), "caller must handle the empty-facts path");

    let mut prompt = format!(
        "The user asked: \"{}\"\n\
         Answer using the facts below as your own experience. Retell them in your own words - never quote them back.\n\n\
         Conclusion: {}\n\n\
         Facts, in order:\n",
        user_question, title
    );

    for fact in facts {
        prompt.push_str(&format!(
            "- [{} / {}] {}\n",
            fact.fact_type,
            fact.experience_flag.as_str(),
            fact.fact_text
        ));
    }

    prompt
}
