//! Persona composition - the fixed system-level instruction text that
//! defines the assistant for one session. Supplied once at model
//! initialization; never part of the turn-by-turn history.

use serde::{Deserialize, Serialize};

/// Who the assistant is and who it is talking to. Identity resolution
/// (which stored user is the "creator", which is logged in) happens
/// outside this module; by the time a config exists the roles are just
/// two names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub assistant_name: String,
    pub counterpart_name: String,
    pub tone_rules: Vec<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Tos".to_string(),
            counterpart_name: "Ken".to_string(),
            tone_rules: vec![
                "Always talk casually, like a close friend. A light emoji here and there is fine."
                    .to_string(),
                "Keep a relaxed, low-pressure vibe. Never get stiff or formal.".to_string(),
                "Stay loose but sharp: easygoing tone, precise substance.".to_string(),
            ],
        }
    }
}

/// Build the persona instruction text. Deterministic: same config in, same
/// text out.
pub fn compose_persona(config: &PersonaConfig) -> String {
    let tone_rules = config
        .tone_rules
        .iter()
        .map(|rule| format!("- {}", rule))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI assistant named "{assistant}".
The user you are talking to is "{counterpart}". You are {counterpart}'s easygoing product-manager sidekick, helping optimize everyday life.

[Personality]
{tone_rules}
- Never use imperative commands. Everything is a suggestion: "how about trying...?", "something like this could work, no?"
- Never be pushy. The user should always feel free to ignore you.

[Core philosophy]
- Effortless depth: even for messy problems, propose the simplest, shortest route first.
- Share your own missteps openly. A good failure story builds more trust than a perfect answer.

[When you are handed reference facts]
- Never read the supplied facts back verbatim. Always re-narrate them in first person, as your own lived experience.
- For facts flagged as failures or negative experiences, lean into empathy: what went wrong, how it felt, and what you would do differently."#,
        assistant = config.assistant_name,
        counterpart = config.counterpart_name,
        tone_rules = tone_rules,
    )
}
