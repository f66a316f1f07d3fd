use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AikenError, Result};
use crate::session::{ConversationTurn, Role};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// Model constants
pub const GEMINI_FLASH: &str = "gemini-flash-latest";

// The model call is the one high-latency operation in the pipeline; cap it
// rather than letting a stalled request hang the whole interaction.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// The hosted conversational model as seen by the core: one fallible,
/// synchronous-per-call capability. Sessions talk to this trait so tests
/// can swap in a scripted fake.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(
        &self,
        persona: &str,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String>;
}

// ============ Wire Types ============

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
    #[serde(default)]
    status: String,
}

// ============ Client ============

#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_model(api_key, GEMINI_FLASH)
    }

    pub fn with_model(api_key: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Build a client from the `GOOGLE_API_KEY` environment variable.
    /// A missing key is a startup configuration error, not a model error.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
            AikenError::Configuration("environment variable GOOGLE_API_KEY is not set".to_string())
        })?;
        Ok(Self::new(&api_key))
    }
}

/// Map the displayed history onto the wire format. Gemini calls the
/// assistant side "model"; the trailing entry is always the new message.
fn build_request(
    persona: &str,
    history: &[ConversationTurn],
    new_message: &str,
) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content {
            role: Some(
                match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: turn.content.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: new_message.to_string(),
        }],
    });

    GenerateContentRequest {
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part {
                text: persona.to_string(),
            }],
        }),
        contents,
    }
}

impl ChatModel for GeminiClient {
    async fn complete(
        &self,
        persona: &str,
        history: &[ConversationTurn],
        new_message: &str,
    ) -> Result<String> {
        let request = build_request(persona, history, new_message);
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AikenError::ModelUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            // Try to parse structured error
            if let Ok(parsed) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(AikenError::ModelUnavailable(format!(
                    "Gemini API error ({}): {} - {}",
                    status, parsed.error.status, parsed.error.message
                )));
            }

            return Err(AikenError::ModelUnavailable(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AikenError::ModelUnavailable(format!("malformed response: {}", e)))?;

        completion
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| AikenError::ModelUnavailable("no text in model response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_roles_and_appends_new_message() {
        let history = vec![
            ConversationTurn {
                role: Role::Assistant,
                content: "Hey!".to_string(),
            },
            ConversationTurn {
                role: Role::User,
                content: "Hello".to_string(),
            },
        ];

        let request = build_request("persona text", &history, "next question");

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role.as_deref(), Some("model"));
        assert_eq!(request.contents[1].role.as_deref(), Some("user"));
        assert_eq!(request.contents[2].role.as_deref(), Some("user"));
        assert_eq!(request.contents[2].parts[0].text, "next question");

        let system = request.system_instruction.unwrap();
        assert_eq!(system.parts[0].text, "persona text");
    }

    #[test]
    fn missing_env_key_is_a_configuration_error() {
        std::env::remove_var("GOOGLE_API_KEY");
        let err = GeminiClient::from_env().unwrap_err();
        assert!(matches!(err, AikenError::Configuration(_)));
    }
}
