use thiserror::Error;

/// Failure taxonomy for the core pipeline.
///
/// A missing knowledge record is deliberately NOT an error: empty lookups
/// degrade to a fixed apology reply (see `prompt::DATA_NOT_FOUND_APOLOGY`),
/// so the variants here only cover failures that abort the current
/// interaction.
#[derive(Debug, Error)]
pub enum AikenError {
    /// Required credential/config missing at startup. Fatal - surfaced to
    /// the operator, never to the chat transcript.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backing store could not be reached or a query failed. Non-fatal:
    /// the current interaction aborts, the session stays usable.
    #[error("knowledge store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// The conversational model call failed (timeout, quota, malformed
    /// response). The triggering user turn stays in history; no assistant
    /// turn is appended.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AikenError>;
