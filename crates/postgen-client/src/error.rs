use postgen_types::TransitionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay returned {status}: {message}")]
    Relay { status: u16, message: String },

    /// Terminal error event received after some text was delivered
    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error(transparent)]
    State(#[from] TransitionError),
}
