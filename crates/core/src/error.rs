use thiserror::Error;

pub type WizardResult<T> = Result<T, WizardError>;

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success HTTP status; `message` is the best-effort text pulled
    /// from the response body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WizardError {
    /// Text shown in an error dialog. API errors surface the server message
    /// on its own; everything else falls back to `fallback` when empty.
    pub fn user_message(&self, fallback: &str) -> String {
        let msg = match self {
            WizardError::Api { message, .. } => message.clone(),
            WizardError::Transport(m) | WizardError::Validation(m) => m.clone(),
            other => other.to_string(),
        };
        if msg.trim().is_empty() {
            fallback.to_string()
        } else {
            msg
        }
    }
}

impl From<config::ConfigError> for WizardError {
    fn from(e: config::ConfigError) -> Self {
        WizardError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_is_shown_verbatim() {
        let err = WizardError::Api {
            status: 404,
            message: "Session not found. Please upload again.".into(),
        };
        assert_eq!(
            err.user_message("Preview failed"),
            "Session not found. Please upload again."
        );
    }

    #[test]
    fn test_empty_message_uses_fallback() {
        let err = WizardError::Api {
            status: 500,
            message: "  ".into(),
        };
        assert_eq!(err.user_message("Upload failed"), "Upload failed");
    }
}
