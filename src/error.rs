//! Error types for the CoreNLP tokenizer.

use std::time::Duration;

use thiserror::Error;

/// Errors from the tokenizer and its engine session.
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Engine not found: {0}")]
    EngineNotFound(String),

    #[error("Engine failed to start: {0}")]
    Startup(String),

    #[error("Engine exited unexpectedly: {0}")]
    EngineExited(String),

    #[error("No response from engine within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Engine session is unusable after an earlier failure")]
    Poisoned,

    #[error("Bad token (NLP>) in text")]
    PromptInText,

    #[error("Request must be a single line")]
    MultiLineRequest,

    #[error("Engine output contained no JSON payload")]
    MissingPayload,

    #[error("Malformed engine payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenizerError {
    /// Whether the session can no longer be used after this error.
    ///
    /// Input validation errors leave the protocol in sync; everything that
    /// happens after a line has been written does not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TokenizerError::PromptInText | TokenizerError::MultiLineRequest
        )
    }
}

pub type Result<T> = std::result::Result<T, TokenizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_input_validation_is_recoverable() {
        assert!(!TokenizerError::PromptInText.is_fatal());
        assert!(!TokenizerError::MultiLineRequest.is_fatal());
        assert!(TokenizerError::MissingPayload.is_fatal());
        assert!(TokenizerError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(TokenizerError::Poisoned.is_fatal());
    }

    #[test]
    fn test_timeout_message() {
        let err = TokenizerError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "No response from engine within 1.5s");
    }
}
