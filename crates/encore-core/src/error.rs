use thiserror::Error;

/// Top-level error type for shared Encore types.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed path at step {step}: {reason}")]
    MalformedPath { step: usize, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CoreError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
