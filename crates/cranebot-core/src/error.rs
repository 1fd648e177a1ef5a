use thiserror::Error;

/// Top-level error type for CraneBot.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for CraneBotError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CraneBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CraneBotError {
    fn from(err: toml::de::Error) -> Self {
        CraneBotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CraneBotError {
    fn from(err: toml::ser::Error) -> Self {
        CraneBotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CraneBotError {
    fn from(err: serde_json::Error) -> Self {
        CraneBotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for CraneBot operations.
pub type Result<T> = std::result::Result<T, CraneBotError>;
