use thiserror::Error;

/// Top-level error type for the grokgram bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// The history store could not be opened. Fatal at startup.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A single load, append, or clear failed. The stored record is unchanged.
    #[error("storage I/O error: {0}")]
    StorageIo(String),

    #[error("completion provider error ({provider}): {message}")]
    Remote { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BotError {
    pub fn storage_io(err: impl std::fmt::Display) -> Self {
        Self::StorageIo(err.to_string())
    }

    pub fn remote(provider: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Remote {
            provider: provider.into(),
            message: err.to_string(),
        }
    }

    /// Errors that should take the process down rather than degrade a turn.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
