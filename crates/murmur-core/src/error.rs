use thiserror::Error;

#[derive(Debug, Error)]
pub enum MurmurError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Completion gateway error: {0}")]
    Completion(String),

    #[error("Extension error ({extension}): {reason}")]
    Extension { extension: String, reason: String },

    #[error("No handler found for command: {command}")]
    CommandNotFound { command: String },

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Short error code string surfaced on API responses.
    pub fn code(&self) -> &'static str {
        match self {
            MurmurError::Config(_) => "CONFIG_ERROR",
            MurmurError::Storage(_) => "STORAGE_ERROR",
            MurmurError::Completion(_) => "COMPLETION_ERROR",
            MurmurError::Extension { .. } => "EXTENSION_ERROR",
            MurmurError::CommandNotFound { .. } => "COMMAND_NOT_FOUND",
            MurmurError::ChannelClosed(_) => "CHANNEL_CLOSED",
            MurmurError::Serialization(_) => "SERIALIZATION_ERROR",
            MurmurError::Io(_) => "IO_ERROR",
            MurmurError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
