//! Error types for yebot core

use thiserror::Error;

/// Main error type for yebot operations
#[derive(Debug, Error)]
pub enum YebotError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion API error
    #[error("Model error: {0}")]
    Model(String),

    /// Voice connection or playback error
    #[error("Voice error: {0}")]
    Voice(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A voice session is already active
    #[error("Busy: {0}")]
    Busy(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using YebotError
pub type Result<T> = std::result::Result<T, YebotError>;

impl YebotError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        YebotError::Config(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        YebotError::Model(msg.into())
    }

    /// Create a voice error
    pub fn voice(msg: impl Into<String>) -> Self {
        YebotError::Voice(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        YebotError::Timeout(msg.into())
    }

    /// Create a busy error
    pub fn busy(msg: impl Into<String>) -> Self {
        YebotError::Busy(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        YebotError::Validation(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        YebotError::Other(msg.into())
    }
}
