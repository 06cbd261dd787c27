use thiserror::Error;

/// A specialized `Result` type for input execution.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to decode executor command: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {description}")]
    InvalidArgument { description: String },

    #[error("Unknown key name '{key}'")]
    UnknownKey { key: String },

    #[error("Input driver failed: {description}")]
    DriverFailed { description: String },

    #[error("Input backend unavailable: {description}")]
    Unavailable { description: String },
}
