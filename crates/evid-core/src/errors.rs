use thiserror::Error;

/// Core error types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Event ID computation failed.
    #[error("event ID computation failed: {0}")]
    EventId(#[from] crate::event_id::EventIdError),
    /// Rule-table configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    /// A scenario file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid scenario structure or missing required fields.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}
