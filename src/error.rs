use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    /// Driver subprocess failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the driver pipes failed
    #[error("Browser session I/O: {0}")]
    SessionIO(String),

    /// Driver answered with ok=false or an incomplete payload
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config '{path}': {source}")]
    Config {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("HTTP error ({context}): {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Locator could not be parsed by the XPath evaluator
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Element '{0}' not found")]
    ElementNotFound(String),

    /// Locator no longer resolves to exactly one element. Retryable.
    #[error("Element '{0}' misplaced")]
    ElementMisplaced(String),

    #[error("Interaction '{action}' failed on '{locator}'")]
    InteractionFailed { action: String, locator: String },

    #[error("Oracle failure: {0}")]
    Oracle(String),

    #[error("Profile lookup failed: {0}")]
    Profile(String),

    /// No actionable control left on the page
    #[error("Navigation dead end: {0}")]
    DeadEnd(String),

    #[error("Job exceeded time budget of {0:?}")]
    JobTimeout(Duration),
}

impl FormError {
    /// Misplaced elements are re-located by the caller rather than failing the job.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FormError::ElementMisplaced(_) | FormError::ElementNotFound(_))
    }
}

pub type FormResult<T> = Result<T, FormError>;
