use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use crate::config::{AppConfig, Credentials};
pub use crate::pipeline::Pipeline;
pub use crate::types::{PipelineState, Report, Snippet};

/// The `PipelineError` enum represents the errors that can occur while
/// searching for a topic and narrating the results.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Represents an error returned by the search provider.
    #[error("Search failed: {0}")]
    SearchError(String),
    /// Represents an error returned by the language model provider.
    #[error("LLM processing failed: {0}")]
    LLMError(String),
    /// One or both API keys are missing.
    #[error("Both the Google and the Tavily API keys are required")]
    MissingCredentials,
    /// The topic was blank.
    #[error("Question must not be empty")]
    EmptyQuestion,
    /// Represents an error while loading the configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// The web server could not bind or serve.
    #[error("Server error: {0}")]
    ServerError(String),
}

/// A type alias for `Result` with the `PipelineError` error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default number of search results handed to the narrator.
pub const DEFAULT_MAX_RESULTS: usize = 3;
/// The default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// The user agent sent to both providers.
pub const USER_AGENT: &str = concat!("trendalert/", env!("CARGO_PKG_VERSION"));
/// The log directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "trendalert=info";

/// Builds the log filter from the value of `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Directives from `RUST_LOG` are used as given.
pub fn log_filter(rust_log: Option<&str>) -> tracing_subscriber::EnvFilter {
    rust_log
        .and_then(|directives| tracing_subscriber::EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
}
