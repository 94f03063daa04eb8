use std::path::PathBuf;
use std::time::Duration;

/// Failures of a single analyzer invocation.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The document could not be written to its temporary file.
    #[error("failed to stage document for analysis: {0}")]
    Staging(#[source] std::io::Error),

    /// The analyzer could not be spawned or exited unsuccessfully.
    /// `detail` is the analyzer's stderr when it printed any.
    #[error("{detail}")]
    Invocation { detail: String },

    /// The analyzer exited cleanly but its stdout was not the expected JSON.
    #[error("analyzer returned malformed JSON: {0}")]
    ResultParse(#[source] serde_json::Error),

    #[error("analyzer did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Outcome of a session-level analysis request that produced no result.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("document is not a playbook")]
    IneligibleDocument,

    #[error("analysis is disabled in settings")]
    AnalyzerDisabled,

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("cannot locate analyzer root: {0}")]
    AnalyzerRoot(String),
}
