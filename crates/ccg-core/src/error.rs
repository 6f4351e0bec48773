use serde::{Deserialize, Serialize};

/// Closed set of caller-visible failure classifications.
///
/// Distinct from [`AppError`]: this is result data returned to the caller,
/// not a Rust error type propagated with `?`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    IdleTimeout,
    CommandNotFound,
    UpstreamError,
    AuthRequired,
    JsonDecode,
    ProtocolMissingSession,
    EmptyResult,
    SubprocessError,
    ConfigError,
    UnexpectedException,
}

impl ErrorKind {
    /// Priority used when more than one classification applies within an attempt.
    /// Higher wins and is sticky; only used to compare auth/upstream/unexpected.
    fn classification_priority(&self) -> u8 {
        match self {
            Self::AuthRequired => 3,
            Self::UpstreamError => 2,
            Self::UnexpectedException => 1,
            _ => 0,
        }
    }

    /// Whether `candidate` should replace `self` as the latched classification.
    pub fn should_upgrade_to(&self, candidate: ErrorKind) -> bool {
        candidate.classification_priority() > self.classification_priority()
    }

    /// Kinds that short-circuit the retry loop without running an attempt.
    pub fn short_circuits_retry(&self) -> bool {
        matches!(self, Self::CommandNotFound | Self::ConfigError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::IdleTimeout => "idle_timeout",
            Self::CommandNotFound => "command_not_found",
            Self::UpstreamError => "upstream_error",
            Self::AuthRequired => "auth_required",
            Self::JsonDecode => "json_decode",
            Self::ProtocolMissingSession => "protocol_missing_session",
            Self::EmptyResult => "empty_result",
            Self::SubprocessError => "subprocess_error",
            Self::ConfigError => "config_error",
            Self::UnexpectedException => "unexpected_exception",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine-internal failures that occur outside the per-attempt error-kind lattice:
/// config loading, JSON-RPC framing, and PATH resolution.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("config file at {path} is malformed: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("coder.api_token is not set in config or CODER_API_TOKEN")]
    MissingApiToken,

    #[error("tool '{0}' is not on PATH")]
    CommandNotFound(String),

    #[error("malformed JSON-RPC request: {0}")]
    MalformedRequest(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("working directory does not exist: {0}")]
    WorkingDirectoryMissing(String),
}
