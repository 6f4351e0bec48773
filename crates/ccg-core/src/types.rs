use serde::{Deserialize, Serialize};

/// The three tool adapters this bridge exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Adapter {
    CodeExecutor,
    Reviewer,
    Generalist,
}

impl Adapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeExecutor => "code-executor",
            Self::Reviewer => "reviewer",
            Self::Generalist => "generalist",
        }
    }

    /// Whether a missing session id is a hard failure for this adapter.
    pub fn requires_session_id(&self) -> bool {
        !matches!(self, Self::Generalist)
    }

    /// Adapters that mutate the caller's workspace may not be safely retried
    /// after a failed attempt, regardless of the caller's `max_retries`
    /// override (§4.4): the code-executor writes files.
    pub fn has_write_side_effects(&self) -> bool {
        matches!(self, Self::CodeExecutor)
    }

    /// Default retry budget (retries beyond the first attempt).
    pub fn default_max_retries(&self) -> u32 {
        match self {
            Self::CodeExecutor => 0,
            Self::Reviewer | Self::Generalist => 1,
        }
    }
}

impl std::fmt::Display for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse permission label forwarded to the vendor binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl SandboxMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

impl std::fmt::Display for SandboxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
