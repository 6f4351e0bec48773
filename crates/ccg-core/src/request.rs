use std::path::PathBuf;

use crate::types::{Adapter, SandboxMode};

/// Caller-supplied parameters for one tool call.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub adapter: Adapter,
    pub prompt: String,
    pub working_dir: PathBuf,
    pub sandbox: SandboxMode,
    pub prior_session_id: Option<String>,
    pub model: Option<String>,
    pub yolo: bool,
    pub resume_profile: Option<String>,
    pub images: Vec<PathBuf>,
    pub idle_timeout_secs: u64,
    pub wall_timeout_secs: u64,
    pub max_retries: Option<u32>,
    pub return_all_messages: bool,
    pub log_metrics: bool,
}

impl InvocationRequest {
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
    pub const DEFAULT_WALL_TIMEOUT_SECS: u64 = 1800;

    /// §3 invariant: idle must not exceed wall-clock when both are positive.
    pub fn validate(&self) -> Result<(), String> {
        if self.wall_timeout_secs > 0 && self.idle_timeout_secs > self.wall_timeout_secs {
            return Err(format!(
                "idle timeout ({}) exceeds wall-clock timeout ({})",
                self.idle_timeout_secs, self.wall_timeout_secs
            ));
        }
        if !self.working_dir.exists() {
            return Err(format!(
                "working directory does not exist: {}",
                self.working_dir.display()
            ));
        }
        Ok(())
    }

    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(self.adapter.default_max_retries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> InvocationRequest {
        InvocationRequest {
            adapter: Adapter::Reviewer,
            prompt: "hello".into(),
            working_dir: std::env::temp_dir(),
            sandbox: SandboxMode::ReadOnly,
            prior_session_id: None,
            model: None,
            yolo: false,
            resume_profile: None,
            images: vec![],
            idle_timeout_secs: InvocationRequest::DEFAULT_IDLE_TIMEOUT_SECS,
            wall_timeout_secs: InvocationRequest::DEFAULT_WALL_TIMEOUT_SECS,
            max_retries: None,
            return_all_messages: false,
            log_metrics: false,
        }
    }

    #[test]
    fn idle_exceeding_wall_is_rejected() {
        let mut req = base_request();
        req.idle_timeout_secs = 2000;
        req.wall_timeout_secs = 1800;
        assert!(req.validate().is_err());
    }

    #[test]
    fn unbounded_wall_permits_any_idle() {
        let mut req = base_request();
        req.idle_timeout_secs = 10_000;
        req.wall_timeout_secs = 0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_working_dir_is_rejected() {
        let mut req = base_request();
        req.working_dir = PathBuf::from("/no/such/directory/ccg-mcp-test");
        assert!(req.validate().is_err());
    }

    #[test]
    fn effective_max_retries_falls_back_to_adapter_default() {
        let req = base_request();
        assert_eq!(req.effective_max_retries(), 1);
        let mut executor = base_request();
        executor.adapter = Adapter::CodeExecutor;
        assert_eq!(executor.effective_max_retries(), 0);
        let mut overridden = base_request();
        overridden.max_retries = Some(3);
        assert_eq!(overridden.effective_max_retries(), 3);
    }
}
