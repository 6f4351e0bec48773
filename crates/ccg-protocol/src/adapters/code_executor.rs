use std::collections::HashMap;

use ccg_core::{Adapter, InvocationRequest, SandboxMode};
use ccg_process::{ChildSpec, StdinDisposition};

use crate::aggregator::{classify_error_message, AggregatorState};

use super::{escape_argv_prompt, sentinel};

/// The hosted-Claude-compatible CLI: prompt on argv, completion signalled by
/// a `result` or `error` event, session id under `result.session_id`, and a
/// single-object agent response under `result.result` (§4.5).
pub(super) struct CodeExecutorAdapter;

impl super::AdapterSpec for CodeExecutorAdapter {
    fn kind(&self) -> Adapter {
        Adapter::CodeExecutor
    }

    fn build_child_spec(
        &self,
        req: &InvocationRequest,
        env_overlay: &HashMap<String, String>,
    ) -> ChildSpec {
        let mut args = vec!["--print".to_string(), "--output-format".to_string(), "json".to_string()];

        if let Some(model) = &req.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(session_id) = &req.prior_session_id {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }
        if !matches!(req.sandbox, SandboxMode::ReadOnly) {
            args.push("--dangerously-skip-permissions".to_string());
        }

        args.push(escape_argv_prompt(&req.prompt));

        ChildSpec {
            program: "claude".into(),
            args,
            env: env_overlay.clone(),
            cwd: req.working_dir.clone(),
            stdin: StdinDisposition::ClosedEmpty,
            sentinel: sentinel(&["result", "error"]),
        }
    }

    fn route_event(&self, state: &mut AggregatorState, event: &serde_json::Value) {
        let Some(event_type) = event.get("type").and_then(|t| t.as_str()) else {
            return;
        };

        match event_type {
            "result" => {
                if let Some(result) = event.get("result") {
                    if state.session_id.is_none() {
                        if let Some(sid) = result.get("session_id").and_then(|v| v.as_str()) {
                            state.session_id = Some(sid.to_string());
                        }
                    }
                    if let Some(text) = result.get("result").and_then(|v| v.as_str()) {
                        state.result_text = text.to_string();
                    }
                }
            }
            "error" => {
                if let Some(message) = event.get("message").and_then(|v| v.as_str()) {
                    classify_error_message(state, message);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterSpec;
    use serde_json::json;

    fn req() -> InvocationRequest {
        InvocationRequest {
            adapter: Adapter::CodeExecutor,
            prompt: "fix the bug".into(),
            working_dir: std::env::temp_dir(),
            sandbox: SandboxMode::ReadOnly,
            prior_session_id: None,
            model: None,
            yolo: false,
            resume_profile: None,
            images: vec![],
            idle_timeout_secs: 300,
            wall_timeout_secs: 1800,
            max_retries: None,
            return_all_messages: false,
            log_metrics: false,
        }
    }

    #[test]
    fn danger_full_access_adds_skip_permissions_flag() {
        let mut r = req();
        r.sandbox = SandboxMode::DangerFullAccess;
        let spec = CodeExecutorAdapter.build_child_spec(&r, &HashMap::new());
        assert!(spec.args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn workspace_write_also_adds_skip_permissions_flag() {
        let mut r = req();
        r.sandbox = SandboxMode::WorkspaceWrite;
        let spec = CodeExecutorAdapter.build_child_spec(&r, &HashMap::new());
        assert!(spec.args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn read_only_omits_skip_permissions_flag() {
        let r = req();
        let spec = CodeExecutorAdapter.build_child_spec(&r, &HashMap::new());
        assert!(!spec.args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn prompt_newlines_pass_through_unshelled_argv_delivery() {
        // No shell sits between us and the child on Unix, so the real
        // newline must survive; only a ';'-path-separator host flattens it.
        let mut r = req();
        r.prompt = "line one\nline two".into();
        let spec = CodeExecutorAdapter.build_child_spec(&r, &HashMap::new());
        let expected = if cfg!(windows) {
            "line one\\nline two"
        } else {
            "line one\nline two"
        };
        assert_eq!(spec.args.last().unwrap(), expected);
    }

    #[test]
    fn result_event_latches_session_and_replaces_text() {
        let mut state = AggregatorState::new(false);
        let event = json!({"type": "result", "result": {"session_id": "s-1", "result": "done"}});
        CodeExecutorAdapter.route_event(&mut state, &event);
        assert_eq!(state.session_id.as_deref(), Some("s-1"));
        assert_eq!(state.result_text, "done");
    }

    #[test]
    fn error_event_with_auth_message_sets_auth_required() {
        let mut state = AggregatorState::new(false);
        let event = json!({"type": "error", "message": "401 Unauthorized"});
        CodeExecutorAdapter.route_event(&mut state, &event);
        assert_eq!(state.error_kind, Some(ccg_core::ErrorKind::AuthRequired));
    }
}
