use std::collections::HashMap;

use ccg_core::{Adapter, InvocationRequest, SandboxMode};
use ccg_process::{ChildSpec, StdinDisposition};

use crate::aggregator::{classify_error_message, AggregatorState};

use super::sentinel;

/// The generalist CLI: prompt on stdin (then closed), completion signalled
/// by `turn.completed`, session id under `init.session_id` or
/// `init.thread_id`, agent text from assistant `message` events' `content`
/// field, falling back to `result.response` (§4.5). Uniquely among the three
/// adapters, a missing session id is not a failure (§4.4, §9).
pub(super) struct GeneralistAdapter;

impl super::AdapterSpec for GeneralistAdapter {
    fn kind(&self) -> Adapter {
        Adapter::Generalist
    }

    fn build_child_spec(
        &self,
        req: &InvocationRequest,
        _env_overlay: &HashMap<String, String>,
    ) -> ChildSpec {
        let mut args = vec!["--json".to_string()];

        if let Some(model) = &req.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if matches!(req.sandbox, SandboxMode::DangerFullAccess) || req.yolo {
            args.push("--yolo".to_string());
        }

        ChildSpec {
            program: "gemini".into(),
            args,
            env: HashMap::new(),
            cwd: req.working_dir.clone(),
            stdin: StdinDisposition::Prompt(req.prompt.clone()),
            sentinel: sentinel(&["turn.completed"]),
        }
    }

    fn route_event(&self, state: &mut AggregatorState, event: &serde_json::Value) {
        if state.session_id.is_none() {
            if let Some(init) = event.get("init") {
                let sid = init
                    .get("session_id")
                    .or_else(|| init.get("thread_id"))
                    .and_then(|v| v.as_str());
                if let Some(sid) = sid {
                    state.session_id = Some(sid.to_string());
                }
            }
        }

        let is_assistant_message = event.get("type").and_then(|t| t.as_str()) == Some("message")
            && event.get("role").and_then(|r| r.as_str()) == Some("assistant");
        if is_assistant_message {
            if let Some(content) = event.get("content").and_then(|v| v.as_str()) {
                state.append_text(content);
            }
        } else if state.result_text.is_empty() {
            if let Some(response) = event
                .get("result")
                .and_then(|r| r.get("response"))
                .and_then(|v| v.as_str())
            {
                state.result_text = response.to_string();
            }
        }

        if event.get("type").and_then(|t| t.as_str()) == Some("error") {
            if let Some(message) = event.get("message").and_then(|v| v.as_str()) {
                classify_error_message(state, message);
            }
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
            adapter: Adapter::Generalist,
            prompt: "explain this repo".into(),
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
    fn prompt_delivered_on_stdin_not_argv() {
        let spec = GeneralistAdapter.build_child_spec(&req(), &HashMap::new());
        assert!(matches!(spec.stdin, StdinDisposition::Prompt(ref p) if p == "explain this repo"));
        assert!(!spec.args.iter().any(|a| a.contains("explain this repo")));
    }

    #[test]
    fn assistant_message_appends_content() {
        let mut state = AggregatorState::new(false);
        let event = json!({"type": "message", "role": "assistant", "content": "hi there"});
        GeneralistAdapter.route_event(&mut state, &event);
        assert_eq!(state.result_text, "hi there");
    }

    #[test]
    fn falls_back_to_result_response_when_no_assistant_message_seen() {
        let mut state = AggregatorState::new(false);
        let event = json!({"type": "turn.completed", "result": {"response": "final answer"}});
        GeneralistAdapter.route_event(&mut state, &event);
        assert_eq!(state.result_text, "final answer");
    }

    #[test]
    fn init_event_latches_session_from_nested_field() {
        let mut state = AggregatorState::new(false);
        let event = json!({"init": {"thread_id": "g-1"}});
        GeneralistAdapter.route_event(&mut state, &event);
        assert_eq!(state.session_id.as_deref(), Some("g-1"));
    }
}
