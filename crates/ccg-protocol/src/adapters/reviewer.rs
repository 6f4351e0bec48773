use std::collections::HashMap;

use ccg_core::{Adapter, InvocationRequest};
use ccg_process::{ChildSpec, StdinDisposition};

use crate::aggregator::{classify_error_message, AggregatorState};

use super::{escape_argv_prompt, sentinel};

/// The reviewer CLI: prompt after `--`, completion signalled by
/// `turn.completed`, session id at top-level `thread_id`, agent text
/// concatenated from `item.text` on `agent_message` items (§4.5).
///
/// The `resume` sub-command's argv position is implemented as a leading
/// positional word before the flag set; this is an assumption about the
/// vendor CLI's grammar (§9 open question), not a verified contract.
pub(super) struct ReviewerAdapter;

impl super::AdapterSpec for ReviewerAdapter {
    fn kind(&self) -> Adapter {
        Adapter::Reviewer
    }

    fn build_child_spec(
        &self,
        req: &InvocationRequest,
        _env_overlay: &HashMap<String, String>,
    ) -> ChildSpec {
        let mut args = Vec::new();

        if let Some(session_id) = &req.prior_session_id {
            args.push("resume".to_string());
            args.push(session_id.clone());
        } else {
            args.push("exec".to_string());
        }

        args.push("--json".to_string());
        args.push("--sandbox".to_string());
        args.push(req.sandbox.label().to_string());

        if let Some(model) = &req.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        args.push("--".to_string());
        args.push(escape_argv_prompt(&req.prompt));

        ChildSpec {
            program: "codex".into(),
            args,
            env: HashMap::new(),
            cwd: req.working_dir.clone(),
            stdin: StdinDisposition::ClosedEmpty,
            sentinel: sentinel(&["turn.completed"]),
        }
    }

    fn route_event(&self, state: &mut AggregatorState, event: &serde_json::Value) {
        if state.session_id.is_none() {
            if let Some(thread_id) = event.get("thread_id").and_then(|v| v.as_str()) {
                state.session_id = Some(thread_id.to_string());
            }
        }

        if let Some(item) = event.get("item") {
            if item.get("type").and_then(|t| t.as_str()) == Some("agent_message") {
                if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
                    state.append_text(text);
                }
            }
        }

        if event.get("type").and_then(|t| t.as_str()) == Some("error") {
            if let Some(message) = event.get("message").and_then(|v| v.as_str()) {
                classify_error_message(state, message);
            }
        }
    }
}
