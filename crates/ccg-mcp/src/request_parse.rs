//! Maps a `tools/call` JSON-RPC `arguments` object onto an [`InvocationRequest`]
//! (§6: "`arguments` maps onto `InvocationRequest`").

use std::path::PathBuf;

use ccg_core::{Adapter, InvocationRequest, SandboxMode};
use serde_json::Value;

pub fn parse(adapter: Adapter, args: &Value) -> Result<InvocationRequest, String> {
    let prompt = args
        .get("prompt")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing required argument 'prompt'".to_string())?
        .to_string();

    let working_dir = match args.get("working_dir").or_else(|| args.get("cwd")).and_then(Value::as_str) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().map_err(|e| format!("failed to resolve cwd: {e}"))?,
    };

    let sandbox = match args.get("sandbox").and_then(Value::as_str) {
        Some("read-only") | None => SandboxMode::ReadOnly,
        Some("workspace-write") => SandboxMode::WorkspaceWrite,
        Some("danger-full-access") => SandboxMode::DangerFullAccess,
        Some(other) => return Err(format!("unknown sandbox mode '{other}'")),
    };

    let prior_session_id = args
        .get("session_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let model = args.get("model").and_then(Value::as_str).map(str::to_string);
    let yolo = args.get("yolo").and_then(Value::as_bool).unwrap_or(false);
    let resume_profile = args
        .get("resume_profile")
        .and_then(Value::as_str)
        .map(str::to_string);

    let images = args
        .get("images")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    let idle_timeout_secs = args
        .get("idle_timeout_secs")
        .and_then(Value::as_u64)
        .unwrap_or(InvocationRequest::DEFAULT_IDLE_TIMEOUT_SECS);
    let wall_timeout_secs = args
        .get("wall_timeout_secs")
        .and_then(Value::as_u64)
        .unwrap_or(InvocationRequest::DEFAULT_WALL_TIMEOUT_SECS);

    let max_retries = args
        .get("max_retries")
        .and_then(Value::as_u64)
        .map(|v| v as u32);

    let return_all_messages = args
        .get("return_all_messages")
        .or_else(|| args.get("full_log"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let log_metrics = args
        .get("log_metrics")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let req = InvocationRequest {
        adapter,
        prompt,
        working_dir,
        sandbox,
        prior_session_id,
        model,
        yolo,
        resume_profile,
        images,
        idle_timeout_secs,
        wall_timeout_secs,
        max_retries,
        return_all_messages,
        log_metrics,
    };

    req.validate()?;
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_prompt_is_rejected() {
        let err = parse(Adapter::Reviewer, &json!({})).unwrap_err();
        assert!(err.contains("prompt"));
    }

    #[test]
    fn defaults_fill_in_timeouts_and_sandbox() {
        let req = parse(
            Adapter::Reviewer,
            &json!({"prompt": "hi", "working_dir": std::env::temp_dir().to_str().unwrap()}),
        )
        .unwrap();
        assert_eq!(req.idle_timeout_secs, InvocationRequest::DEFAULT_IDLE_TIMEOUT_SECS);
        assert_eq!(req.wall_timeout_secs, InvocationRequest::DEFAULT_WALL_TIMEOUT_SECS);
        assert_eq!(req.sandbox, SandboxMode::ReadOnly);
    }

    #[test]
    fn unknown_sandbox_value_is_rejected() {
        let err = parse(
            Adapter::Reviewer,
            &json!({"prompt": "hi", "working_dir": std::env::temp_dir().to_str().unwrap(), "sandbox": "nope"}),
        )
        .unwrap_err();
        assert!(err.contains("sandbox"));
    }

    #[test]
    fn session_id_and_model_are_threaded_through() {
        let req = parse(
            Adapter::CodeExecutor,
            &json!({
                "prompt": "hi",
                "working_dir": std::env::temp_dir().to_str().unwrap(),
                "session_id": "s-1",
                "model": "glm-4.7",
            }),
        )
        .unwrap();
        assert_eq!(req.prior_session_id.as_deref(), Some("s-1"));
        assert_eq!(req.model.as_deref(), Some("glm-4.7"));
    }
}
