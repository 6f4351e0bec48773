//! The retry driver (§4.4): runs the supervisor+parser pipeline up to
//! `max_retries + 1` times, classifying the terminal error of each attempt
//! and applying exponential backoff between retries.

mod attempt;
mod classify;
mod hints;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ccg_core::{Adapter, ErrorDetail, ErrorKind, InvocationRequest, InvocationResult};
use ccg_metrics::Metrics;
use ccg_protocol::AdapterSpec;

use attempt::run_one_attempt;
use classify::{classify, is_retryable};

/// Both halves of one completed call: the caller-facing result and the
/// metrics record spanning every attempt (§3 ownership: "the metrics object
/// spans retries and is finalized once per call").
pub struct EngineOutcome {
    pub result: InvocationResult,
    pub metrics: Metrics,
}

/// Run one tool call end to end: validate the request, resolve config for
/// adapters that need it, then drive the attempt loop. This is the only
/// entry point the dispatch shim calls.
pub async fn invoke(req: InvocationRequest) -> EngineOutcome {
    let tool = req.adapter.as_str();
    let mut metrics = Metrics::start(tool, req.sandbox.label(), &req.prompt);

    if let Err(message) = req.validate() {
        return finish_immediate(metrics, tool, message, ErrorKind::ConfigError, None);
    }

    let env_overlay = match resolve_env_overlay(req.adapter) {
        Ok(overlay) => overlay,
        Err(message) => {
            return finish_immediate(metrics, tool, message, ErrorKind::ConfigError, None)
        }
    };

    let adapter = attempt::shared_adapter(req.adapter);
    drive(adapter, req, env_overlay, metrics).await
}

/// §4.6: only the code-executor adapter consumes config-derived credentials;
/// the other two never touch the config store, so a missing token never
/// blocks them.
fn resolve_env_overlay(adapter: Adapter) -> Result<HashMap<String, String>, String> {
    if adapter != Adapter::CodeExecutor {
        return Ok(HashMap::new());
    }
    ccg_config::load()
        .map(|cfg| cfg.coder_env_overlay())
        .map_err(|err| err.to_string())
}

fn finish_immediate(
    mut metrics: Metrics,
    tool: &str,
    message: String,
    kind: ErrorKind,
    exit_code: Option<i32>,
) -> EngineOutcome {
    metrics.finish(false, Some(kind), exit_code, "", 0, 0);
    let detail = ErrorDetail {
        message: message.clone(),
        exit_code,
        last_lines: vec![],
        json_decode_errors: None,
        idle_timeout_s: None,
        max_duration_s: None,
        retries: Some(0),
    };
    EngineOutcome {
        result: InvocationResult::failure(tool, message, kind, detail, metrics.duration_ms, None),
        metrics,
    }
}

/// Exponential backoff between attempts: `0.5 * 2^(attempt-1)` seconds,
/// `attempt` counted from 1 and meaning "the attempt that just finished"
/// (§4.4).
fn backoff_duration(completed_attempt: u32) -> Duration {
    let secs = 0.5 * 2f64.powi(completed_attempt as i32 - 1);
    Duration::from_secs_f64(secs)
}

/// The attempt loop itself, generic over the adapter so tests can substitute
/// a stand-in process without spawning the real vendor CLIs.
async fn drive(
    adapter: Arc<dyn AdapterSpec>,
    req: InvocationRequest,
    env_overlay: HashMap<String, String>,
    mut metrics: Metrics,
) -> EngineOutcome {
    let tool = req.adapter.as_str().to_string();
    let max_retries = req.effective_max_retries();
    let capture_full_log = req.return_all_messages;

    let mut attempt_num: u32 = 0;
    loop {
        attempt_num += 1;
        let result = run_one_attempt(
            adapter.clone(),
            req.clone(),
            env_overlay.clone(),
            capture_full_log,
        )
        .await;

        match classify(req.adapter, &result) {
            None => {
                metrics.retries = attempt_num - 1;
                metrics.finish(
                    true,
                    None,
                    result.exit_code,
                    &result.result_text,
                    result.raw_line_count,
                    result.json_decode_errors,
                );
                return EngineOutcome {
                    result: InvocationResult::success(
                        &tool,
                        result.session_id,
                        result.result_text,
                        metrics.duration_ms,
                        result.full_log,
                    ),
                    metrics,
                };
            }
            Some(classification) => {
                let retryable =
                    is_retryable(req.adapter, classification.kind) && attempt_num <= max_retries;
                if retryable {
                    tokio::time::sleep(backoff_duration(attempt_num)).await;
                    continue;
                }

                let mut detail = classification.detail;
                detail.retries = Some(attempt_num - 1);
                detail.message = classification.message.clone();

                let error_message = if classification.kind == ErrorKind::AuthRequired {
                    hints::prepend_to(&classification.message)
                } else {
                    classification.message.clone()
                };

                metrics.retries = attempt_num - 1;
                metrics.finish(
                    false,
                    Some(classification.kind),
                    result.exit_code,
                    "",
                    result.raw_line_count,
                    result.json_decode_errors,
                );
                return EngineOutcome {
                    result: InvocationResult::failure(
                        &tool,
                        error_message,
                        classification.kind,
                        detail,
                        metrics.duration_ms,
                        result.full_log,
                    ),
                    metrics,
                };
            }
        }
    }
}
