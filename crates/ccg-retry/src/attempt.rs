use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ccg_core::{ErrorKind, InvocationRequest};
use ccg_process::SupervisorFailure;
use ccg_protocol::{adapter_for, AdapterSpec, AggregatorState};

/// Outcome of one supervisor+parser attempt (§4.3, §4.4), collected into an
/// owned record so it can cross the task boundary a panic-isolating
/// `tokio::spawn` introduces.
pub(crate) struct AttemptResult {
    pub session_id: Option<String>,
    pub result_text: String,
    pub error_flag: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub json_decode_errors: u32,
    pub last_lines: Vec<String>,
    pub full_log: Option<Vec<serde_json::Value>>,
    pub exit_code: Option<i32>,
    pub raw_line_count: u64,
    pub supervisor_failure: Option<SupervisorFailure>,
}

/// Run exactly one attempt: build the child spec, spawn+supervise it, and
/// feed every line to the aggregator through the adapter's routing table.
/// Attempt *n*'s [`AggregatorState`] never survives past this function, so
/// it cannot leak into attempt *n+1* (§8 I7).
pub(crate) async fn run_one_attempt(
    adapter: Arc<dyn AdapterSpec>,
    req: InvocationRequest,
    env_overlay: HashMap<String, String>,
    capture_full_log: bool,
) -> AttemptResult {
    let spec = adapter.build_child_spec(&req, &env_overlay);
    let mut state = AggregatorState::new(capture_full_log);

    let idle_timeout = Duration::from_secs(req.idle_timeout_secs);
    let wall_timeout = (req.wall_timeout_secs > 0).then(|| Duration::from_secs(req.wall_timeout_secs));

    let outcome = ccg_process::run(spec, idle_timeout, wall_timeout, |line| {
        state.ingest_line(line, |s, event| adapter.route_event(s, event));
    })
    .await;

    let (exit_code, raw_line_count, supervisor_failure) = match outcome {
        Ok(o) => (o.exit_code, o.raw_line_count, None),
        Err(failure) => (None, 0, Some(failure)),
    };

    AttemptResult {
        session_id: state.session_id,
        result_text: state.result_text,
        error_flag: state.error_flag,
        error_kind: state.error_kind,
        error_message: state.error_message,
        json_decode_errors: state.json_decode_errors,
        last_lines: state.last_lines(),
        full_log: state.full_log().map(|log| log.to_vec()),
        exit_code,
        raw_line_count,
        supervisor_failure,
    }
}

/// Build an [`AdapterSpec`] trait object for `kind`, shareable across the
/// spawned attempt task.
pub(crate) fn shared_adapter(kind: ccg_core::Adapter) -> Arc<dyn AdapterSpec> {
    Arc::from(adapter_for(kind))
}
