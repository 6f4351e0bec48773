//! Per-invocation metrics collector (§4.7).
//!
//! One [`Metrics`] is built per call, updated as the call progresses, and
//! serialized as a single JSON line to stderr when the caller opts in. This
//! stream is independent of the JSON-RPC response written to stdout so
//! structured logs and RPC framing never interleave on the same stream.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ccg_core::ErrorKind;

/// Character/line counts for a piece of text, computed once and carried on
/// the metrics record rather than recomputed at serialization time.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TextCounts {
    pub chars: usize,
    pub lines: usize,
}

impl TextCounts {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            lines: text.lines().count(),
        }
    }
}

/// The metrics record for one call (§3). Spans every retry attempt; finalized
/// exactly once when the retry driver returns.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub tool: String,
    pub sandbox: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub prompt: TextCounts,
    pub result: TextCounts,
    pub raw_output_lines: u64,
    pub json_decode_errors: u32,
}

impl Metrics {
    /// Start a new record at dispatch time, before the first attempt spawns.
    pub fn start(tool: impl Into<String>, sandbox: impl Into<String>, prompt: &str) -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: 0,
            tool: tool.into(),
            sandbox: sandbox.into(),
            success: false,
            error_kind: None,
            retries: 0,
            exit_code: None,
            prompt: TextCounts::of(prompt),
            result: TextCounts::default(),
            raw_output_lines: 0,
            json_decode_errors: 0,
        }
    }

    /// Finalize the record at completion: stamp the end time, compute
    /// duration, and record the terminal outcome.
    pub fn finish(
        &mut self,
        success: bool,
        error_kind: Option<ErrorKind>,
        exit_code: Option<i32>,
        result_text: &str,
        raw_output_lines: u64,
        json_decode_errors: u32,
    ) {
        let ended_at = Utc::now();
        self.duration_ms = (ended_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.ended_at = Some(ended_at);
        self.success = success;
        self.error_kind = error_kind;
        self.exit_code = exit_code;
        self.result = TextCounts::of(result_text);
        self.raw_output_lines = raw_output_lines;
        self.json_decode_errors = json_decode_errors;
    }

    /// Emit this record as a single-line JSON object to stderr. Never panics
    /// on a serialization failure; a broken metrics stream must not take
    /// down the call that produced it.
    pub fn emit_to_stderr(&self) {
        match serde_json::to_string(self) {
            Ok(line) => eprintln!("{line}"),
            Err(err) => tracing::warn!("failed to serialize metrics: {err}"),
        }
    }
}
