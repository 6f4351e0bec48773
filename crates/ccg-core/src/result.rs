use serde::Serialize;

use crate::error::ErrorKind;

/// Detail carried on a failed attempt, surfaced verbatim per §7.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub last_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_decode_errors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

/// The tagged result record returned to the caller (§3). `success` is a real
/// JSON boolean so callers can branch on it without string comparison; the
/// two variants are otherwise untagged and distinguished by which of
/// `result`/`error` is present.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Success {
        success: bool,
        tool: String,
        #[serde(rename = "SESSION_ID")]
        session_id: Option<String>,
        result: String,
        #[serde(rename = "duration")]
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        all_messages: Option<Vec<serde_json::Value>>,
    },
    Failure {
        success: bool,
        tool: String,
        error: String,
        error_kind: ErrorKind,
        error_detail: ErrorDetail,
        #[serde(rename = "duration")]
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        all_messages: Option<Vec<serde_json::Value>>,
    },
}

impl InvocationResult {
    pub fn success(
        tool: impl Into<String>,
        session_id: Option<String>,
        result: impl Into<String>,
        duration_ms: u64,
        all_messages: Option<Vec<serde_json::Value>>,
    ) -> Self {
        Self::Success {
            success: true,
            tool: tool.into(),
            session_id,
            result: result.into(),
            duration_ms,
            all_messages,
        }
    }

    pub fn failure(
        tool: impl Into<String>,
        error: impl Into<String>,
        error_kind: ErrorKind,
        error_detail: ErrorDetail,
        duration_ms: u64,
        all_messages: Option<Vec<serde_json::Value>>,
    ) -> Self {
        Self::Failure {
            success: false,
            tool: tool.into(),
            error: error.into(),
            error_kind,
            error_detail,
            duration_ms,
            all_messages,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_bool_true() {
        let result = InvocationResult::success("reviewer", Some("t-1".into()), "hello world", 42, None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["SESSION_ID"], "t-1");
        assert_eq!(json["duration"], serde_json::json!(42));
    }

    #[test]
    fn failure_omits_absent_optional_detail_fields() {
        let result = InvocationResult::failure(
            "coder",
            "boom",
            ErrorKind::CommandNotFound,
            ErrorDetail {
                message: "boom".into(),
                exit_code: None,
                last_lines: vec![],
                json_decode_errors: None,
                idle_timeout_s: None,
                max_duration_s: None,
                retries: None,
            },
            5,
            None,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["error_detail"].get("exit_code").is_none());
        assert_eq!(json["error_kind"], "command_not_found");
        assert_eq!(json["success"], serde_json::json!(false));
    }
}
