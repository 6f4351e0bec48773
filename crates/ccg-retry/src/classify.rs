use ccg_core::{Adapter, ErrorDetail, ErrorKind};
use ccg_process::SupervisorFailure;

use crate::attempt::AttemptResult;

/// A terminal classification for one failed attempt: the error kind, the
/// human-readable message (not yet auth-hinted), and the detail block.
pub(crate) struct Classification {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: ErrorDetail,
}

/// Apply §4.4's terminal success criteria, in order, to `result`. Returns
/// `None` when every criterion holds (the attempt succeeded).
pub(crate) fn classify(adapter: Adapter, result: &AttemptResult) -> Option<Classification> {
    if let Some(failure) = result.supervisor_failure {
        return Some(classify_supervisor_failure(failure, result));
    }

    if result.error_flag {
        let kind = result.error_kind.unwrap_or(ErrorKind::UnexpectedException);
        let message = result
            .error_message
            .clone()
            .unwrap_or_else(|| "the adapter reported an error event".to_string());
        return Some(Classification {
            kind,
            message,
            detail: base_detail(result),
        });
    }

    if adapter.requires_session_id() && result.session_id.is_none() {
        return Some(Classification {
            kind: ErrorKind::ProtocolMissingSession,
            message: "the vendor CLI did not report a session id".to_string(),
            detail: base_detail(result),
        });
    }

    if result.result_text.is_empty() {
        return Some(Classification {
            kind: ErrorKind::EmptyResult,
            message: "no agent text was accumulated from the vendor CLI's output".to_string(),
            detail: base_detail(result),
        });
    }

    if let Some(code) = result.exit_code {
        if code != 0 {
            let mut detail = base_detail(result);
            detail.exit_code = Some(code);
            return Some(Classification {
                kind: ErrorKind::SubprocessError,
                message: format!("child exited with non-zero status {code}"),
                detail,
            });
        }
    }

    None
}

fn classify_supervisor_failure(failure: SupervisorFailure, result: &AttemptResult) -> Classification {
    let mut detail = base_detail(result);
    match failure {
        SupervisorFailure::CommandNotFound => Classification {
            kind: ErrorKind::CommandNotFound,
            message: "vendor CLI binary was not found on PATH".to_string(),
            detail,
        },
        SupervisorFailure::IdleTimeout { idle_timeout_s } => {
            detail.idle_timeout_s = Some(idle_timeout_s);
            Classification {
                kind: ErrorKind::IdleTimeout,
                message: format!("no output for {idle_timeout_s}s (idle timeout)"),
                detail,
            }
        }
        SupervisorFailure::WallTimeout { wall_timeout_s } => {
            detail.max_duration_s = Some(wall_timeout_s);
            Classification {
                kind: ErrorKind::Timeout,
                message: format!("exceeded wall-clock timeout of {wall_timeout_s}s"),
                detail,
            }
        }
    }
}

fn base_detail(result: &AttemptResult) -> ErrorDetail {
    ErrorDetail {
        message: String::new(),
        exit_code: result.exit_code,
        last_lines: result.last_lines.clone(),
        json_decode_errors: (result.json_decode_errors > 0).then_some(result.json_decode_errors),
        idle_timeout_s: None,
        max_duration_s: None,
        retries: None,
    }
}

/// Whether `kind`, produced on `adapter`, should be retried (§4.4).
/// `command_not_found` and `auth_required` never retry; adapters with write
/// side effects never retry any kind, regardless of the caller's budget.
pub(crate) fn is_retryable(adapter: Adapter, kind: ErrorKind) -> bool {
    if adapter.has_write_side_effects() {
        return false;
    }
    !matches!(kind, ErrorKind::CommandNotFound | ErrorKind::AuthRequired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_result() -> AttemptResult {
        AttemptResult {
            session_id: Some("s-1".into()),
            result_text: "hello".into(),
            error_flag: false,
            error_kind: None,
            error_message: None,
            json_decode_errors: 0,
            last_lines: vec![],
            full_log: None,
            exit_code: Some(0),
            raw_line_count: 1,
            supervisor_failure: None,
        }
    }

    #[test]
    fn healthy_attempt_classifies_as_none() {
        assert!(classify(Adapter::Reviewer, &ok_result()).is_none());
    }

    #[test]
    fn missing_session_is_required_for_reviewer_but_not_generalist() {
        let mut result = ok_result();
        result.session_id = None;
        assert_eq!(
            classify(Adapter::Reviewer, &result).unwrap().kind,
            ErrorKind::ProtocolMissingSession
        );
        assert!(classify(Adapter::Generalist, &result).is_none());
    }

    #[test]
    fn empty_result_text_is_checked_after_session_id() {
        let mut result = ok_result();
        result.result_text = String::new();
        assert_eq!(
            classify(Adapter::Reviewer, &result).unwrap().kind,
            ErrorKind::EmptyResult
        );
    }

    #[test]
    fn nonzero_exit_code_is_last_criterion() {
        let mut result = ok_result();
        result.exit_code = Some(1);
        let classification = classify(Adapter::Reviewer, &result).unwrap();
        assert_eq!(classification.kind, ErrorKind::SubprocessError);
        assert_eq!(classification.detail.exit_code, Some(1));
    }

    #[test]
    fn error_flag_outranks_every_other_criterion() {
        let mut result = ok_result();
        result.result_text = String::new();
        result.session_id = None;
        result.error_flag = true;
        result.error_kind = Some(ErrorKind::AuthRequired);
        result.error_message = Some("401".into());
        let classification = classify(Adapter::Reviewer, &result).unwrap();
        assert_eq!(classification.kind, ErrorKind::AuthRequired);
    }

    #[test]
    fn command_not_found_and_auth_required_are_never_retryable() {
        assert!(!is_retryable(Adapter::Reviewer, ErrorKind::CommandNotFound));
        assert!(!is_retryable(Adapter::Reviewer, ErrorKind::AuthRequired));
        assert!(is_retryable(Adapter::Reviewer, ErrorKind::UpstreamError));
    }

    #[test]
    fn code_executor_never_retries_regardless_of_kind() {
        assert!(!is_retryable(Adapter::CodeExecutor, ErrorKind::UpstreamError));
        assert!(!is_retryable(Adapter::CodeExecutor, ErrorKind::EmptyResult));
    }
}
