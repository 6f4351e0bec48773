//! Actionable hints for `config validate` failures, in the teacher's
//! `error_hints`-style idiom (one match arm per known failure, each with a
//! concrete fix command).

use ccg_core::AppError;

pub fn suggest_fix(err: &AppError) -> Option<&'static str> {
    match err {
        AppError::MissingApiToken => Some(
            "hint: set coder.api_token in ~/.ccg-mcp/config.toml, or export CODER_API_TOKEN",
        ),
        AppError::ConfigParse { .. } => {
            Some("hint: ~/.ccg-mcp/config.toml is not valid TOML; check for unescaped quotes or missing brackets")
        }
        AppError::CommandNotFound(_) => {
            Some("hint: install the vendor CLI and ensure it is on PATH")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_has_a_hint() {
        assert!(suggest_fix(&AppError::MissingApiToken).is_some());
    }

    #[test]
    fn unknown_tool_has_no_hint() {
        assert!(suggest_fix(&AppError::UnknownTool("x".into())).is_none());
    }
}
