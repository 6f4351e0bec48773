//! Canned operator-facing hint prepended to auth failures (§7).

pub const AUTH_HINT: &str = "\
hint: the vendor CLI reported an authentication failure.
  - Run the CLI's own login flow outside this bridge (e.g. `claude /login`, `codex login`, or `gemini auth`).
  - For the code-executor adapter, check `coder.api_token` in ~/.ccg-mcp/config.toml or CODER_API_TOKEN.
  - Re-run once authenticated; this error is not retried automatically.
";

pub fn prepend_to(message: &str) -> String {
    format!("{AUTH_HINT}\n{message}")
}
