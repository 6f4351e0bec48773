use std::collections::VecDeque;

use ccg_core::ErrorKind;

const MAX_TAIL_LINES: usize = 20;

/// Per-attempt running state (§3). Discarded between retries — attempt *n*
/// must never leak state into attempt *n+1* (§8 I7).
#[derive(Debug, Default)]
pub struct AggregatorState {
    pub result_text: String,
    pub session_id: Option<String>,
    pub error_flag: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub json_decode_errors: u32,
    tail: VecDeque<String>,
    full_log: Option<Vec<serde_json::Value>>,
}

impl AggregatorState {
    pub fn new(capture_full_log: bool) -> Self {
        Self {
            full_log: capture_full_log.then(Vec::new),
            ..Default::default()
        }
    }

    pub fn last_lines(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }

    pub fn full_log(&self) -> Option<&[serde_json::Value]> {
        self.full_log.as_deref()
    }

    /// Step 1 of §4.3: append to the rolling tail, evicting the oldest entry
    /// once it exceeds 20 lines.
    fn push_tail(&mut self, line: &str) {
        if self.tail.len() == MAX_TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    /// Latch `kind` per the sticky auth > upstream > unexpected priority
    /// (§4.3, §8 I6). Any other kind simply sets the flag and kind directly,
    /// since the lattice only governs those three.
    pub fn set_error(&mut self, kind: ErrorKind) {
        self.set_error_with_message(kind, String::new());
    }

    /// Same latching rule as [`Self::set_error`], additionally recording the
    /// message that produced this classification so it can be surfaced
    /// verbatim in the result's `error` field.
    pub fn set_error_with_message(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.error_flag = true;
        match self.error_kind {
            Some(current) if !current.should_upgrade_to(kind) => {}
            _ => {
                self.error_kind = Some(kind);
                self.error_message = Some(message.into());
            }
        }
    }

    pub fn append_text(&mut self, text: &str) {
        self.result_text.push_str(text);
    }

    /// Process one raw line: tail, decode, and hand the decoded event to
    /// `route` for adapter-specific dispatch. Non-JSON chatter never counts
    /// as an agent response and never sets the error flag.
    pub fn ingest_line<R>(&mut self, line: &str, mut route: R)
    where
        R: FnMut(&mut AggregatorState, &serde_json::Value),
    {
        self.push_tail(line);

        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                self.json_decode_errors += 1;
                return;
            }
        };

        if let Some(log) = self.full_log.as_mut() {
            log.push(event.clone());
        }

        route(self, &event);
    }
}

/// Case-insensitive substring scan for known authentication failure phrases
/// (§4.3).
pub fn looks_like_auth_error(message: &str) -> bool {
    const NEEDLES: &[&str] = &[
        "waiting for auth",
        "failed to login",
        "precondition check failed",
        "authentication",
        "401",
        "403",
        "unauthorized",
        "not authenticated",
        "login required",
        "sign in",
        "oauth",
    ];
    let lower = message.to_lowercase();
    NEEDLES.iter().any(|needle| lower.contains(needle))
}

/// True when `message` is transient reconnect noise that must not set the
/// error flag (§4.3).
pub fn is_transient_reconnect_noise(message: &str) -> bool {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| regex::Regex::new(r"^Reconnecting\.\.\.\s+\d+/\d+$").unwrap());
    re.is_match(message)
}

/// Shared error-event classification used by every adapter's `error` routing
/// branch: transient reconnect noise is swallowed, auth phrases latch
/// `auth_required`, anything else latches `upstream_error`.
pub fn classify_error_message(state: &mut AggregatorState, message: &str) {
    if is_transient_reconnect_noise(message) {
        return;
    }
    if looks_like_auth_error(message) {
        state.set_error_with_message(ErrorKind::AuthRequired, message);
    } else {
        state.set_error_with_message(ErrorKind::UpstreamError, message);
    }
}
