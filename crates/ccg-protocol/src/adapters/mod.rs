mod code_executor;
mod generalist;
mod reviewer;

use std::collections::HashMap;
use std::sync::Arc;

use ccg_core::{Adapter, InvocationRequest};
use ccg_process::ChildSpec;

use crate::aggregator::AggregatorState;

/// The per-vendor module (§4.5): builds the child invocation and owns the
/// event-routing rule set for that vendor's protocol dialect.
pub trait AdapterSpec: Send + Sync {
    fn kind(&self) -> Adapter;

    /// Build the fully resolved child invocation. `env_overlay` carries
    /// config-derived extras (credentials, model aliases); adapters that
    /// don't need them (reviewer, generalist) ignore it.
    fn build_child_spec(&self, req: &InvocationRequest, env_overlay: &HashMap<String, String>) -> ChildSpec;

    /// Dispatch one decoded event, updating `state` in place (§4.3 step 3).
    fn route_event(&self, state: &mut AggregatorState, event: &serde_json::Value);
}

/// Flatten newlines in an argv-delivered prompt to the literal two-character
/// sequence `\n`, avoiding shell truncation on path-separator ';' hosts
/// (§4.5, §9). This is a workaround for those hosts' shell, not a semantic
/// transform; `tokio::process::Command` spawns with no shell on Unix, so a
/// real newline reaches the child untouched there. Only adapters that
/// deliver the prompt positionally need this at all.
pub(crate) fn escape_argv_prompt(prompt: &str) -> String {
    if cfg!(windows) {
        prompt.replace('\n', "\\n")
    } else {
        prompt.to_string()
    }
}

pub(crate) fn sentinel(types: &'static [&'static str]) -> Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync> {
    Arc::new(move |event: &serde_json::Value| {
        event
            .get("type")
            .and_then(|t| t.as_str())
            .is_some_and(|t| types.contains(&t))
    })
}

pub fn adapter_for(kind: Adapter) -> Box<dyn AdapterSpec> {
    match kind {
        Adapter::CodeExecutor => Box::new(code_executor::CodeExecutorAdapter),
        Adapter::Reviewer => Box::new(reviewer::ReviewerAdapter),
        Adapter::Generalist => Box::new(generalist::GeneralistAdapter),
    }
}
