//! Subprocess supervision: spawning, the dual-timeout event loop, and the
//! terminate-then-kill cleanup ladder.

mod reader;
mod supervisor;

pub use reader::SentinelPredicate;
pub use supervisor::{run, ChildSpec, StdinDisposition, SupervisorFailure, SupervisorOutcome};
