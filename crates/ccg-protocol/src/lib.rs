//! Event decoding, per-attempt state aggregation, and the three vendor adapters.

pub mod adapters;
mod aggregator;

pub use aggregator::AggregatorState;
pub use adapters::{adapter_for, AdapterSpec};
