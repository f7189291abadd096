// crates/flowcore/src/events/mod.rs

mod base;

pub use base::{EventEmitter, EventBus, ExecutionEvent, NodeEvent, ExecutionId};
