//! Core abstractions for the flow engine
//!
//! Data model shared by the registry, the coordinator and the workers:
//! workflow graphs and their validation, node/connection types, the
//! operation contract, registry membership records and wire types.

mod error;
pub mod events;
mod operation;
mod payload;
mod service;
mod types;
pub mod worker;
mod workflow;

pub use error::{FlowError, NodeError, WorkflowError};
pub use operation::{ExecutionContext, Operation, Vars};
pub use payload::Payload;
pub use service::{Lease, Query, ServiceInstance, Services};
pub use types::{ConnectionType, Endpoint, NodeType, Port, PortMap, INPUTS, OUTPUTS};
pub use workflow::{
    Connection, Dag, Node, NodeId, NodeState, RawConnection, RawNode, RawWorkflow, Workflow,
    WorkflowId, WorkflowSubmission,
};
pub use events::*;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
