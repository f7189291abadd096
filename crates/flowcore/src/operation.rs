use crate::{events::EventEmitter, NodeError, PortMap};
use async_trait::async_trait;
use std::collections::HashMap;

/// Variables shared by every operation of one run.
pub type Vars = HashMap<String, serde_json::Value>;

/// Behavior behind a node type.
///
/// Every node kind provides one implementation; the executor only ever sees
/// this contract.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Execute with resolved inputs, returning the values of output ports.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        inputs: &PortMap,
        vars: &mut Vars,
    ) -> Result<PortMap, NodeError>;
}

/// Per-node context handed to an operation.
#[derive(Clone)]
pub struct ExecutionContext {
    pub workflow_id: String,
    pub node_id: String,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Fired when the run is abandoned. Long-running operations should stop
    /// and return [`NodeError::Cancelled`].
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl ExecutionContext {
    pub fn new(workflow_id: impl Into<String>, node_id: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            node_id: node_id.into(),
            events,
            cancellation: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Share the run's cancellation token instead of a private one.
    pub fn with_cancellation(mut self, token: tokio_util::sync::CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(workflow = %self.workflow_id, node = %self.node_id, "{}", message);
        self.events.info(message);
    }

    /// Get a required input or fail with [`NodeError::MissingInput`].
    pub fn require<'a>(&self, inputs: &'a PortMap, name: &str) -> Result<&'a crate::Payload, NodeError> {
        inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }
}
