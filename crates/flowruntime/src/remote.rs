use crate::{FederationError, RoundRobinSelector, WorkerClient};
use async_trait::async_trait;
use flowcore::worker::RunNodeRequest;
use flowcore::{ExecutionContext, NodeError, NodeState, Operation, PortMap, Vars};
use std::sync::Arc;

/// Runs a federated node type on one of the instances of the service that
/// contributed it.
pub struct RemoteOperation {
    service: String,
    node_type: String,
    selector: Arc<RoundRobinSelector>,
    client: WorkerClient,
}

impl RemoteOperation {
    pub fn new(
        service: impl Into<String>,
        node_type: impl Into<String>,
        selector: Arc<RoundRobinSelector>,
        client: WorkerClient,
    ) -> Self {
        Self {
            service: service.into(),
            node_type: node_type.into(),
            selector,
            client,
        }
    }
}

#[async_trait]
impl Operation for RemoteOperation {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        inputs: &PortMap,
        vars: &mut Vars,
    ) -> Result<PortMap, NodeError> {
        let instance = self
            .selector
            .get_next(&self.service)
            .await
            .ok_or_else(|| FederationError::NoInstance(self.service.clone()))
            .map_err(|e| NodeError::ExecutionFailed(e.to_string()))?;

        ctx.log(format!(
            "dispatching {} to {} ({})",
            self.node_type, instance.id, instance.address
        ));

        let request = RunNodeRequest {
            node_id: self.node_type.clone(),
            inputs: inputs.clone(),
            vars: vars.clone(),
        };
        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
            response = self.client.run_node(&instance, &request) => {
                response.map_err(|e| NodeError::ExecutionFailed(e.to_string()))?
            }
        };

        match response.state {
            NodeState::Success => Ok(response.outputs),
            _ => {
                let message = response
                    .error
                    .unwrap_or_else(|| format!("worker {} reported failure", instance.id));
                ctx.events.warn(format!("{} failed on {}: {}", self.node_type, instance.id, message));
                Err(NodeError::ExecutionFailed(message))
            }
        }
    }
}
