use crate::{connection_types, node_types};
use flowcore::worker::{RunNodeRequest, RunNodeResponse};
use flowcore::{events::EventEmitter, ConnectionType, ExecutionContext, NodeType};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Worker side of the catalog surface: lists what it offers and runs single
/// nodes on request.
pub struct WorkerService {
    service: String,
    node_types: BTreeMap<String, NodeType>,
    connection_types: Vec<ConnectionType>,
}

impl WorkerService {
    /// A worker offering the built-in operations under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self::with_catalog(service.clone(), node_types(&service), connection_types())
    }

    pub fn with_catalog(
        service: impl Into<String>,
        node_types: impl IntoIterator<Item = NodeType>,
        connection_types: Vec<ConnectionType>,
    ) -> Self {
        Self {
            service: service.into(),
            node_types: node_types.into_iter().map(|t| (t.uid.clone(), t)).collect(),
            connection_types,
        }
    }

    pub fn get_node_types(&self) -> Vec<NodeType> {
        self.node_types.values().cloned().collect()
    }

    pub fn get_conn_types(&self) -> Vec<ConnectionType> {
        self.connection_types.clone()
    }

    /// Run one node. Failures are reported in the response, never as a
    /// transport error.
    pub async fn run_node(&self, request: RunNodeRequest) -> RunNodeResponse {
        let Some(operation) = self
            .node_types
            .get(&request.node_id)
            .and_then(|t| t.operation.clone())
        else {
            warn!("RunNode for unknown node type {}", request.node_id);
            return RunNodeResponse::failed(format!("unknown node type: {}", request.node_id));
        };

        let ctx = ExecutionContext::new(
            self.service.clone(),
            request.node_id.clone(),
            EventEmitter::detached(request.node_id.clone()),
        );
        let mut vars = request.vars;

        match operation.execute(&ctx, &request.inputs, &mut vars).await {
            Ok(outputs) => {
                debug!("{} produced {} output(s)", request.node_id, outputs.len());
                RunNodeResponse::success(outputs)
            }
            Err(e) => {
                warn!("{} failed: {}", request.node_id, e);
                RunNodeResponse::failed(e.to_string())
            }
        }
    }
}
