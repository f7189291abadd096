use crate::federation::{ConnTypeSnapshot, NodeTypeSnapshot};
use flowcore::{ConnectionType, NodeType, Workflow};
use std::collections::HashMap;

/// Flat uid -> type view a workflow is validated and executed against
#[derive(Clone, Default)]
pub struct Catalog {
    node_types: HashMap<String, NodeType>,
    connection_types: HashMap<String, ConnectionType>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten federated snapshots. `bind` gets a chance to attach an
    /// operation to every node type together with the service it came from.
    /// A uid offered by several services resolves to the one whose name
    /// sorts last.
    pub fn from_snapshots<F>(nodes: NodeTypeSnapshot, conns: ConnTypeSnapshot, mut bind: F) -> Self
    where
        F: FnMut(&str, NodeType) -> NodeType,
    {
        let mut catalog = Self::new();
        for (service, types) in nodes {
            for node_type in types.into_values() {
                catalog.register_node_type(bind(&service, node_type));
            }
        }
        for conn_type in conns.into_values().flat_map(|types| types.into_values()) {
            catalog.register_connection_type(conn_type);
        }
        catalog
    }

    pub fn register_node_type(&mut self, node_type: NodeType) {
        tracing::debug!("Registering node type: {}", node_type.uid);
        self.node_types.insert(node_type.uid.clone(), node_type);
    }

    pub fn register_connection_type(&mut self, conn_type: ConnectionType) {
        self.connection_types.insert(conn_type.uid.clone(), conn_type);
    }

    pub fn node_type(&self, uid: &str) -> Option<&NodeType> {
        self.node_types.get(uid)
    }

    /// Attach this catalog's dictionaries to a workflow.
    pub fn apply(&self, workflow: Workflow) -> Workflow {
        workflow
            .with_node_types(self.node_types.values().cloned())
            .with_connection_types(self.connection_types.values().cloned())
    }
}
