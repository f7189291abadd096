use flowcore::{ConnectionType, NodeType};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// service name -> node type uid -> node type
pub type NodeTypeSnapshot = BTreeMap<String, BTreeMap<String, NodeType>>;
/// service name -> connection type uid -> connection type
pub type ConnTypeSnapshot = BTreeMap<String, BTreeMap<String, ConnectionType>>;

#[derive(Default)]
struct Catalogs {
    node_types: NodeTypeSnapshot,
    conn_types: ConnTypeSnapshot,
}

/// Node and connection types contributed by each discovered service.
///
/// Reads hand out full copies, so a refresh never shows through to a caller
/// holding an earlier snapshot.
#[derive(Default)]
pub struct FederationCache {
    inner: RwLock<Catalogs>,
}

impl FederationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert by uid within the service's namespace.
    pub async fn add_node_type(&self, service: &str, node_type: NodeType) {
        let mut inner = self.inner.write().await;
        inner
            .node_types
            .entry(service.to_string())
            .or_default()
            .insert(node_type.uid.clone(), node_type);
    }

    pub async fn add_conn_type(&self, service: &str, conn_type: ConnectionType) {
        let mut inner = self.inner.write().await;
        inner
            .conn_types
            .entry(service.to_string())
            .or_default()
            .insert(conn_type.uid.clone(), conn_type);
    }

    pub async fn get_node_types(&self) -> NodeTypeSnapshot {
        self.inner.read().await.node_types.clone()
    }

    pub async fn get_conn_types(&self) -> ConnTypeSnapshot {
        self.inner.read().await.conn_types.clone()
    }
}
