use crate::{ConnectionType, Endpoint, NodeType, Payload, PortMap, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type WorkflowId = String;
pub type NodeId = String;

/// Execution state of a node within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    #[default]
    Pending,
    Success,
    Failed,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Success => "success",
            NodeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A node instance inside a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub type_id: String,
    pub label: String,
    pub state: NodeState,
    pub inputs: PortMap,
    pub outputs: PortMap,
}

impl Node {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            label: label.into(),
            state: NodeState::Pending,
            inputs: PortMap::new(),
            outputs: PortMap::new(),
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<Payload>) -> Self {
        self.inputs.insert(port.into(), value.into());
        self
    }
}

/// Directed edge between an output port and an input port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: String,
    pub type_id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

/// Graph structure of a workflow.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    pub nodes: BTreeMap<NodeId, Node>,
    pub connections: Vec<Connection>,
}

impl Dag {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Connections whose target is `(node_id, port)`.
    pub fn incoming<'a>(&'a self, node_id: &'a str, port: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.to.node_id == node_id && c.to.port_name == port)
    }
}

/// Raw node as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<PortMap>,
}

/// Raw connection as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConnection {
    #[serde(rename = "connection_id")]
    pub id: String,
    pub connection_type: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWorkflow {
    pub nodes: Vec<RawNode>,
    pub connections: Vec<RawConnection>,
}

/// Body of a workflow submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSubmission {
    pub uid: WorkflowId,
    pub workflow: RawWorkflow,
}

/// A DAG together with the type dictionaries it is checked against.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: WorkflowId,
    pub dag: Dag,
    pub node_types: HashMap<String, NodeType>,
    pub connection_types: HashMap<String, ConnectionType>,
}

impl Workflow {
    /// Build the DAG from a raw description. Pinned inputs land on the node
    /// immediately.
    pub fn from_raw(id: impl Into<String>, raw: RawWorkflow) -> Result<Self, WorkflowError> {
        let mut dag = Dag::default();

        for n in raw.nodes {
            if dag.nodes.contains_key(&n.id) {
                return Err(WorkflowError::DuplicateNode(n.id));
            }
            let mut node = Node::new(n.id.clone(), n.node_type, n.label);
            if let Some(inputs) = n.inputs {
                node.inputs = inputs;
            }
            dag.nodes.insert(n.id, node);
        }

        dag.connections = raw
            .connections
            .into_iter()
            .map(|c| Connection {
                id: c.id,
                type_id: c.connection_type,
                from: c.from,
                to: c.to,
            })
            .collect();

        Ok(Self {
            id: id.into(),
            dag,
            node_types: HashMap::new(),
            connection_types: HashMap::new(),
        })
    }

    pub fn with_node_types(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.node_types
            .extend(types.into_iter().map(|t| (t.uid.clone(), t)));
        self
    }

    pub fn with_connection_types(mut self, types: impl IntoIterator<Item = ConnectionType>) -> Self {
        self.connection_types
            .extend(types.into_iter().map(|t| (t.uid.clone(), t)));
        self
    }

    /// Structural check against the type dictionaries. Stops at the first
    /// violation.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.dag.nodes.is_empty() || self.dag.connections.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }

        for (node_id, node) in &self.dag.nodes {
            let node_type = self.node_types.get(&node.type_id).ok_or_else(|| {
                WorkflowError::UnknownNodeType {
                    node: node_id.clone(),
                    type_id: node.type_id.clone(),
                }
            })?;

            if let Some(port) = node.inputs.keys().find(|p| !node_type.declares_input(p)) {
                return Err(WorkflowError::UndeclaredInput {
                    node: node_id.clone(),
                    port: port.clone(),
                });
            }
        }

        for conn in &self.dag.connections {
            if !self.connection_types.contains_key(&conn.type_id) {
                return Err(WorkflowError::UnknownConnectionType {
                    connection: conn.id.clone(),
                    type_id: conn.type_id.clone(),
                });
            }

            let source = self.endpoint_node(conn, &conn.from, "source")?;
            let target = self.endpoint_node(conn, &conn.to, "target")?;

            // Both nodes passed the type check above.
            let source_declares = self
                .node_types
                .get(&source.type_id)
                .is_some_and(|t| t.declares_output(&conn.from.port_name));
            if !source_declares {
                return Err(WorkflowError::UndeclaredPort {
                    connection: conn.id.clone(),
                    direction: "output",
                    node: conn.from.node_id.clone(),
                    port: conn.from.port_name.clone(),
                });
            }

            let target_declares = self
                .node_types
                .get(&target.type_id)
                .is_some_and(|t| t.declares_input(&conn.to.port_name));
            if !target_declares {
                return Err(WorkflowError::UndeclaredPort {
                    connection: conn.id.clone(),
                    direction: "input",
                    node: conn.to.node_id.clone(),
                    port: conn.to.port_name.clone(),
                });
            }
        }

        Ok(())
    }

    fn endpoint_node(
        &self,
        conn: &Connection,
        endpoint: &Endpoint,
        side: &'static str,
    ) -> Result<&Node, WorkflowError> {
        self.dag
            .nodes
            .get(&endpoint.node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound {
                connection: conn.id.clone(),
                side,
                node: endpoint.node_id.clone(),
            })
    }
}
