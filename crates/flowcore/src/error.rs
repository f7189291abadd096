use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Input resolution failed for node {node}: no upstream output satisfies port '{port}'")]
    InputResolution { node: String, port: String },

    #[error("Node {node} failed: {source}")]
    Operation {
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("Execution error: {0}")]
    Execution(String),
}

/// Errors raised by an [`Operation`](crate::Operation) while executing a node.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("No operation bound to node type {0}")]
    Unbound(String),

    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Workflow must contain at least one node and one connection")]
    EmptyWorkflow,

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Node {node} references undefined node type {type_id}")]
    UnknownNodeType { node: String, type_id: String },

    #[error("Node {node} pins input '{port}' which its node type does not declare")]
    UndeclaredInput { node: String, port: String },

    #[error("Connection {connection} references undefined connection type {type_id}")]
    UnknownConnectionType { connection: String, type_id: String },

    #[error("Connection {connection} references unknown {side} node {node}")]
    NodeNotFound {
        connection: String,
        side: &'static str,
        node: String,
    },

    #[error("Connection {connection} references unknown {direction} port '{port}' in node {node}")]
    UndeclaredPort {
        connection: String,
        direction: &'static str,
        node: String,
        port: String,
    },

    #[error("Cyclic dependency detected")]
    CyclicDependency,
}

