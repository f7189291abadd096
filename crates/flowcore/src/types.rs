use crate::{Operation, Payload};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Port values keyed by port name.
pub type PortMap = BTreeMap<String, Payload>;

pub const INPUTS: &str = "inputs";
pub const OUTPUTS: &str = "outputs";

/// A named, typed slot declared by a node type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    #[serde(default)]
    pub label: String,
    /// e.g. "connection", "file"
    pub port_type: String,
}

impl Port {
    pub fn new(name: impl Into<String>, label: impl Into<String>, port_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            port_type: port_type.into(),
        }
    }

    pub fn connection(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, "connection")
    }
}

/// One side of a connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node_id: String,
    pub port_name: String,
}

impl Endpoint {
    pub fn new(node_id: impl Into<String>, port_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port_name: port_name.into(),
        }
    }
}

/// Node template: ports by direction plus the operation that does the work.
///
/// The operation never crosses the wire. Types fetched from a worker arrive
/// unbound and are bound by whoever assembles the executable catalog.
#[derive(Clone, Serialize, Deserialize)]
pub struct NodeType {
    pub uid: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub properties: HashMap<String, Vec<Port>>,
    #[serde(skip)]
    pub operation: Option<Arc<dyn Operation>>,
}

impl NodeType {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            category: String::new(),
            note: String::new(),
            properties: HashMap::new(),
            operation: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_input(mut self, port: Port) -> Self {
        self.properties.entry(INPUTS.to_string()).or_default().push(port);
        self
    }

    pub fn with_output(mut self, port: Port) -> Self {
        self.properties.entry(OUTPUTS.to_string()).or_default().push(port);
        self
    }

    pub fn with_operation(mut self, operation: Arc<dyn Operation>) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn input_ports(&self) -> &[Port] {
        self.properties.get(INPUTS).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn output_ports(&self) -> &[Port] {
        self.properties.get(OUTPUTS).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn declares_input(&self, port: &str) -> bool {
        self.input_ports().iter().any(|p| p.name == port)
    }

    pub fn declares_output(&self, port: &str) -> bool {
        self.output_ports().iter().any(|p| p.name == port)
    }

    pub fn is_bound(&self) -> bool {
        self.operation.is_some()
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("uid", &self.uid)
            .field("category", &self.category)
            .field("note", &self.note)
            .field("properties", &self.properties)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Semantics of a link and which port types it may join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionType {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub allowed_port_types: Vec<String>,
}
