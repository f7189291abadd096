//! Wire types of the worker catalog surface.

use crate::{NodeState, PortMap, Vars};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNodeRequest {
    /// Node type uid to run.
    pub node_id: String,
    #[serde(default)]
    pub inputs: PortMap,
    #[serde(default)]
    pub vars: Vars,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNodeResponse {
    #[serde(default)]
    pub outputs: PortMap,
    pub state: NodeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunNodeResponse {
    pub fn success(outputs: PortMap) -> Self {
        Self {
            outputs,
            state: NodeState::Success,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            outputs: PortMap::new(),
            state: NodeState::Failed,
            error: Some(error.into()),
        }
    }
}
