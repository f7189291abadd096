use flowcore::{NodeState, PortMap, Workflow, WorkflowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Success,
    Failed,
    Pending,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::Success => "success",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// Per-node view in a result snapshot, with port values rendered as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub id: String,
    pub label: String,
    pub state: NodeState,
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
}

/// Snapshot of a workflow after (or during) a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub nodes: Vec<NodeResult>,
}

impl WorkflowResult {
    pub fn collect(workflow: &Workflow) -> Self {
        let nodes: Vec<NodeResult> = workflow
            .dag
            .nodes
            .values()
            .map(|node| NodeResult {
                id: node.id.clone(),
                label: node.label.clone(),
                state: node.state,
                inputs: render(&node.inputs),
                outputs: render(&node.outputs),
            })
            .collect();

        let status = if nodes.iter().any(|n| n.state == NodeState::Failed) {
            WorkflowStatus::Failed
        } else if nodes.iter().all(|n| n.state == NodeState::Success) {
            WorkflowStatus::Success
        } else {
            WorkflowStatus::Pending
        };

        Self {
            workflow_id: workflow.id.clone(),
            status,
            nodes,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeResult> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

fn render(ports: &PortMap) -> BTreeMap<String, String> {
    ports
        .iter()
        .map(|(port, value)| (port.clone(), value.to_string()))
        .collect()
}
