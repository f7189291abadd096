use crate::{NodeId, PortMap, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    WorkflowStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    WorkflowCompleted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        outputs: PortMap,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeEvent {
        execution_id: ExecutionId,
        node_id: NodeId,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Messages an operation publishes while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
}

/// Where an operation's log lines go: the run's bus, or nowhere when the
/// operation runs outside a coordinator (e.g. on a worker).
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: NodeId,
    sink: Option<broadcast::Sender<ExecutionEvent>>,
}

impl EventEmitter {
    fn attached(execution_id: ExecutionId, node_id: NodeId, sink: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            execution_id,
            node_id,
            sink: Some(sink),
        }
    }

    pub fn detached(node_id: impl Into<NodeId>) -> Self {
        Self {
            execution_id: ExecutionId::nil(),
            node_id: node_id.into(),
            sink: None,
        }
    }

    pub fn emit(&self, event: NodeEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        // a run nobody listens to is fine
        let _ = sink.send(ExecutionEvent::NodeEvent {
            execution_id: self.execution_id,
            node_id: self.node_id.clone(),
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info { message: message.into() });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning { message: message.into() });
    }
}

/// Broadcast bus shared by every run of a runtime
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    /// Emitter tagging every event with one run and one node.
    pub fn create_emitter(&self, execution_id: ExecutionId, node_id: impl Into<NodeId>) -> EventEmitter {
        EventEmitter::attached(execution_id, node_id.into(), self.sender.clone())
    }
}
