use crate::dag::TopologicalSort;
use chrono::Utc;
use flowcore::{
    Dag, EventBus, ExecutionContext, ExecutionEvent, ExecutionId, FlowError, NodeError,
    NodeState, PortMap, Vars, Workflow, WorkflowError,
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs a workflow one node at a time in topological order.
///
/// Independent branches are not run concurrently. The first failing node
/// aborts the run; nodes after it stay `pending`. Cancellation is checked
/// before each node starts.
pub struct WorkflowExecutor;

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a workflow in place. Node states, resolved inputs and outputs
    /// are written back onto `workflow.dag`.
    pub async fn execute(
        &self,
        workflow: &mut Workflow,
        event_bus: &EventBus,
        vars: &mut Vars,
    ) -> Result<ExecutionResult, FlowError> {
        self.execute_until(workflow, event_bus, vars, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but stops once `cancel` fires. The
    /// node that would have run next stays `pending` and the run fails with
    /// [`NodeError::Cancelled`].
    pub async fn execute_until(
        &self,
        workflow: &mut Workflow,
        event_bus: &EventBus,
        vars: &mut Vars,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, FlowError> {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_id: workflow.id.clone(),
            timestamp: Utc::now(),
        });

        tracing::info!("Starting workflow execution: {}", workflow.id);

        let result = self
            .run_nodes(workflow, event_bus, execution_id, vars, cancel)
            .await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            workflow_id: workflow.id.clone(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match &result {
            Ok(r) => tracing::info!(
                "Workflow {} completed: {}/{} nodes in {}ms",
                workflow.id,
                r.completed_nodes,
                r.total_nodes,
                duration_ms
            ),
            Err(e) => tracing::error!("Workflow {} aborted: {}", workflow.id, e),
        }

        result
    }

    async fn run_nodes(
        &self,
        workflow: &mut Workflow,
        event_bus: &EventBus,
        execution_id: ExecutionId,
        vars: &mut Vars,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, FlowError> {
        let order = workflow.topological_sort()?;
        let mut completed = 0;

        for node_id in &order {
            if cancel.is_cancelled() {
                tracing::warn!("Workflow {} cancelled before node {}", workflow.id, node_id);
                return Err(FlowError::Operation {
                    node: node_id.clone(),
                    source: NodeError::Cancelled,
                });
            }

            let node = workflow
                .dag
                .node(node_id)
                .ok_or_else(|| FlowError::Execution(format!("node {node_id} vanished from the graph")))?;
            let node_type = workflow.node_types.get(&node.type_id).ok_or_else(|| {
                WorkflowError::UnknownNodeType {
                    node: node_id.clone(),
                    type_id: node.type_id.clone(),
                }
            })?;
            let type_uid = node_type.uid.clone();
            let operation = node_type.operation.clone();
            let declared: Vec<String> = node_type.input_ports().iter().map(|p| p.name.clone()).collect();

            let inputs = match resolve_inputs(&workflow.dag, node_id, &declared) {
                Ok(inputs) => inputs,
                Err(e) => {
                    fail_node(workflow, event_bus, execution_id, node_id, &e);
                    return Err(e);
                }
            };
            if let Some(node) = workflow.dag.nodes.get_mut(node_id) {
                node.inputs = inputs.clone();
            }

            event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: node_id.clone(),
                node_type: type_uid.clone(),
                timestamp: Utc::now(),
            });

            let ctx = ExecutionContext::new(
                workflow.id.clone(),
                node_id.clone(),
                event_bus.create_emitter(execution_id, node_id.clone()),
            )
            .with_cancellation(cancel.clone());

            let start = Instant::now();
            let outcome = match operation {
                Some(op) => op.execute(&ctx, &inputs, vars).await,
                None => Err(NodeError::Unbound(type_uid)),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(outputs) => {
                    tracing::debug!("Node {} completed in {}ms", node_id, duration_ms);

                    event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: node_id.clone(),
                        outputs: outputs.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });

                    if let Some(node) = workflow.dag.nodes.get_mut(node_id) {
                        node.outputs = outputs;
                        node.state = NodeState::Success;
                    }
                    completed += 1;
                }
                Err(source) => {
                    let err = FlowError::Operation {
                        node: node_id.clone(),
                        source,
                    };
                    fail_node(workflow, event_bus, execution_id, node_id, &err);
                    return Err(err);
                }
            }
        }

        Ok(ExecutionResult {
            execution_id,
            completed_nodes: completed,
            total_nodes: workflow.dag.nodes.len(),
        })
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect inputs for a node: pinned values first, then for every other
/// declared port the output of some successful upstream node wired to it.
fn resolve_inputs(dag: &Dag, node_id: &str, declared: &[String]) -> Result<PortMap, FlowError> {
    let node = dag
        .node(node_id)
        .ok_or_else(|| FlowError::Execution(format!("node {node_id} vanished from the graph")))?;
    let mut inputs = node.inputs.clone();

    for port in declared {
        if inputs.contains_key(port) {
            continue;
        }

        let value = dag.incoming(node_id, port).find_map(|conn| {
            dag.node(&conn.from.node_id)
                .filter(|source| source.state == NodeState::Success)
                .and_then(|source| source.outputs.get(&conn.from.port_name))
                .cloned()
        });

        match value {
            Some(value) => {
                inputs.insert(port.clone(), value);
            }
            None => {
                return Err(FlowError::InputResolution {
                    node: node_id.to_string(),
                    port: port.clone(),
                })
            }
        }
    }

    Ok(inputs)
}

fn fail_node(
    workflow: &mut Workflow,
    event_bus: &EventBus,
    execution_id: ExecutionId,
    node_id: &str,
    err: &FlowError,
) {
    tracing::error!("Node {} failed: {}", node_id, err);

    if let Some(node) = workflow.dag.nodes.get_mut(node_id) {
        node.state = NodeState::Failed;
    }

    event_bus.emit(ExecutionEvent::NodeFailed {
        execution_id,
        node_id: node_id.to_string(),
        error: err.to_string(),
        timestamp: Utc::now(),
    });
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub completed_nodes: usize,
    pub total_nodes: usize,
}
