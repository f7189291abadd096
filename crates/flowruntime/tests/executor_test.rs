// crates/flowruntime/tests/executor_test.rs

use async_trait::async_trait;
use flowcore::{
    ConnectionType, Endpoint, EventBus, ExecutionContext, ExecutionEvent, FlowError, NodeError,
    NodeState, NodeType, Operation, Payload, Port, PortMap, RawConnection, RawNode, RawWorkflow,
    Vars, Workflow, WorkflowError,
};
use flowruntime::{WorkflowExecutor, WorkflowResult, WorkflowStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct AddOperation;

#[async_trait]
impl Operation for AddOperation {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        let a = ctx.require(inputs, "a")?.as_i64().ok_or_else(|| NodeError::InvalidInput {
            field: "a".to_string(),
            reason: "not an integer".to_string(),
        })?;
        let b = ctx.require(inputs, "b")?.as_i64().ok_or_else(|| NodeError::InvalidInput {
            field: "b".to_string(),
            reason: "not an integer".to_string(),
        })?;
        Ok(PortMap::from([("sum".to_string(), Payload::from(a + b))]))
    }
}

struct FailingOperation;

#[async_trait]
impl Operation for FailingOperation {
    async fn execute(&self, _ctx: &ExecutionContext, _inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        Err(NodeError::ExecutionFailed("boom".to_string()))
    }
}

/// Passes `input` through and counts invocations in the shared vars.
struct CountingEcho;

#[async_trait]
impl Operation for CountingEcho {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, vars: &mut Vars) -> Result<PortMap, NodeError> {
        let seen = vars.get("calls").and_then(|v| v.as_u64()).unwrap_or(0);
        vars.insert("calls".to_string(), serde_json::json!(seen + 1));
        let input = ctx.require(inputs, "input")?.clone();
        Ok(PortMap::from([("output".to_string(), input)]))
    }
}

/// Passes `input` through, then abandons the run.
struct StopAfter;

#[async_trait]
impl Operation for StopAfter {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        let input = ctx.require(inputs, "input")?.clone();
        ctx.cancellation.cancel();
        Ok(PortMap::from([("output".to_string(), input)]))
    }
}

fn add_type() -> NodeType {
    NodeType::new("Add")
        .with_input(Port::connection("a", "A"))
        .with_input(Port::connection("b", "B"))
        .with_output(Port::connection("sum", "Sum"))
        .with_operation(Arc::new(AddOperation))
}

fn echo_type(uid: &str, op: Arc<dyn Operation>) -> NodeType {
    NodeType::new(uid)
        .with_input(Port::connection("input", "Input"))
        .with_output(Port::connection("output", "Output"))
        .with_operation(op)
}

fn data_flow() -> ConnectionType {
    ConnectionType {
        uid: "data_flow".to_string(),
        name: "data_flow".to_string(),
        description: String::new(),
        color: String::new(),
        allowed_port_types: vec!["connection".to_string()],
    }
}

fn raw_node(id: &str, node_type: &str, pinned: &[(&str, &str)]) -> RawNode {
    RawNode {
        id: id.to_string(),
        node_type: node_type.to_string(),
        label: format!("{id} label"),
        inputs: if pinned.is_empty() {
            None
        } else {
            Some(
                pinned
                    .iter()
                    .map(|(k, v)| (k.to_string(), Payload::from(*v)))
                    .collect(),
            )
        },
    }
}

fn raw_link(id: &str, from: (&str, &str), to: (&str, &str)) -> RawConnection {
    RawConnection {
        id: id.to_string(),
        connection_type: "data_flow".to_string(),
        from: Endpoint::new(from.0, from.1),
        to: Endpoint::new(to.0, to.1),
    }
}

fn workflow(raw: RawWorkflow) -> Workflow {
    Workflow::from_raw("wf-test", raw)
        .unwrap()
        .with_node_types([
            add_type(),
            echo_type("Echo", Arc::new(CountingEcho)),
            echo_type("Fail", Arc::new(FailingOperation)),
            echo_type("Stop", Arc::new(StopAfter)),
        ])
        .with_connection_types([data_flow()])
}

async fn run(wf: &mut Workflow) -> (Result<flowruntime::ExecutionResult, FlowError>, Vars) {
    let bus = EventBus::new(100);
    let mut vars = Vars::new();
    let result = WorkflowExecutor::new().execute(wf, &bus, &mut vars).await;
    (result, vars)
}

#[tokio::test]
async fn test_pinned_add_produces_sum() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("add", "Add", &[("a", "10"), ("b", "20")]),
            raw_node("echo", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("add", "sum"), ("echo", "input"))],
    });
    wf.validate().unwrap();

    let (result, _) = run(&mut wf).await;
    let result = result.unwrap();
    assert_eq!(result.completed_nodes, 2);

    let add = &wf.dag.nodes["add"];
    assert_eq!(add.state, NodeState::Success);
    assert_eq!(add.outputs["sum"].as_str(), Some("30"));
}

#[tokio::test]
async fn test_outputs_flow_downstream() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("add", "Add", &[("a", "2"), ("b", "3")]),
            raw_node("e1", "Echo", &[]),
            raw_node("e2", "Echo", &[]),
        ],
        connections: vec![
            raw_link("c1", ("add", "sum"), ("e1", "input")),
            raw_link("c2", ("e1", "output"), ("e2", "input")),
        ],
    });

    let (result, vars) = run(&mut wf).await;
    result.unwrap();

    assert_eq!(wf.dag.nodes["e1"].inputs["input"].as_str(), Some("5"));
    assert_eq!(wf.dag.nodes["e2"].outputs["output"].as_str(), Some("5"));
    // both echo nodes saw the same vars map
    assert_eq!(vars["calls"], serde_json::json!(2));

    let snapshot = WorkflowResult::collect(&wf);
    assert_eq!(snapshot.status, WorkflowStatus::Success);
    assert_eq!(snapshot.node("e2").unwrap().outputs["output"], "5");
    assert_eq!(snapshot.node("add").unwrap().label, "add label");
}

#[tokio::test]
async fn test_failure_aborts_downstream() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("first", "Fail", &[("input", "x")]),
            raw_node("second", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("first", "output"), ("second", "input"))],
    });

    let (result, vars) = run(&mut wf).await;
    let err = result.unwrap_err();
    assert!(matches!(&err, FlowError::Operation { node, .. } if node == "first"));
    assert!(err.to_string().contains("boom"));

    assert_eq!(wf.dag.nodes["first"].state, NodeState::Failed);
    assert_eq!(wf.dag.nodes["second"].state, NodeState::Pending);
    assert!(wf.dag.nodes["second"].outputs.is_empty());
    assert!(!vars.contains_key("calls"));

    assert_eq!(WorkflowResult::collect(&wf).status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn test_unsatisfied_input_fails_fast() {
    // "b" is neither pinned nor wired
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("add", "Add", &[("a", "1")]),
            raw_node("echo", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("add", "sum"), ("echo", "input"))],
    });

    let (result, _) = run(&mut wf).await;
    let err = result.unwrap_err();
    assert!(matches!(&err, FlowError::InputResolution { node, port } if node == "add" && port == "b"));
    assert_eq!(wf.dag.nodes["add"].state, NodeState::Failed);
    assert_eq!(wf.dag.nodes["echo"].state, NodeState::Pending);
}

#[tokio::test]
async fn test_cycle_aborts_before_any_node_runs() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![raw_node("x", "Echo", &[]), raw_node("y", "Echo", &[])],
        connections: vec![
            raw_link("c1", ("x", "output"), ("y", "input")),
            raw_link("c2", ("y", "output"), ("x", "input")),
        ],
    });
    assert!(wf.validate().is_ok());

    let (result, _) = run(&mut wf).await;
    assert!(matches!(
        result.unwrap_err(),
        FlowError::Workflow(WorkflowError::CyclicDependency)
    ));
    assert!(wf.dag.nodes.values().all(|n| n.state == NodeState::Pending));
}

#[tokio::test]
async fn test_unbound_node_type_is_an_operation_error() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![raw_node("lone", "Remote", &[("input", "1")]), raw_node("echo", "Echo", &[])],
        connections: vec![raw_link("c1", ("lone", "output"), ("echo", "input"))],
    })
    .with_node_types([NodeType::new("Remote")
        .with_input(Port::connection("input", "Input"))
        .with_output(Port::connection("output", "Output"))]);

    let (result, _) = run(&mut wf).await;
    assert!(matches!(
        result.unwrap_err(),
        FlowError::Operation { source: NodeError::Unbound(_), .. }
    ));
}

#[tokio::test]
async fn test_events_follow_execution() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("add", "Add", &[("a", "1"), ("b", "1")]),
            raw_node("echo", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("add", "sum"), ("echo", "input"))],
    });

    let bus = EventBus::new(100);
    let mut events = bus.subscribe();
    let mut vars = Vars::new();
    WorkflowExecutor::new()
        .execute(&mut wf, &bus, &mut vars)
        .await
        .unwrap();

    let mut completed = Vec::new();
    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        match event {
            ExecutionEvent::NodeCompleted { node_id, .. } => completed.push(node_id),
            ExecutionEvent::WorkflowCompleted { success, .. } => finished = Some(success),
            _ => {}
        }
    }
    assert_eq!(completed, vec!["add".to_string(), "echo".to_string()]);
    assert_eq!(finished, Some(true));
}

#[tokio::test]
async fn test_cancelled_run_leaves_nodes_pending() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("add", "Add", &[("a", "1"), ("b", "2")]),
            raw_node("echo", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("add", "sum"), ("echo", "input"))],
    });

    let cancel = CancellationToken::new();
    cancel.cancel();
    let bus = EventBus::new(100);
    let mut vars = Vars::new();
    let err = WorkflowExecutor::new()
        .execute_until(&mut wf, &bus, &mut vars, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        FlowError::Operation { node, source: NodeError::Cancelled } if node == "add"
    ));
    assert!(wf.dag.nodes.values().all(|n| n.state == NodeState::Pending));
}

#[tokio::test]
async fn test_cancel_from_operation_stops_before_next_node() {
    let mut wf = workflow(RawWorkflow {
        nodes: vec![
            raw_node("stop", "Stop", &[("input", "7")]),
            raw_node("echo", "Echo", &[]),
        ],
        connections: vec![raw_link("c1", ("stop", "output"), ("echo", "input"))],
    });

    let cancel = CancellationToken::new();
    let bus = EventBus::new(100);
    let mut vars = Vars::new();
    let err = WorkflowExecutor::new()
        .execute_until(&mut wf, &bus, &mut vars, &cancel)
        .await
        .unwrap_err();

    assert!(cancel.is_cancelled());
    assert!(matches!(
        &err,
        FlowError::Operation { node, source: NodeError::Cancelled } if node == "echo"
    ));
    assert_eq!(wf.dag.nodes["stop"].state, NodeState::Success);
    assert_eq!(wf.dag.nodes["echo"].state, NodeState::Pending);
    assert!(!vars.contains_key("calls"));
}
