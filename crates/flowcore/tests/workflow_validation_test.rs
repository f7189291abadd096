// crates/flowcore/tests/workflow_validation_test.rs

use flowcore::{
    ConnectionType, Endpoint, NodeType, Port, RawConnection, RawNode, RawWorkflow, Workflow,
    WorkflowError, WorkflowSubmission,
};

fn add_type() -> NodeType {
    NodeType::new("math.add")
        .with_category("math")
        .with_input(Port::connection("a", "A"))
        .with_input(Port::connection("b", "B"))
        .with_output(Port::connection("sum", "Sum"))
}

fn echo_type() -> NodeType {
    NodeType::new("util.echo")
        .with_input(Port::connection("input", "Input"))
        .with_output(Port::connection("output", "Output"))
}

fn data_flow() -> ConnectionType {
    ConnectionType {
        uid: "data_flow".to_string(),
        name: "data_flow".to_string(),
        description: String::new(),
        color: "#4CAF50".to_string(),
        allowed_port_types: vec!["connection".to_string()],
    }
}

fn node(id: &str, node_type: &str) -> RawNode {
    RawNode {
        id: id.to_string(),
        node_type: node_type.to_string(),
        label: id.to_uppercase(),
        inputs: None,
    }
}

fn link(id: &str, from: (&str, &str), to: (&str, &str)) -> RawConnection {
    RawConnection {
        id: id.to_string(),
        connection_type: "data_flow".to_string(),
        from: Endpoint::new(from.0, from.1),
        to: Endpoint::new(to.0, to.1),
    }
}

fn build(raw: RawWorkflow) -> Workflow {
    Workflow::from_raw("wf-1", raw)
        .unwrap()
        .with_node_types([add_type(), echo_type()])
        .with_connection_types([data_flow()])
}

fn valid_raw() -> RawWorkflow {
    let mut add = node("add", "math.add");
    add.inputs = Some(
        [("a".to_string(), "10".into()), ("b".to_string(), "20".into())]
            .into_iter()
            .collect(),
    );
    RawWorkflow {
        nodes: vec![add, node("echo", "util.echo")],
        connections: vec![link("c1", ("add", "sum"), ("echo", "input"))],
    }
}

#[test]
fn test_valid_workflow_passes() {
    let wf = build(valid_raw());
    assert!(wf.validate().is_ok());
    assert_eq!(wf.dag.nodes["add"].inputs["a"].as_i64(), Some(10));
}

#[test]
fn test_submission_body_parses_pinned_inputs() {
    let body = r#"{
        "uid": "wf-json",
        "workflow": {
            "nodes": [
                {"id": "n1", "node_type": "math.add", "label": "Add", "inputs": {"a": "1", "b": "2"}},
                {"id": "n2", "node_type": "util.echo", "label": "Echo"}
            ],
            "connections": [
                {"connection_id": "c1", "connection_type": "data_flow",
                 "from": {"node_id": "n1", "port_name": "sum"},
                 "to": {"node_id": "n2", "port_name": "input"}}
            ]
        }
    }"#;
    let submission: WorkflowSubmission = serde_json::from_str(body).unwrap();
    let wf = build(submission.workflow);
    assert!(wf.validate().is_ok());
    assert_eq!(wf.dag.nodes["n1"].inputs["b"].as_str(), Some("2"));
    assert!(wf.dag.nodes["n2"].inputs.is_empty());
}

#[test]
fn test_empty_workflow_rejected() {
    let raw = RawWorkflow {
        nodes: vec![node("add", "math.add")],
        connections: vec![],
    };
    assert_eq!(build(raw).validate(), Err(WorkflowError::EmptyWorkflow));
}

#[test]
fn test_duplicate_node_rejected_at_construction() {
    let raw = RawWorkflow {
        nodes: vec![node("x", "math.add"), node("x", "util.echo")],
        connections: vec![],
    };
    let err = Workflow::from_raw("wf", raw).unwrap_err();
    assert_eq!(err, WorkflowError::DuplicateNode("x".to_string()));
}

#[test]
fn test_unknown_node_type_rejected() {
    let mut raw = valid_raw();
    raw.nodes[1].node_type = "util.missing".to_string();
    let err = build(raw).validate().unwrap_err();
    assert!(matches!(&err, WorkflowError::UnknownNodeType { node, .. } if node == "echo"));
    assert!(err.to_string().contains("util.missing"));
}

#[test]
fn test_pinned_input_on_undeclared_port_rejected() {
    let mut raw = valid_raw();
    raw.nodes[1].inputs = Some([("bogus".to_string(), "1".into())].into_iter().collect());
    let err = build(raw).validate().unwrap_err();
    assert_eq!(
        err,
        WorkflowError::UndeclaredInput {
            node: "echo".to_string(),
            port: "bogus".to_string()
        }
    );
}

#[test]
fn test_unknown_connection_type_rejected() {
    let mut raw = valid_raw();
    raw.connections[0].connection_type = "file_flow".to_string();
    let err = build(raw).validate().unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownConnectionType { connection, .. } if connection == "c1"));
}

#[test]
fn test_connection_to_missing_node_rejected() {
    let mut raw = valid_raw();
    raw.connections[0].to.node_id = "ghost".to_string();
    let err = build(raw).validate().unwrap_err();
    assert!(matches!(&err, WorkflowError::NodeNotFound { side: "target", node, .. } if node == "ghost"));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_connection_to_undeclared_input_port_rejected() {
    let mut raw = valid_raw();
    raw.connections[0].to.port_name = "nope".to_string();
    let err = build(raw).validate().unwrap_err();
    assert!(matches!(&err, WorkflowError::UndeclaredPort { direction: "input", port, .. } if port == "nope"));
}

#[test]
fn test_connection_from_input_port_rejected() {
    // "a" is an input of the add node, not an output
    let mut raw = valid_raw();
    raw.connections[0].from.port_name = "a".to_string();
    let err = build(raw).validate().unwrap_err();
    assert!(matches!(err, WorkflowError::UndeclaredPort { direction: "output", .. }));
}

#[test]
fn test_validation_messages_are_distinct() {
    let mut unknown_type = valid_raw();
    unknown_type.nodes[1].node_type = "nope".to_string();
    let mut bad_pin = valid_raw();
    bad_pin.nodes[1].inputs = Some([("nope".to_string(), "1".into())].into_iter().collect());
    let mut missing_node = valid_raw();
    missing_node.connections[0].to.node_id = "nope".to_string();
    let mut bad_port = valid_raw();
    bad_port.connections[0].to.port_name = "nope".to_string();

    let messages: std::collections::HashSet<String> = [unknown_type, bad_pin, missing_node, bad_port]
        .into_iter()
        .map(|raw| build(raw).validate().unwrap_err().to_string())
        .collect();
    assert_eq!(messages.len(), 4);
}
