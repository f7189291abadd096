//! Standard node library
//!
//! Built-in operations (`add`, `mul`, `echo`), their node-type declarations
//! and the worker-side service that exposes them.

mod echo;
mod math;
pub mod server;
mod worker;

pub use echo::EchoOperation;
pub use math::{AddOperation, MulOperation};
pub use worker::WorkerService;

use flowcore::{ConnectionType, NodeType, Port};
use flowruntime::FederationCache;
use std::sync::Arc;

/// uid of the only connection type the built-ins speak.
pub const DATA_FLOW: &str = "data_flow";

/// Built-in node types as contributed by `service`; uids are
/// `{service}.{op}.v1`.
pub fn node_types(service: &str) -> Vec<NodeType> {
    vec![
        NodeType::new(format!("{service}.add.v1"))
            .with_category("math")
            .with_note("Adds two integers")
            .with_input(Port::connection("a", "A"))
            .with_input(Port::connection("b", "B"))
            .with_output(Port::connection("sum", "Sum"))
            .with_operation(Arc::new(AddOperation)),
        NodeType::new(format!("{service}.mul.v1"))
            .with_category("math")
            .with_note("Multiplies two integers")
            .with_input(Port::connection("a", "A"))
            .with_input(Port::connection("b", "B"))
            .with_output(Port::connection("product", "Product"))
            .with_operation(Arc::new(MulOperation)),
        NodeType::new(format!("{service}.echo.v1"))
            .with_category("util")
            .with_note("Passes its input through")
            .with_input(Port::connection("input", "Input"))
            .with_output(Port::connection("output", "Output"))
            .with_operation(Arc::new(EchoOperation)),
    ]
}

pub fn connection_types() -> Vec<ConnectionType> {
    vec![ConnectionType {
        uid: DATA_FLOW.to_string(),
        name: DATA_FLOW.to_string(),
        description: "Carries a payload from an output port to an input port".to_string(),
        color: "#4CAF50".to_string(),
        allowed_port_types: vec!["connection".to_string()],
    }]
}

/// Seed a federation cache with the built-ins, bound to local operations.
pub async fn register_all(cache: &FederationCache, service: &str) {
    for node_type in node_types(service) {
        cache.add_node_type(service, node_type).await;
    }
    for conn_type in connection_types() {
        cache.add_conn_type(service, conn_type).await;
    }
    tracing::info!("Seeded built-in catalog as service '{}'", service);
}
