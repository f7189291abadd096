//! Workflow execution runtime
//!
//! Topological ordering and sequential execution of workflow graphs, plus the
//! coordinator pieces that turn discovered worker services into an
//! executable catalog: round-robin instance selection, the federation cache
//! and remote operations.

mod catalog;
mod client;
mod dag;
mod executor;
pub mod federation;
mod remote;
mod results;
mod runtime;
mod selector;

pub use catalog::Catalog;
pub use client::WorkerClient;
pub use dag::TopologicalSort;
pub use executor::{ExecutionResult, WorkflowExecutor};
pub use federation::{CatalogSource, Federation, FederationCache, FederationError};
pub use remote::RemoteOperation;
pub use results::{NodeResult, WorkflowResult, WorkflowStatus};
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use selector::RoundRobinSelector;
