use crate::{
    Catalog, Federation, FederationCache, RemoteOperation, RoundRobinSelector, WorkerClient,
    WorkflowExecutor, WorkflowResult,
};
use flowcore::{EventBus, FlowError, Vars, Workflow, WorkflowSubmission};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Coordinator-side runtime: federated catalog plus the executor.
pub struct FlowRuntime {
    cache: Arc<FederationCache>,
    selector: Arc<RoundRobinSelector>,
    worker: WorkerClient,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            cache: Arc::new(FederationCache::new()),
            selector: Arc::new(RoundRobinSelector::new()),
            worker: WorkerClient::new(config.rpc_timeout),
            executor: Arc::new(WorkflowExecutor::new()),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
        }
    }

    pub fn cache(&self) -> &Arc<FederationCache> {
        &self.cache
    }

    pub fn selector(&self) -> &Arc<RoundRobinSelector> {
        &self.selector
    }

    /// Federation driver feeding this runtime's cache and selector over HTTP.
    pub fn federation(&self) -> Federation {
        Federation::new(
            self.cache.clone(),
            self.selector.clone(),
            Arc::new(self.worker.clone()),
        )
    }

    /// Executable catalog. Locally seeded types keep their operation; the
    /// rest run remotely on the service that contributed them.
    pub async fn catalog(&self) -> Catalog {
        let nodes = self.cache.get_node_types().await;
        let conns = self.cache.get_conn_types().await;
        Catalog::from_snapshots(nodes, conns, |service, node_type| {
            if node_type.is_bound() {
                return node_type;
            }
            let op = RemoteOperation::new(
                service,
                node_type.uid.clone(),
                self.selector.clone(),
                self.worker.clone(),
            );
            node_type.with_operation(Arc::new(op))
        })
    }

    /// Build a workflow from a submission and check it against the catalog.
    pub async fn build(&self, submission: WorkflowSubmission) -> Result<Workflow, FlowError> {
        let workflow = Workflow::from_raw(submission.uid, submission.workflow)?;
        let workflow = self.catalog().await.apply(workflow);
        workflow.validate()?;
        Ok(workflow)
    }

    /// Build, validate, execute and snapshot a workflow.
    pub async fn submit(&self, submission: WorkflowSubmission) -> Result<WorkflowResult, FlowError> {
        self.submit_until(submission, &CancellationToken::new()).await
    }

    /// [`submit`](Self::submit) that gives up once `cancel` fires.
    pub async fn submit_until(
        &self,
        submission: WorkflowSubmission,
        cancel: &CancellationToken,
    ) -> Result<WorkflowResult, FlowError> {
        let mut workflow = self.build(submission).await?;
        let mut vars = Vars::new();
        self.executor
            .execute_until(&mut workflow, &self.event_bus, &mut vars, cancel)
            .await?;
        Ok(WorkflowResult::collect(&workflow))
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<flowcore::ExecutionEvent> {
        self.event_bus.subscribe()
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Timeout of each catalog fetch and RunNode call.
    pub rpc_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            rpc_timeout: Duration::from_secs(5),
        }
    }
}
