// crates/flowcli/src/main.rs

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowcore::{
    Endpoint, ExecutionEvent, NodeEvent, Payload, PortMap, RawConnection, RawNode, RawWorkflow,
    ServiceInstance, WorkflowSubmission,
};
use flowregistry::{Heartbeat, RegistryApi, RegistryClient, RegistryConfig, ServiceRegistry};
use flownodes::WorkerService;
use flowruntime::{FlowRuntime, TopologicalSort, WorkflowStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Service name the built-in catalog is seeded under for local runs.
const LOCAL_SERVICE: &str = "local";

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Flow Engine CLI", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file with the built-in node types
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate a workflow file against the built-in node types
    Validate {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },

    /// Serve the service registry
    Registry {
        #[arg(long, env = "REGISTRY_BIND", default_value = "0.0.0.0:50051")]
        bind: String,

        /// Lease length for instances that do not ask for one
        #[arg(long, default_value_t = 10)]
        ttl_secs: u64,
    },

    /// Serve the built-in operations as a worker and keep it registered
    Worker {
        #[arg(long, env = "WORKER_BIND", default_value = "127.0.0.1:9090")]
        bind: String,

        #[arg(long, env = "REGISTRY_URL", default_value = "http://127.0.0.1:50051")]
        registry: String,

        /// Service name; node type uids are prefixed with it
        #[arg(long, default_value = "s_example")]
        name: String,

        /// Address announced to the registry (defaults to the bind address)
        #[arg(long)]
        advertise: Option<String>,

        #[arg(long, default_value_t = 10)]
        ttl_secs: u64,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Run { file } => run_workflow(&file).await?,
        Commands::Validate { file } => validate_workflow(&file).await?,
        Commands::Nodes => list_nodes(),
        Commands::Init { output } => create_example_workflow(&output)?,
        Commands::Registry { bind, ttl_secs } => serve_registry(&bind, ttl_secs).await?,
        Commands::Worker {
            bind,
            registry,
            name,
            advertise,
            ttl_secs,
        } => {
            let address = advertise.unwrap_or_else(|| bind.clone());
            serve_worker(&bind, &registry, &name, &address, ttl_secs).await?
        }
    }

    Ok(())
}

fn load_submission(file: &Path) -> Result<WorkflowSubmission> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let submission = serde_json::from_str(&json)
        .with_context(|| format!("parsing {}", file.display()))?;
    Ok(submission)
}

async fn local_runtime() -> FlowRuntime {
    let runtime = FlowRuntime::new();
    flownodes::register_all(runtime.cache(), LOCAL_SERVICE).await;
    runtime
}

async fn run_workflow(file: &Path) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());
    let submission = load_submission(file)?;

    println!("📋 Workflow: {}", submission.uid);
    println!("   Nodes: {}", submission.workflow.nodes.len());
    println!("   Connections: {}", submission.workflow.connections.len());
    println!();

    let runtime = local_runtime().await;

    // Subscribe to events for real-time output
    let mut events = runtime.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::WorkflowStarted { .. } => {
                    println!("▶️  Workflow started");
                }
                ExecutionEvent::NodeStarted { node_id, node_type, .. } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted { node_id, duration_ms, .. } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    NodeEvent::Info { message } => {
                        println!("     ℹ️  [{}] {}", node_id, message);
                    }
                    NodeEvent::Warning { message } => {
                        println!("     ⚠️  [{}] {}", node_id, message);
                    }
                },
                ExecutionEvent::WorkflowCompleted { success, duration_ms, .. } => {
                    if success {
                        println!("✨ Workflow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Workflow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("🛑 Interrupted, stopping after the current node");
                cancel.cancel();
            }
        })
    };

    let outcome = runtime.submit_until(submission, &cancel).await;
    interrupt.abort();

    // Wait for events to finish printing
    tokio::time::sleep(Duration::from_millis(100)).await;
    event_task.abort();

    let result = outcome?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Workflow: {}", result.workflow_id);
    println!("   Status: {}", result.status);

    println!();
    println!("📤 Outputs:");
    for node in &result.nodes {
        if node.outputs.is_empty() {
            continue;
        }
        println!("   Node {} [{}]:", node.id, node.state);
        for (port, value) in &node.outputs {
            println!("     {}: {}", port, value);
        }
    }

    if result.status != WorkflowStatus::Success {
        anyhow::bail!("workflow finished with status {}", result.status);
    }
    Ok(())
}

async fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());
    let submission = load_submission(file)?;

    let runtime = local_runtime().await;
    let workflow = runtime.build(submission).await?;
    let order = workflow.topological_sort()?;

    println!("✅ Workflow is valid:");
    println!("   Id: {}", workflow.id);
    println!("   Nodes: {}", workflow.dag.nodes.len());
    println!("   Connections: {}", workflow.dag.connections.len());
    println!("   Order: {}", order.join(" → "));

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    for node_type in flownodes::node_types(LOCAL_SERVICE) {
        println!("  • {} ({})", node_type.uid, node_type.category);
        println!("    {}", node_type.note);
        let inputs: Vec<_> = node_type.input_ports().iter().map(|p| p.name.as_str()).collect();
        let outputs: Vec<_> = node_type.output_ports().iter().map(|p| p.name.as_str()).collect();
        println!("    in: [{}]  out: [{}]", inputs.join(", "), outputs.join(", "));
    }
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let uid = |op: &str| format!("{LOCAL_SERVICE}.{op}.v1");
    let pinned = |pairs: &[(&str, &str)]| -> Option<PortMap> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), Payload::from(*v))).collect())
    };
    let link = |id: &str, from: (&str, &str), to: (&str, &str)| RawConnection {
        id: id.to_string(),
        connection_type: flownodes::DATA_FLOW.to_string(),
        from: Endpoint::new(from.0, from.1),
        to: Endpoint::new(to.0, to.1),
    };

    let submission = WorkflowSubmission {
        uid: "example".to_string(),
        workflow: RawWorkflow {
            nodes: vec![
                RawNode {
                    id: "add".to_string(),
                    node_type: uid("add"),
                    label: "10 + 20".to_string(),
                    inputs: pinned(&[("a", "10"), ("b", "20")]),
                },
                RawNode {
                    id: "mul".to_string(),
                    node_type: uid("mul"),
                    label: "sum * 2".to_string(),
                    inputs: pinned(&[("b", "2")]),
                },
                RawNode {
                    id: "echo".to_string(),
                    node_type: uid("echo"),
                    label: "Print".to_string(),
                    inputs: None,
                },
            ],
            connections: vec![
                link("c1", ("add", "sum"), ("mul", "a")),
                link("c2", ("mul", "product"), ("echo", "input")),
            ],
        },
    };

    let json = serde_json::to_string_pretty(&submission)?;
    std::fs::write(output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  flow run --file {}", output.display());

    Ok(())
}

async fn serve_registry(bind: &str, ttl_secs: u64) -> Result<()> {
    let registry = ServiceRegistry::new(RegistryConfig {
        default_ttl: Duration::from_secs(ttl_secs),
        ..RegistryConfig::default()
    });

    let cancel = CancellationToken::new();
    let sweeper = registry.spawn_sweeper(cancel.clone());

    info!("Registry listening on http://{}", bind);
    let data = web::Data::new(registry);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(flowregistry::server::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    cancel.cancel();
    sweeper.await?;
    Ok(())
}

async fn serve_worker(bind: &str, registry_url: &str, name: &str, address: &str, ttl_secs: u64) -> Result<()> {
    let worker = web::Data::new(WorkerService::new(name));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(worker.clone())
            .configure(flownodes::server::configure)
    })
    .bind(bind)?
    .run();

    let instance = ServiceInstance::new(name, uuid::Uuid::new_v4().to_string(), address)
        .with_ttl(Duration::from_secs(ttl_secs))
        .with_metadata("version", env!("CARGO_PKG_VERSION"));
    let registry: Arc<dyn RegistryApi> = Arc::new(RegistryClient::new(registry_url));

    let cancel = CancellationToken::new();
    let heartbeat = tokio::spawn(Heartbeat::new(registry, instance).run(cancel.clone()));

    info!("Worker '{}' listening on http://{}", name, bind);
    server.await?;

    cancel.cancel();
    heartbeat.await??;
    Ok(())
}
