mod config;
mod routes;

use actix_web::{web, App, HttpServer};
use config::ServerConfig;
use flowregistry::{RegistryApi, RegistryClient};
use flowruntime::FlowRuntime;
use routes::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Keep the federated catalog in step with the registry, re-opening the watch
/// whenever it ends.
async fn follow_registry(
    runtime: Arc<FlowRuntime>,
    registry: RegistryClient,
    retry: Duration,
    cancel: CancellationToken,
) {
    let federation = runtime.federation();
    loop {
        info!("Watching registry at {}", registry.base_url());
        federation.run(registry.watch("", cancel.clone()), cancel.clone()).await;

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry) => {}
        }
    }
    info!("Registry watch stopped");
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!("Starting flow coordinator");

    let runtime = Arc::new(FlowRuntime::new());
    if config.builtins {
        flownodes::register_all(runtime.cache(), "local").await;
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(follow_registry(
        runtime.clone(),
        RegistryClient::new(&config.registry_url),
        config.watch_retry,
        cancel.clone(),
    ));

    let app_state = web::Data::new(AppState { runtime });

    info!("Server starting on http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(actix_web::middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    cancel.cancel();
    watcher.await?;
    info!("Server stopped");
    Ok(())
}
