// crates/flowregistry/tests/client_test.rs

use actix_web::{web, App, HttpServer};
use flowcore::{Lease, ServiceInstance};
use flowregistry::{RegistryApi, RegistryClient, RegistryConfig, ServiceRegistry};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

async fn serve(registry: ServiceRegistry) -> (RegistryClient, actix_web::dev::ServerHandle) {
    let data = web::Data::new(registry);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(flowregistry::server::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    (RegistryClient::new(format!("http://{addr}")), handle)
}

fn fast_registry() -> ServiceRegistry {
    ServiceRegistry::new(RegistryConfig {
        watch_interval: Duration::from_millis(50),
        ..RegistryConfig::default()
    })
}

#[actix_web::test]
async fn test_client_round_trip() {
    let (client, handle) = serve(fast_registry()).await;

    let lease = client
        .register(ServiceInstance::new("s1", "a", "127.0.0.1:9001").with_metadata("zone", "a"))
        .await
        .unwrap();
    assert_eq!((lease.name.as_str(), lease.id.as_str()), ("s1", "a"));

    let found = client.discover("s1").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].metadata["zone"], "a");
    assert_eq!(found[0].ttl_secs, 10);

    let renewed = client.keep_alive(&lease).await.unwrap();
    assert_eq!(renewed.id, "a");

    client.deregister(&lease).await.unwrap();
    assert!(client.discover("").await.unwrap().is_empty());

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_client_keep_alive_unknown_is_not_found() {
    let (client, handle) = serve(fast_registry()).await;

    let ghost = Lease::for_instance(&ServiceInstance::new("s1", "ghost", "127.0.0.1:1"));
    let err = client.keep_alive(&ghost).await.unwrap_err();
    assert!(err.is_not_found());

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_client_watch_streams_changes() {
    let registry = fast_registry();
    let (client, handle) = serve(registry.clone()).await;
    registry
        .register(ServiceInstance::new("s1", "a", "127.0.0.1:9001"))
        .await;

    let cancel = CancellationToken::new();
    let mut updates = client.watch("s1", cancel.clone());

    let first = timeout(Duration::from_secs(5), updates.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first.len(), 1);

    registry
        .deregister(&Lease::for_instance(&first[0]))
        .await;
    let second = timeout(Duration::from_secs(5), updates.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(second.is_empty());

    cancel.cancel();
    assert!(updates.next().await.is_none());

    handle.stop(false).await;
}
