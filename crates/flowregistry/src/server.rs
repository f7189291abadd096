//! HTTP surface of the registry.
//!
//! `/watch` answers with a long-lived `application/x-ndjson` body; each line
//! is a `Services` document.

use crate::ServiceRegistry;
use actix_web::{get, post, web, HttpResponse, Responder};
use flowcore::{Lease, Query, ServiceInstance, Services};
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(deregister)
        .service(keep_alive)
        .service(discover)
        .service(watch);
}

#[post("/register")]
async fn register(registry: web::Data<ServiceRegistry>, instance: web::Json<ServiceInstance>) -> impl Responder {
    let lease = registry.register(instance.into_inner()).await;
    HttpResponse::Ok().json(lease)
}

#[post("/deregister")]
async fn deregister(registry: web::Data<ServiceRegistry>, lease: web::Json<Lease>) -> impl Responder {
    registry.deregister(&lease).await;
    HttpResponse::NoContent().finish()
}

#[post("/keepalive")]
async fn keep_alive(registry: web::Data<ServiceRegistry>, lease: web::Json<Lease>) -> impl Responder {
    match registry.keep_alive(&lease).await {
        Ok(renewed) => HttpResponse::Ok().json(renewed),
        Err(e) => HttpResponse::NotFound().json(json!({ "error": e.to_string() })),
    }
}

#[get("/discover")]
async fn discover(registry: web::Data<ServiceRegistry>, query: web::Query<Query>) -> impl Responder {
    let instances = registry.discover(&query.name).await;
    HttpResponse::Ok().json(Services { instances })
}

#[get("/watch")]
async fn watch(registry: web::Data<ServiceRegistry>, query: web::Query<Query>) -> impl Responder {
    let name = query.into_inner().name;
    let updates = registry
        .watch(name, CancellationToken::new())
        .map(|instances| {
            let mut line = serde_json::to_vec(&Services { instances })?;
            line.push(b'\n');
            Ok::<_, serde_json::Error>(web::Bytes::from(line))
        });

    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(updates)
}
