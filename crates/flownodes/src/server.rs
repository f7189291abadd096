//! HTTP surface of a worker.

use crate::WorkerService;
use actix_web::{get, post, web, HttpResponse, Responder};
use flowcore::worker::RunNodeRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(node_types).service(connection_types).service(run_node);
}

#[get("/node_types")]
async fn node_types(worker: web::Data<WorkerService>) -> impl Responder {
    HttpResponse::Ok().json(worker.get_node_types())
}

#[get("/connection_types")]
async fn connection_types(worker: web::Data<WorkerService>) -> impl Responder {
    HttpResponse::Ok().json(worker.get_conn_types())
}

#[post("/run_node")]
async fn run_node(worker: web::Data<WorkerService>, request: web::Json<RunNodeRequest>) -> impl Responder {
    HttpResponse::Ok().json(worker.run_node(request.into_inner()).await)
}
