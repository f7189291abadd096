use actix_web::{get, post, web, HttpResponse, Responder};
use flowcore::WorkflowSubmission;
use flowruntime::FlowRuntime;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Application state shared across handlers
pub struct AppState {
    pub runtime: Arc<FlowRuntime>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn bad_request(error: impl Into<String>) -> HttpResponse {
        HttpResponse::BadRequest().json(ErrorResponse { error: error.into() })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(node_types)
        .service(connection_types)
        .service(submit_workflow);
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "flowserver"
    }))
}

/// Federated node types, keyed by contributing service then uid.
#[get("/node_types")]
async fn node_types(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.runtime.cache().get_node_types().await)
}

#[get("/connection_types")]
async fn connection_types(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.runtime.cache().get_conn_types().await)
}

/// Build, validate and run a workflow; answers with the result snapshot.
#[post("/workflows")]
async fn submit_workflow(data: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let submission: WorkflowSubmission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(e) => return ErrorResponse::bad_request(e.to_string()),
    };
    if submission.uid.is_empty() {
        return ErrorResponse::bad_request("uid is required");
    }

    let uid = submission.uid.clone();
    info!("Executing workflow: {}", uid);

    match data.runtime.submit(submission).await {
        Ok(result) => {
            info!("Workflow {} finished: {}", uid, result.status);
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            error!("Workflow {} failed: {}", uid, e);
            ErrorResponse::bad_request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    async fn state() -> web::Data<AppState> {
        let runtime = FlowRuntime::new();
        flownodes::register_all(runtime.cache(), "local").await;
        web::Data::new(AppState {
            runtime: Arc::new(runtime),
        })
    }

    fn sum_workflow(uid: &str) -> Value {
        json!({
            "uid": uid,
            "workflow": {
                "nodes": [
                    {"id": "add", "node_type": "local.add.v1", "label": "Add",
                     "inputs": {"a": "10", "b": "20"}},
                    {"id": "echo", "node_type": "local.echo.v1", "label": "Echo"}
                ],
                "connections": [
                    {"connection_id": "c1", "connection_type": "data_flow",
                     "from": {"node_id": "add", "port_name": "sum"},
                     "to": {"node_id": "echo", "port_name": "input"}}
                ]
            }
        })
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_catalog_listing() {
        let app = test::init_service(App::new().app_data(state().await).configure(configure)).await;

        let req = test::TestRequest::get().uri("/node_types").to_request();
        let types: Value = test::call_and_read_body_json(&app, req).await;
        let uids: Vec<_> = types["local"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(uids, vec!["local.add.v1", "local.echo.v1", "local.mul.v1"]);
        assert_eq!(types["local"]["local.add.v1"]["uid"], "local.add.v1");

        let req = test::TestRequest::get().uri("/connection_types").to_request();
        let conns: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(conns["local"]["data_flow"]["uid"], "data_flow");
    }

    #[actix_web::test]
    async fn test_submit_returns_snapshot() {
        let app = test::init_service(App::new().app_data(state().await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/workflows")
            .set_json(sum_workflow("wf-1"))
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(result["workflow_id"], "wf-1");
        assert_eq!(result["status"], "success");
        let echo = result["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "echo")
            .unwrap();
        assert_eq!(echo["outputs"]["output"], "30");
    }

    #[actix_web::test]
    async fn test_submit_errors_are_bad_requests() {
        let app = test::init_service(App::new().app_data(state().await).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/workflows")
            .set_json(sum_workflow(""))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut unknown = sum_workflow("wf-2");
        unknown["workflow"]["nodes"][0]["node_type"] = json!("remote.add.v1");
        let req = test::TestRequest::post().uri("/workflows").set_json(unknown).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("remote.add.v1"));

        let req = test::TestRequest::post()
            .uri("/workflows")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
