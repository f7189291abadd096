use crate::federation::{CatalogSource, FederationError};
use async_trait::async_trait;
use flowcore::worker::{RunNodeRequest, RunNodeResponse};
use flowcore::{ConnectionType, NodeType, ServiceInstance};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the worker catalog surface.
#[derive(Clone)]
pub struct WorkerClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl WorkerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn run_node(
        &self,
        instance: &ServiceInstance,
        request: &RunNodeRequest,
    ) -> Result<RunNodeResponse, FederationError> {
        let url = format!("{}/run_node", instance.base_url());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, instance: &ServiceInstance, path: &str) -> Result<T, FederationError> {
        let url = format!("{}{}", instance.base_url(), path);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FederationError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FederationError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl CatalogSource for WorkerClient {
    async fn node_types(&self, instance: &ServiceInstance) -> Result<Vec<NodeType>, FederationError> {
        self.get(instance, "/node_types").await
    }

    async fn connection_types(
        &self,
        instance: &ServiceInstance,
    ) -> Result<Vec<ConnectionType>, FederationError> {
        self.get(instance, "/connection_types").await
    }
}
