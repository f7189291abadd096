use crate::{RegistryApi, RegistryError};
use async_trait::async_trait;
use flowcore::{Lease, Query, ServiceInstance, Services};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Applies to unary calls; watch streams are not bounded.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
        }
    }
}

/// HTTP client for a remote [`ServiceRegistry`](crate::ServiceRegistry).
#[derive(Clone)]
pub struct RegistryClient {
    base_url: String,
    http: reqwest::Client,
    config: ClientConfig,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, ClientConfig::default())
    }

    pub fn with_config(base_url: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, RegistryError> {
        let response = self
            .http
            .post(self.url(path))
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RegistryError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RegistryError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn register(&self, instance: ServiceInstance) -> Result<Lease, RegistryError> {
        let response = self.post("/register", &instance).await?;
        decode(response).await
    }

    async fn deregister(&self, lease: &Lease) -> Result<(), RegistryError> {
        self.post("/deregister", lease).await?;
        Ok(())
    }

    async fn keep_alive(&self, lease: &Lease) -> Result<Lease, RegistryError> {
        match self.post("/keepalive", lease).await {
            Ok(response) => decode(response).await,
            Err(RegistryError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(RegistryError::NotFound {
                    name: lease.name.clone(),
                    id: lease.id.clone(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn discover(&self, name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let response = self
            .http
            .get(self.url("/discover"))
            .timeout(self.config.request_timeout)
            .query(&Query { name: name.to_string() })
            .send()
            .await?;
        let services: Services = decode(ensure_success(response).await?).await?;
        Ok(services.instances)
    }

    /// Newline-delimited JSON, one `Services` document per membership change.
    fn watch(
        &self,
        name: &str,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Vec<ServiceInstance>, RegistryError>> {
        let request = self
            .http
            .get(self.url("/watch"))
            .query(&Query { name: name.to_string() });

        let state = WatchState {
            request: Some(request),
            body: None,
            buffer: Vec::new(),
            cancel,
            done: false,
        };

        stream::unfold(state, |mut st| async move {
            if st.done {
                return None;
            }

            if let Some(request) = st.request.take() {
                let opened = tokio::select! {
                    _ = st.cancel.cancelled() => return None,
                    response = request.send() => response,
                };
                let response = match opened {
                    Ok(response) => ensure_success(response).await,
                    Err(e) => Err(e.into()),
                };
                match response {
                    Ok(response) => {
                        debug!("Watch stream opened");
                        st.body = Some(
                            response
                                .bytes_stream()
                                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                                .boxed(),
                        );
                    }
                    Err(e) => {
                        st.done = true;
                        return Some((Err(e), st));
                    }
                }
            }

            loop {
                if let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    let item = serde_json::from_slice::<Services>(&line)
                        .map(|services| services.instances)
                        .map_err(RegistryError::from);
                    if item.is_err() {
                        st.done = true;
                    }
                    return Some((item, st));
                }

                let body = st.body.as_mut()?;
                let chunk = tokio::select! {
                    _ = st.cancel.cancelled() => return None,
                    chunk = body.next() => chunk,
                };
                match chunk {
                    Some(Ok(bytes)) => st.buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        st.done = true;
                        return Some((Err(e.into()), st));
                    }
                    None => return None,
                }
            }
        })
        .boxed()
    }
}

struct WatchState {
    request: Option<reqwest::RequestBuilder>,
    body: Option<BoxStream<'static, reqwest::Result<Vec<u8>>>>,
    buffer: Vec<u8>,
    cancel: CancellationToken,
    done: bool,
}
