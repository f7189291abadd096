use crate::{RegistryError, ServiceRegistry};
use async_trait::async_trait;
use flowcore::{Lease, ServiceInstance};
use futures::stream::{BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Membership operations, served either in-process or over HTTP.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn register(&self, instance: ServiceInstance) -> Result<Lease, RegistryError>;

    async fn deregister(&self, lease: &Lease) -> Result<(), RegistryError>;

    async fn keep_alive(&self, lease: &Lease) -> Result<Lease, RegistryError>;

    async fn discover(&self, name: &str) -> Result<Vec<ServiceInstance>, RegistryError>;

    fn watch(
        &self,
        name: &str,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Vec<ServiceInstance>, RegistryError>>;
}

#[async_trait]
impl RegistryApi for ServiceRegistry {
    async fn register(&self, instance: ServiceInstance) -> Result<Lease, RegistryError> {
        Ok(ServiceRegistry::register(self, instance).await)
    }

    async fn deregister(&self, lease: &Lease) -> Result<(), RegistryError> {
        ServiceRegistry::deregister(self, lease).await;
        Ok(())
    }

    async fn keep_alive(&self, lease: &Lease) -> Result<Lease, RegistryError> {
        ServiceRegistry::keep_alive(self, lease).await
    }

    async fn discover(&self, name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        Ok(ServiceRegistry::discover(self, name).await)
    }

    fn watch(
        &self,
        name: &str,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Vec<ServiceInstance>, RegistryError>> {
        ServiceRegistry::watch(self, name, cancel).map(Ok).boxed()
    }
}
