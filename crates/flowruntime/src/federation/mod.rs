//! Bridges registry membership into the executable catalog.
//!
//! Every watch snapshot refreshes the selector's instance lists and pulls the
//! catalog of each listed instance into the [`FederationCache`]. Fetch
//! failures are logged and skipped; the cache keeps whatever it had.

mod cache;

pub use cache::{ConnTypeSnapshot, FederationCache, NodeTypeSnapshot};

use crate::RoundRobinSelector;
use async_trait::async_trait;
use flowcore::{ConnectionType, NodeType, ServiceInstance};
use futures::future::join_all;
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FederationError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Worker responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no instance available for service {0}")]
    NoInstance(String),
}

/// Where node/connection type catalogs of a worker instance come from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn node_types(&self, instance: &ServiceInstance) -> Result<Vec<NodeType>, FederationError>;

    async fn connection_types(
        &self,
        instance: &ServiceInstance,
    ) -> Result<Vec<ConnectionType>, FederationError>;
}

pub struct Federation {
    cache: Arc<FederationCache>,
    selector: Arc<RoundRobinSelector>,
    source: Arc<dyn CatalogSource>,
}

impl Federation {
    pub fn new(
        cache: Arc<FederationCache>,
        selector: Arc<RoundRobinSelector>,
        source: Arc<dyn CatalogSource>,
    ) -> Self {
        Self {
            cache,
            selector,
            source,
        }
    }

    /// Apply one membership snapshot covering every service.
    pub async fn apply(&self, instances: Vec<ServiceInstance>) {
        let mut groups: BTreeMap<String, Vec<ServiceInstance>> = BTreeMap::new();
        for name in self.selector.names().await {
            groups.entry(name).or_default();
        }
        for instance in &instances {
            groups
                .entry(instance.name.clone())
                .or_default()
                .push(instance.clone());
        }

        for (name, list) in groups {
            if list.is_empty() {
                info!("Service {} has no instances left", name);
            } else {
                info!("Service {} now has {} instance(s)", name, list.len());
            }
            self.selector.set_instances(&name, list).await;
        }

        join_all(instances.iter().map(|inst| self.refresh(inst))).await;
    }

    /// Pull one instance's catalog into the cache.
    async fn refresh(&self, instance: &ServiceInstance) {
        match self.source.node_types(instance).await {
            Ok(types) => {
                for t in types {
                    self.cache.add_node_type(&instance.name, t).await;
                }
            }
            Err(e) => {
                warn!("Fetching node types from {} ({}) failed: {}", instance.name, instance.id, e);
                return;
            }
        }

        match self.source.connection_types(instance).await {
            Ok(types) => {
                for t in types {
                    self.cache.add_conn_type(&instance.name, t).await;
                }
            }
            Err(e) => {
                warn!("Fetching connection types from {} ({}) failed: {}", instance.name, instance.id, e);
                return;
            }
        }

        debug!("Catalog of {} ({}) refreshed", instance.name, instance.id);
    }

    /// Consume a watch stream until it ends, errors, or `cancel` fires.
    pub async fn run<S, E>(&self, updates: S, cancel: CancellationToken)
    where
        S: Stream<Item = Result<Vec<ServiceInstance>, E>> + Send,
        E: Display,
    {
        futures::pin_mut!(updates);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Federation watch cancelled");
                    return;
                }
                update = updates.next() => match update {
                    Some(Ok(instances)) => self.apply(instances).await,
                    Some(Err(e)) => {
                        warn!("Watch stream failed: {}", e);
                        return;
                    }
                    None => {
                        info!("Watch stream ended");
                        return;
                    }
                }
            }
        }
    }
}
