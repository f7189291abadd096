use flowcore::ServiceInstance;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Pool {
    instances: Vec<ServiceInstance>,
    cursor: AtomicUsize,
}

/// Rotating instance picker, one cursor per service name.
///
/// Selection only takes the read lock; the cursor advances atomically.
#[derive(Default)]
pub struct RoundRobinSelector {
    pools: RwLock<HashMap<String, Pool>>,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the instance list of a service. An empty list clears it; the
    /// cursor is kept.
    pub async fn set_instances(&self, name: &str, instances: Vec<ServiceInstance>) {
        let mut pools = self.pools.write().await;
        pools.entry(name.to_string()).or_default().instances = instances;
    }

    pub async fn add_instance(&self, name: &str, instance: ServiceInstance) {
        let mut pools = self.pools.write().await;
        pools.entry(name.to_string()).or_default().instances.push(instance);
    }

    pub async fn get_next(&self, name: &str) -> Option<ServiceInstance> {
        let pools = self.pools.read().await;
        let pool = pools.get(name)?;
        if pool.instances.is_empty() {
            return None;
        }
        let n = pool.cursor.fetch_add(1, Ordering::Relaxed);
        pool.instances.get(n % pool.instances.len()).cloned()
    }

    pub async fn count(&self, name: &str) -> usize {
        self.pools
            .read()
            .await
            .get(name)
            .map_or(0, |p| p.instances.len())
    }

    pub async fn all(&self, name: &str) -> Vec<ServiceInstance> {
        self.pools
            .read()
            .await
            .get(name)
            .map(|p| p.instances.clone())
            .unwrap_or_default()
    }

    /// Names that currently have at least one instance.
    pub async fn names(&self) -> Vec<String> {
        self.pools
            .read()
            .await
            .iter()
            .filter(|(_, p)| !p.instances.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
