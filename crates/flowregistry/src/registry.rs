use crate::RegistryError;
use flowcore::{Lease, ServiceInstance};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timing knobs of the registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Lease length for instances that register with ttl <= 0. Rounded up to
    /// whole seconds.
    pub default_ttl: Duration,
    pub sweep_interval: Duration,
    pub watch_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(5),
            watch_interval: Duration::from_secs(5),
        }
    }
}

struct RegistryEntry {
    instance: ServiceInstance,
    expire: Instant,
}

/// name -> id -> entry. Ordered so snapshots are stable between ticks.
type Table = BTreeMap<String, BTreeMap<String, RegistryEntry>>;

/// In-memory, lease-based membership table.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct ServiceRegistry {
    table: Arc<RwLock<Table>>,
    config: RegistryConfig,
}

impl ServiceRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            table: Arc::new(RwLock::new(Table::new())),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Insert or overwrite `(name, id)`. Never fails.
    pub async fn register(&self, mut instance: ServiceInstance) -> Lease {
        if instance.ttl_secs <= 0 {
            instance = instance.with_ttl(self.config.default_ttl);
        }
        let lease = Lease::for_instance(&instance);
        let expire = Instant::now() + instance.ttl();

        info!(
            "Registered {} (id: {}, addr: {}, ttl: {}s)",
            instance.name, instance.id, instance.address, instance.ttl_secs
        );

        let mut table = self.table.write().await;
        table
            .entry(instance.name.clone())
            .or_default()
            .insert(instance.id.clone(), RegistryEntry { instance, expire });
        lease
    }

    /// Remove the entry if present. Unknown leases are ignored.
    pub async fn deregister(&self, lease: &Lease) {
        let mut table = self.table.write().await;
        let Some(group) = table.get_mut(&lease.name) else {
            return;
        };
        if group.remove(&lease.id).is_some() {
            info!("Deregistered {} (id: {})", lease.name, lease.id);
        }
        if group.is_empty() {
            table.remove(&lease.name);
        }
    }

    /// Restart the expiry window of a live entry.
    pub async fn keep_alive(&self, lease: &Lease) -> Result<Lease, RegistryError> {
        let mut table = self.table.write().await;
        let entry = table
            .get_mut(&lease.name)
            .and_then(|group| group.get_mut(&lease.id));

        match entry {
            Some(entry) => {
                entry.expire = Instant::now() + entry.instance.ttl();
                debug!("Renewed {} (id: {})", lease.name, lease.id);
                Ok(Lease::for_instance(&entry.instance))
            }
            None => {
                warn!("Keep-alive for unknown instance {} (id: {})", lease.name, lease.id);
                Err(RegistryError::NotFound {
                    name: lease.name.clone(),
                    id: lease.id.clone(),
                })
            }
        }
    }

    /// Instances of `name`, or of every service when `name` is empty.
    pub async fn discover(&self, name: &str) -> Vec<ServiceInstance> {
        let table = self.table.read().await;
        snapshot(&table, name)
    }

    /// Change-only membership stream.
    ///
    /// Every `watch_interval` the snapshot is recomputed and yielded only when
    /// it differs from the previous one; the first tick always yields. Ends
    /// when `cancel` fires or the stream is dropped.
    pub fn watch(&self, name: impl Into<String>, cancel: CancellationToken) -> BoxStream<'static, Vec<ServiceInstance>> {
        let state = WatchState {
            registry: self.clone(),
            name: name.into(),
            ticker: None,
            cancel,
            last: None,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                let period = st.registry.config.watch_interval;
                let ticker = st.ticker.get_or_insert_with(|| {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker
                });

                tokio::select! {
                    biased;
                    _ = st.cancel.cancelled() => {
                        debug!("Watch on '{}' ended", st.name);
                        return None;
                    }
                    _ = ticker.tick() => {}
                }

                let current = st.registry.discover(&st.name).await;
                if st.last.as_ref() != Some(&current) {
                    debug!("Watch on '{}' pushing {} instance(s)", st.name, current.len());
                    st.last = Some(current.clone());
                    return Some((current, st));
                }
            }
        })
        .boxed()
    }

    /// Drop every entry whose lease has run out, and any group left empty.
    /// Returns the number of evicted instances.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut table = self.table.write().await;
        let mut evicted = 0;

        table.retain(|name, group| {
            group.retain(|id, entry| {
                let alive = entry.expire >= now;
                if !alive {
                    info!("Evicted expired instance {} (id: {})", name, id);
                    evicted += 1;
                }
                alive
            });
            !group.is_empty()
        });

        if evicted > 0 {
            info!("Sweep evicted {} instance(s)", evicted);
        }
        evicted
    }

    /// Run [`sweep`](Self::sweep) every `sweep_interval` until cancelled.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(registry.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        registry.sweep().await;
                    }
                }
            }
            debug!("Sweeper stopped");
        })
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

struct WatchState {
    registry: ServiceRegistry,
    name: String,
    ticker: Option<Interval>,
    cancel: CancellationToken,
    last: Option<Vec<ServiceInstance>>,
}

fn snapshot(table: &Table, name: &str) -> Vec<ServiceInstance> {
    if name.is_empty() {
        table
            .values()
            .flat_map(|group| group.values())
            .map(|entry| entry.instance.clone())
            .collect()
    } else {
        table
            .get(name)
            .map(|group| group.values().map(|entry| entry.instance.clone()).collect())
            .unwrap_or_default()
    }
}
