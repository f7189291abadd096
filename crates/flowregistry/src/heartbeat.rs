use crate::{RegistryApi, RegistryError};
use flowcore::ServiceInstance;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Keeps one instance registered for as long as it runs.
///
/// Registers on start, renews the lease every `interval`, registers again
/// when a renewal is rejected, and deregisters on cancellation.
pub struct Heartbeat {
    registry: Arc<dyn RegistryApi>,
    instance: ServiceInstance,
    config: HeartbeatConfig,
}

impl Heartbeat {
    pub fn new(registry: Arc<dyn RegistryApi>, instance: ServiceInstance) -> Self {
        Self::with_config(registry, instance, HeartbeatConfig::default())
    }

    pub fn with_config(
        registry: Arc<dyn RegistryApi>,
        instance: ServiceInstance,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            registry,
            instance,
            config,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<(), RegistryError> {
        let mut lease = self.registry.register(self.instance.clone()).await?;
        info!(
            "Registered {} (id: {}) at {}",
            self.instance.name, self.instance.id, self.instance.address
        );

        let period = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.registry.keep_alive(&lease).await {
                Ok(renewed) => {
                    debug!("Lease of {} renewed until {}", renewed.id, renewed.expires_at);
                    lease = renewed;
                }
                Err(e) => {
                    warn!("Keep-alive for {} failed: {}; registering again", self.instance.id, e);
                    match self.registry.register(self.instance.clone()).await {
                        Ok(fresh) => lease = fresh,
                        Err(e) => warn!("Re-registration of {} failed: {}", self.instance.id, e),
                    }
                }
            }
        }

        self.registry.deregister(&lease).await?;
        info!("Deregistered {} (id: {})", self.instance.name, self.instance.id);
        Ok(())
    }
}
