use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A worker instance as known to the registry. Identity is `(name, id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    pub name: String,
    pub id: String,
    #[serde(rename = "addr")]
    pub address: String,
    #[serde(rename = "meta", default)]
    pub metadata: BTreeMap<String, String>,
    /// Lease length in seconds; zero or negative means "use the registry default".
    #[serde(rename = "ttl_sec", default)]
    pub ttl_secs: i64,
}

impl ServiceInstance {
    pub fn new(name: impl Into<String>, id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            address: address.into(),
            metadata: BTreeMap::new(),
            ttl_secs: 0,
        }
    }

    /// Leases are granted in whole seconds; a fractional ttl rounds up so it
    /// never shrinks to zero.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        let whole = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self.ttl_secs = i64::try_from(whole).unwrap_or(i64::MAX);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.max(0) as u64)
    }

    /// Base URL of the instance, defaulting to plain HTTP when the address has
    /// no scheme.
    pub fn base_url(&self) -> String {
        if self.address.contains("://") {
            self.address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.address.trim_end_matches('/'))
        }
    }
}

/// A renewable claim on a registry entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lease {
    pub name: String,
    pub id: String,
    /// Wall-clock estimate of the deadline, for display only. The registry
    /// enforces expiry against its own monotonic clock, which this value is
    /// not tied to (it does not follow a paused or advanced tokio clock).
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Lease for `instance` whose deadline is `ttl` from the current wall
    /// clock. Call it at the moment the registry (re)starts the entry's expiry
    /// window.
    pub fn for_instance(instance: &ServiceInstance) -> Self {
        let ttl = chrono::Duration::seconds(instance.ttl_secs.max(0));
        Self {
            name: instance.name.clone(),
            id: instance.id.clone(),
            expires_at: Utc::now() + ttl,
        }
    }
}

/// Discovery/watch query; an empty name means every service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Services {
    pub instances: Vec<ServiceInstance>,
}
