use std::time::Duration;

/// Coordinator settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub registry_url: String,
    /// Seed the built-in catalog locally so workflows run without workers.
    pub builtins: bool,
    /// Pause before re-opening a watch stream that ended.
    pub watch_retry: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            registry_url: "http://127.0.0.1:50051".to_string(),
            builtins: false,
            watch_retry: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            registry_url: std::env::var("REGISTRY_URL").unwrap_or(defaults.registry_url),
            builtins: std::env::var("FLOW_BUILTINS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.builtins),
            watch_retry: defaults.watch_retry,
        }
    }
}
