//! Configuration schema definitions.
//!
//! All sections default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the stub proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Target resolver and oblivious proxy.
    pub endpoint: EndpointConfig,

    /// Local DNS listener.
    pub listener: ListenerConfig,

    /// HTTP timeouts.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Where queries are sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the ODoH target resolver.
    pub target: String,

    /// URL of the oblivious proxy. `None` or an empty string sends queries
    /// directly to the target.
    pub proxy: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            target: "https://odoh.cloudflare-dns.com".to_string(),
            proxy: Some("https://odoh1.surfdomeinen.nl/proxy".to_string()),
        }
    }
}

/// Local listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address shared by the UDP and TCP sockets (e.g., "127.0.0.1:5353").
    pub bind_address: String,

    /// Maximum concurrent flows (backpressure).
    pub max_flows: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5353".to_string(),
            max_flows: 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total request/response timeout in seconds.
    pub request_secs: u64,

    /// How long a local TCP client may take to send its query, in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 10,
            idle_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
