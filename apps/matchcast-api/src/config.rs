use std::str::FromStr;
use std::time::Duration;

use crate::broadcast::DispatcherConfig;
use crate::delivery::DeliveryConfig;

/// Matchcast API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Number of dispatcher workers.
    pub workers: usize,
    /// Bounded job queue capacity.
    pub queue_capacity: usize,
    /// Default HMAC secret for webhook targets. Unsigned when unset.
    pub webhook_secret: Option<String>,
    pub webhook_timeout_secs: u64,
    pub push_fault_rate: f64,
    pub socket_fault_rate: f64,
    pub sms_fault_rate: f64,
    /// Base latency of the simulated providers, in milliseconds.
    pub simulated_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4000,
            workers: 4,
            queue_capacity: 100,
            webhook_secret: None,
            webhook_timeout_secs: 5,
            push_fault_rate: 0.10,
            socket_fault_rate: 0.05,
            sms_fault_rate: 0.08,
            simulated_latency_ms: 50,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_var("PORT", defaults.port),
            workers: parsed_var("BROADCAST_WORKERS", defaults.workers).max(1),
            queue_capacity: parsed_var("BROADCAST_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            webhook_timeout_secs: parsed_var("WEBHOOK_TIMEOUT_SECS", defaults.webhook_timeout_secs),
            push_fault_rate: parsed_var("PUSH_FAULT_RATE", defaults.push_fault_rate),
            socket_fault_rate: parsed_var("SOCKET_FAULT_RATE", defaults.socket_fault_rate),
            sms_fault_rate: parsed_var("SMS_FAULT_RATE", defaults.sms_fault_rate),
            simulated_latency_ms: parsed_var("SIMULATED_LATENCY_MS", defaults.simulated_latency_ms),
        }
    }

    /// No faults and no latency; used by the test harness.
    pub fn reliable() -> Self {
        Self {
            push_fault_rate: 0.0,
            socket_fault_rate: 0.0,
            sms_fault_rate: 0.0,
            simulated_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            push_fault_rate: self.push_fault_rate,
            socket_fault_rate: self.socket_fault_rate,
            sms_fault_rate: self.sms_fault_rate,
            email_fault_rate: 0.0,
            simulated_latency: Duration::from_millis(self.simulated_latency_ms),
            webhook_secret: self.webhook_secret.clone(),
            webhook_timeout: Duration::from_secs(self.webhook_timeout_secs),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            ..DispatcherConfig::default()
        }
    }
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "unparsable env var, using default");
            default
        }),
        Err(_) => default,
    }
}
