//! Entity Notify
//!
//! A generic data-access layer that broadcasts mutations:
//! - `EntityService` forwarding CRUD operations to a pluggable `QueryBackend`
//! - A process-wide `NotificationSink` bound late to the live transport
//! - An in-process `EventBus` transport streamed to WebSocket clients
//! - YAML + env configuration of per-service notification rules

pub mod api;
pub mod events;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{bail, Context, Result};
use api::{NotificationGateway, DEFAULT_WS_PATH};
use events::{NotificationSink, DEFAULT_CAPACITY};
use serde::Deserialize;
use service::NotificationConfig;
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub events: EventsYamlConfig,
    /// Notification rules keyed by service name
    pub services: HashMap<String, NotificationConfig>,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub host: String,
    pub port: u16,
    pub ws_path: String,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            ws_path: DEFAULT_WS_PATH.into(),
        }
    }
}

/// Event bus configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsYamlConfig {
    pub capacity: usize,
}

impl Default for EventsYamlConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub ws_path: String,
    pub events_capacity: usize,
    pub services: HashMap<String, NotificationConfig>,
}

impl Config {
    /// Load configuration from environment variables and `config.yaml` in CWD.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        let config = Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or(yaml.server.host),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            ws_path: normalize_ws_path(
                &std::env::var("WS_PATH").unwrap_or(yaml.server.ws_path),
            ),
            events_capacity: std::env::var("EVENTS_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.events.capacity),
            services: yaml.services,
        };
        config.validate()?;
        Ok(config)
    }

    /// Notification rules configured for `service`, if any
    pub fn notification_for(&self, service: &str) -> Option<NotificationConfig> {
        self.services.get(service).cloned()
    }

    fn validate(&self) -> Result<()> {
        if self.ws_path == "/health" {
            bail!("ws_path must not shadow the /health endpoint");
        }
        if self.events_capacity == 0 {
            bail!("events capacity must be at least 1");
        }
        Ok(())
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn normalize_ws_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        DEFAULT_WS_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

// ============================================================================
// Server
// ============================================================================

/// Run the notification gateway until Ctrl-C
///
/// The gateway is bound into the process-wide sink, so every service built
/// with `EntityService::new` in this process broadcasts through it.
pub async fn start_server(config: Config) -> Result<()> {
    let gateway = NotificationGateway::new(NotificationSink::global(), config.events_capacity);
    gateway.after_init();

    let router = gateway.router(&config.ws_path);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        ws_path = %config.ws_path,
        services = config.services.len(),
        "Notification gateway listening on http://{}",
        addr
    );

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    gateway.shutdown();
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping gateway...");
}

// ============================================================================
// Tests
// ============================================================================
