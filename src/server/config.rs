use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::aggregation::{DEFAULT_FEED_LENGTH, FeedOrder, SummaryOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the ingestion service.
    pub upstream_url: String,
    pub camera_id: u32,
    pub feed_length: usize,
    pub feed_order: FeedOrder,
    /// 0 disables the periodic event refresh.
    pub refresh_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub listen_address: SocketAddr,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialDashboardConfig {
    upstream_url: Option<String>,
    camera_id: Option<u32>,
    feed_length: Option<usize>,
    feed_order: Option<FeedOrder>,
    refresh_interval_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
    listen_address: Option<String>,
    log_dir: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl DashboardConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) => read_config_file(Path::new(path_str))?,
            None => PartialDashboardConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialDashboardConfig = envy::from_env::<PartialDashboardConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(
        env_config: PartialDashboardConfig,
        file_config: PartialDashboardConfig,
    ) -> Result<Self, String> {
        let listen_raw = env_config
            .listen_address
            .or(file_config.listen_address)
            .unwrap_or_else(default_listen_address);
        let listen_address: SocketAddr = listen_raw
            .parse()
            .map_err(|e| format!("Invalid listen_address '{listen_raw}': {e}"))?;

        Ok(DashboardConfig {
            upstream_url: env_config
                .upstream_url
                .or(file_config.upstream_url)
                .ok_or("UPSTREAM_URL is required")?,
            camera_id: env_config.camera_id.or(file_config.camera_id).unwrap_or(1),
            feed_length: env_config
                .feed_length
                .or(file_config.feed_length)
                .unwrap_or(DEFAULT_FEED_LENGTH),
            feed_order: env_config
                .feed_order
                .or(file_config.feed_order)
                .unwrap_or_default(),
            refresh_interval_seconds: env_config
                .refresh_interval_seconds
                .or(file_config.refresh_interval_seconds)
                .unwrap_or(0),
            request_timeout_seconds: env_config
                .request_timeout_seconds
                .or(file_config.request_timeout_seconds)
                .unwrap_or(10)
                .max(1),
            listen_address,
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        })
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            feed_length: self.feed_length,
            feed_order: self.feed_order,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_seconds > 0)
            .then(|| Duration::from_secs(self.refresh_interval_seconds))
    }
}

fn read_config_file(path: &Path) -> Result<PartialDashboardConfig, String> {
    if !path.exists() {
        return Ok(PartialDashboardConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}
