use crate::monitor::constants::*;
use crate::monitor::error::ConfigError;
use crate::monitor::server::{NewServer, StatusThresholds};
use clap::Parser;
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "laglens")]
#[command(about = "Live terminal map of network round-trip latency")]
pub struct Config {
    /// Seconds between probes of each server
    #[arg(long, default_value_t = DEFAULT_PROBE_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// UDP port probed on each target
    #[arg(long, default_value_t = DEFAULT_PROBE_PORT)]
    pub probe_port: u16,

    /// Samples retained per server
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    pub capacity: usize,

    /// Latency below this is healthy (milliseconds)
    #[arg(long, default_value_t = DEFAULT_HEALTHY_THRESHOLD_MS)]
    pub healthy_ms: u64,

    /// Latency above this is critical (milliseconds)
    #[arg(long, default_value_t = DEFAULT_DEGRADED_THRESHOLD_MS)]
    pub degraded_ms: u64,

    /// Map width in characters
    #[arg(long, default_value_t = DEFAULT_GRID_WIDTH)]
    pub width: u16,

    /// Map height in characters
    #[arg(long, default_value_t = DEFAULT_GRID_HEIGHT)]
    pub height: u16,

    /// Seconds between display refreshes
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_secs: u64,

    /// Directory statistics exports are written to
    #[arg(long, default_value = ".")]
    pub export_dir: String,

    /// Export a statistics snapshot every N seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub export_every_secs: u64,

    /// Start without the built-in default server list
    #[arg(long)]
    pub no_default_servers: bool,

    /// Disable the live display (probe and export only)
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl Config {
    /// Returns the probe interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the probe timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the display refresh period as a Duration
    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn thresholds(&self) -> StatusThresholds {
        StatusThresholds {
            healthy_ms: self.healthy_ms,
            degraded_ms: self.degraded_ms,
        }
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Validating configuration");
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("interval must be > 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout must be > 0".into()));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be > 0".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid("grid size must be > 0".into()));
        }
        if self.refresh_secs == 0 {
            return Err(ConfigError::Invalid("refresh must be > 0".into()));
        }
        if self.healthy_ms >= self.degraded_ms {
            return Err(ConfigError::Invalid(
                "healthy threshold must be below the degraded threshold".into(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        debug!("Configuration validated successfully");
        Ok(())
    }
}

/// Built-in server list used when none is supplied at startup.
pub fn default_servers() -> Vec<NewServer> {
    vec![
        NewServer::new("aws-us-east", "52.95.128.0", 39.0437, -77.4875).with_city("N. Virginia"),
        NewServer::new("aws-us-west", "52.94.76.0", 45.5231, -122.6765).with_city("Oregon"),
        NewServer::new("gcp-iowa", "35.192.0.0", 41.8780, -93.0977).with_city("Iowa"),
        NewServer::new("aws-frankfurt", "18.192.0.0", 50.1109, 8.6821).with_city("Frankfurt"),
        NewServer::new("gcp-belgium", "34.90.0.0", 50.8503, 4.3517).with_city("Brussels"),
        NewServer::new("aws-tokyo", "52.74.0.0", 35.6895, 139.6917).with_city("Tokyo"),
        NewServer::new("alibaba-singapore", "47.74.0.0", 1.3521, 103.8198).with_city("Singapore"),
        NewServer::new("aws-sao-paulo", "54.233.0.0", -23.5505, -46.6333).with_city("São Paulo"),
        NewServer::new("aws-cape-town", "52.93.0.0", -33.9249, 18.4241).with_city("Cape Town"),
        NewServer::new("aws-sydney", "52.64.0.0", -33.8688, 151.2093).with_city("Sydney"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            interval_secs: 5,
            timeout_ms: 5_000,
            probe_port: 7,
            capacity: 120,
            healthy_ms: 100,
            degraded_ms: 300,
            width: 80,
            height: 24,
            refresh_secs: 5,
            export_dir: ".".to_string(),
            export_every_secs: 0,
            no_default_servers: false,
            quiet: false,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_millis(5_000));
        assert!(!config.is_json_format());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = base_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.width = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.healthy_ms = 300;
        config.degraded_ms = 100;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.log_level = "noisy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_servers_have_valid_coordinates() {
        let servers = default_servers();
        assert!(!servers.is_empty());
        for server in servers {
            assert!((-90.0..=90.0).contains(&server.latitude));
            assert!((-180.0..=180.0).contains(&server.longitude));
            assert!(!server.name.is_empty());
        }
    }
}
