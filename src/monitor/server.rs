use crate::monitor::constants::{DEFAULT_DEGRADED_THRESHOLD_MS, DEFAULT_HEALTHY_THRESHOLD_MS};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Identifier of a monitored server, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monitored endpoint and its geographic position.
///
/// Immutable once registered; the enabled flag lives on the registry entry.
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub target: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
}

/// Input for registering a new server.
#[derive(Debug, Clone)]
pub struct NewServer {
    pub name: String,
    pub target: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
}

impl NewServer {
    pub fn new(name: &str, target: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            latitude,
            longitude,
            city: None,
        }
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }
}

/// Latency thresholds that drive status classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusThresholds {
    /// Latency strictly below this is healthy (milliseconds)
    pub healthy_ms: u64,
    /// Latency above this is critical (milliseconds)
    pub degraded_ms: u64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            healthy_ms: DEFAULT_HEALTHY_THRESHOLD_MS,
            degraded_ms: DEFAULT_DEGRADED_THRESHOLD_MS,
        }
    }
}

impl StatusThresholds {
    /// Classify a probe outcome: `None` is a loss, `Some` is measured latency.
    pub fn classify(&self, latency: Option<Duration>) -> Status {
        match latency {
            None => Status::Unreachable,
            Some(latency) => self.classify_ms(latency.as_secs_f64() * 1_000.0),
        }
    }

    /// Classify a latency value in milliseconds.
    pub fn classify_ms(&self, latency_ms: f64) -> Status {
        if latency_ms < self.healthy_ms as f64 {
            Status::Healthy
        } else if latency_ms <= self.degraded_ms as f64 {
            Status::Degraded
        } else {
            Status::Critical
        }
    }
}

/// Health classification of a server, derived from its latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No sample recorded yet
    Unknown,
    Healthy,
    Degraded,
    Critical,
    /// Latest probe got no reply
    Unreachable,
}

impl Status {
    /// Severity rank used for marker collision tie-breaks; higher is worse.
    pub fn severity(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Healthy => 1,
            Status::Degraded => 2,
            Status::Critical => 3,
            Status::Unreachable => 4,
        }
    }

    /// Marker glyph drawn on the map for a server in this state.
    pub fn glyph(self) -> char {
        match self {
            Status::Unknown => '○',
            _ => '●',
        }
    }
}
