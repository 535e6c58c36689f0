//! Default settings and tuning constants for the monitor.

/// Default seconds between probes of one server
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Default probe timeout in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Default UDP port probed on each target (the echo service)
pub const DEFAULT_PROBE_PORT: u16 = 7;

/// Default number of samples retained per server
pub const DEFAULT_HISTORY_CAPACITY: usize = 120;

/// Latency below this is classified healthy (milliseconds)
pub const DEFAULT_HEALTHY_THRESHOLD_MS: u64 = 100;

/// Latency above this is classified critical (milliseconds)
pub const DEFAULT_DEGRADED_THRESHOLD_MS: u64 = 300;

/// Default rendered map width in characters
pub const DEFAULT_GRID_WIDTH: u16 = 80;

/// Default rendered map height in characters
pub const DEFAULT_GRID_HEIGHT: u16 = 24;

/// Default seconds between display refreshes
pub const DEFAULT_REFRESH_SECS: u64 = 5;

/// Maximum number of points handed to the sparkline renderer
pub const SPARKLINE_MAX_POINTS: usize = 50;

/// Size of a probe packet in bytes
pub const PROBE_PACKET_SIZE: usize = 8;

/// Histogram lower bound for percentile computation (milliseconds)
pub const HISTOGRAM_LOW_BOUND_MS: u64 = 1;

/// Histogram upper bound for percentile computation (milliseconds)
pub const HISTOGRAM_HIGH_BOUND_MS: u64 = 60_000;

/// Histogram significant digits for precision
pub const HISTOGRAM_SIGNIFICANT_DIGITS: u8 = 3;
