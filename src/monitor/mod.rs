//! Latency monitoring engine: probing, scheduling, history, and export.

pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod probe;
pub mod registry;
pub mod scheduler;
pub mod server;

pub use config::{default_servers, Config};
pub use constants::*;
pub use error::{ConfigError, ExportError, ProbeError, ValidationError};
pub use export::{snapshot, write_snapshot, ExportDocument, ExportServer, ExportStats};
pub use history::{History, LatencyDistribution, RollingStats, Sample};
pub use logging::init_logging;
pub use probe::{startup_check, Prober, UdpEchoProber};
pub use registry::{ServerEntry, ServerRegistry};
pub use scheduler::{CancelToken, ProbeLoopHandle, Scheduler};
pub use server::{NewServer, Server, ServerId, Status, StatusThresholds};
