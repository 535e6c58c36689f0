use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no reply from {target} within {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("target {target} is unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("failed to resolve target {0}")]
    ResolutionFailed(String),

    #[error("probe socket denied by the operating system: {0}")]
    PermissionDenied(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server name must not be empty")]
    EmptyName,

    #[error("a server named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' is not a valid IP address or hostname")]
    InvalidTarget(String),

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("no server with id {0}")]
    UnknownServer(u64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("histogram error: {0}")]
    Histogram(String),
}
