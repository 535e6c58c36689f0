//! Snapshot export of server identities, statistics, and raw histories.
//!
//! Exporting is a pure read: it never mutates a history, and a failed
//! export leaves monitoring untouched.

use crate::monitor::error::ExportError;
use crate::monitor::history::{LatencyDistribution, RollingStats, Sample};
use crate::monitor::registry::ServerRegistry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub generated_at: DateTime<Utc>,
    pub servers: Vec<ExportServer>,
}

#[derive(Debug, Serialize)]
pub struct ExportServer {
    pub name: String,
    pub target: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub stats: ExportStats,
    pub samples: Vec<ExportSample>,
}

/// Rolling statistics plus percentiles; latency fields are null when the
/// window holds no successful sample.
#[derive(Debug, Serialize)]
pub struct ExportStats {
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub loss_ratio: Option<f64>,
    pub sample_count: usize,
    pub success_count: usize,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ExportSample {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: Option<f64>,
}

fn export_stats(stats: &RollingStats, samples: &[Sample]) -> Result<ExportStats, ExportError> {
    let distribution = LatencyDistribution::from_samples(samples)?;
    Ok(ExportStats {
        min_ms: stats.min_ms,
        max_ms: stats.max_ms,
        avg_ms: stats.avg_ms,
        jitter_ms: stats.jitter_ms,
        loss_ratio: stats.loss_ratio,
        sample_count: stats.sample_count,
        success_count: stats.success_count,
        p50_ms: distribution.percentile_ms(0.5),
        p95_ms: distribution.percentile_ms(0.95),
        p99_ms: distribution.percentile_ms(0.99),
    })
}

/// Build the export document from the registry's current state.
pub fn snapshot(
    registry: &ServerRegistry,
    generated_at: DateTime<Utc>,
) -> Result<ExportDocument, ExportError> {
    let mut servers = Vec::new();
    for entry in registry.snapshot() {
        let samples = entry.samples();
        let stats = export_stats(&entry.stats(), &samples)?;
        servers.push(ExportServer {
            name: entry.server.name.clone(),
            target: entry.server.target.clone(),
            latitude: entry.server.latitude,
            longitude: entry.server.longitude,
            city: entry.server.city.clone(),
            stats,
            samples: samples
                .iter()
                .map(|s| ExportSample {
                    timestamp: s.timestamp,
                    latency_ms: s.latency_ms(),
                })
                .collect(),
        });
    }
    debug!(servers = servers.len(), "export document built");
    Ok(ExportDocument {
        generated_at,
        servers,
    })
}

/// Write the current snapshot to `dir` and return the file path.
///
/// The file name embeds the snapshot time so repeated exports in one
/// session never collide.
pub fn write_snapshot(registry: &ServerRegistry, dir: &Path) -> Result<PathBuf, ExportError> {
    let now = Utc::now();
    let document = snapshot(registry, now)?;
    let filename = format!("laglens_stats_{}.json", now.format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(&path, json)?;
    info!(
        path = %path.display(),
        servers = document.servers.len(),
        "statistics exported"
    );
    Ok(path)
}
