//! ASCII sparkline rendering of a latency series.

use crate::monitor::server::{Status, StatusThresholds};

/// Block glyphs from lowest to highest.
const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render a latency series as a sparkline string.
///
/// Values are normalized over the series' own min/max; a flat series
/// renders at half height, and an empty series renders as nothing.
pub fn render(latencies_ms: &[f64]) -> String {
    if latencies_ms.is_empty() {
        return String::new();
    }

    let min = latencies_ms.iter().cloned().fold(f64::MAX, f64::min);
    let max = latencies_ms.iter().cloned().fold(f64::MIN, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return "▄".repeat(latencies_ms.len());
    }

    latencies_ms
        .iter()
        .map(|&latency| {
            let norm = (latency - min) / (max - min);
            let idx = ((norm * SPARK_CHARS.len() as f64) as usize).min(SPARK_CHARS.len() - 1);
            SPARK_CHARS[idx]
        })
        .collect()
}

/// Color class for a series, taken from its average latency.
pub fn classify(latencies_ms: &[f64], thresholds: StatusThresholds) -> Status {
    if latencies_ms.is_empty() {
        return Status::Unknown;
    }
    let avg = latencies_ms.iter().sum::<f64>() / latencies_ms.len() as f64;
    thresholds.classify_ms(avg)
}
