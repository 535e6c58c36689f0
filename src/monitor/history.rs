use crate::monitor::constants::{
    HISTOGRAM_HIGH_BOUND_MS, HISTOGRAM_LOW_BOUND_MS, HISTOGRAM_SIGNIFICANT_DIGITS,
};
use crate::monitor::error::ExportError;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use std::time::Duration;
use tracing::debug;

/// Outcome of one probe: a measured round trip, or a loss.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub latency: Option<Duration>,
}

impl Sample {
    pub fn success(timestamp: DateTime<Utc>, latency: Duration) -> Self {
        Self {
            timestamp,
            latency: Some(latency),
        }
    }

    pub fn loss(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            latency: None,
        }
    }

    pub fn is_loss(&self) -> bool {
        self.latency.is_none()
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|l| l.as_secs_f64() * 1_000.0)
    }
}

/// Rolling aggregates over one server's current history window.
///
/// Latency aggregates are `None` when the window has no successful sample;
/// an empty window reports no data rather than misleading zeroes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RollingStats {
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    /// Mean absolute difference between consecutive successful latencies
    pub jitter_ms: Option<f64>,
    /// Fraction of samples in the window that were losses, in [0, 1]
    pub loss_ratio: Option<f64>,
    pub sample_count: usize,
    pub success_count: usize,
}

impl RollingStats {
    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }
}

/// Bounded, time-ordered sample history for one server.
///
/// Fixed-capacity ring storage: once full, each insertion evicts the oldest
/// sample first. The owning probe loop is the sole writer.
#[derive(Debug)]
pub struct History {
    buf: Vec<Sample>,
    cap: usize,
    head: usize,
    len: usize,
}

impl History {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            cap: cap.max(1),
            head: 0,
            len: 0,
        }
    }

    /// Append a sample, evicting the oldest when at capacity.
    pub fn record(&mut self, sample: Sample) {
        if self.len < self.cap {
            self.buf.push(sample);
            self.len += 1;
        } else {
            self.buf[self.head] = sample;
            self.head = (self.head + 1) % self.cap;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Most recently recorded sample.
    pub fn latest(&self) -> Option<&Sample> {
        if self.len == 0 {
            return None;
        }
        if self.len < self.cap {
            self.buf.last()
        } else {
            let idx = (self.head + self.cap - 1) % self.cap;
            self.buf.get(idx)
        }
    }

    /// Samples in insertion order, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        let mut out = Vec::with_capacity(self.len);
        if self.len == 0 {
            return out;
        }
        if self.len < self.cap {
            out.extend(self.buf.iter().cloned());
            return out;
        }
        out.extend(self.buf[self.head..].iter().cloned());
        out.extend(self.buf[..self.head].iter().cloned());
        out
    }

    /// Successful latencies in milliseconds, oldest first, thinned by
    /// striding once the series exceeds `max_points`, for sparkline
    /// consumption.
    pub fn recent_latencies(&self, max_points: usize) -> Vec<f64> {
        let latencies: Vec<f64> = self
            .samples()
            .iter()
            .filter_map(Sample::latency_ms)
            .collect();
        if max_points == 0 || latencies.len() <= max_points {
            return latencies;
        }
        let step = latencies.len() / max_points;
        latencies.into_iter().step_by(step.max(1)).collect()
    }

    /// Compute rolling statistics in a single pass over the window.
    ///
    /// Loss samples are excluded from the latency aggregates but counted in
    /// the loss ratio. Jitter is taken over consecutive successful samples.
    pub fn stats(&self) -> RollingStats {
        let samples = self.samples();
        let sample_count = samples.len();
        if sample_count == 0 {
            return RollingStats::default();
        }

        let mut min_ms = f64::MAX;
        let mut max_ms = f64::MIN;
        let mut sum_ms = 0.0;
        let mut success_count = 0usize;
        let mut loss_count = 0usize;
        let mut jitter_sum = 0.0;
        let mut jitter_terms = 0usize;
        let mut prev_ms: Option<f64> = None;

        for sample in &samples {
            match sample.latency_ms() {
                Some(ms) => {
                    min_ms = min_ms.min(ms);
                    max_ms = max_ms.max(ms);
                    sum_ms += ms;
                    success_count += 1;
                    if let Some(prev) = prev_ms {
                        jitter_sum += (ms - prev).abs();
                        jitter_terms += 1;
                    }
                    prev_ms = Some(ms);
                }
                None => loss_count += 1,
            }
        }

        let loss_ratio = Some(loss_count as f64 / sample_count as f64);
        if success_count == 0 {
            return RollingStats {
                loss_ratio,
                sample_count,
                ..RollingStats::default()
            };
        }

        let jitter_ms = if jitter_terms > 0 {
            jitter_sum / jitter_terms as f64
        } else {
            0.0
        };

        RollingStats {
            min_ms: Some(min_ms),
            max_ms: Some(max_ms),
            avg_ms: Some(sum_ms / success_count as f64),
            jitter_ms: Some(jitter_ms),
            loss_ratio,
            sample_count,
            success_count,
        }
    }
}

/// Percentile view over the successful samples of a window.
pub struct LatencyDistribution {
    hist: Histogram<u64>,
}

impl LatencyDistribution {
    pub fn from_samples(samples: &[Sample]) -> Result<Self, ExportError> {
        let mut hist = Histogram::<u64>::new_with_bounds(
            HISTOGRAM_LOW_BOUND_MS,
            HISTOGRAM_HIGH_BOUND_MS,
            HISTOGRAM_SIGNIFICANT_DIGITS,
        )
        .map_err(|e| ExportError::Histogram(format!("failed to create histogram: {}", e)))?;

        for sample in samples {
            if let Some(ms) = sample.latency_ms() {
                let clamped = (ms.round() as u64).clamp(HISTOGRAM_LOW_BOUND_MS, HISTOGRAM_HIGH_BOUND_MS);
                hist.record(clamped).map_err(|e| {
                    ExportError::Histogram(format!("failed to record latency: {}", e))
                })?;
            }
        }

        debug!(recorded = hist.len(), "latency distribution built");
        Ok(Self { hist })
    }

    /// Latency value at a quantile in milliseconds, `None` without data.
    pub fn percentile_ms(&self, quantile: f64) -> Option<f64> {
        if self.hist.is_empty() {
            return None;
        }
        Some(self.hist.value_at_quantile(quantile) as f64)
    }

    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap()
    }

    fn success_ms(seconds: i64, ms: u64) -> Sample {
        Sample::success(at(seconds), Duration::from_millis(ms))
    }

    #[test]
    fn test_record_and_order() {
        let mut history = History::new(4);
        for i in 0..3 {
            history.record(success_ms(i, 10 + i as u64));
        }

        let samples = history.samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].timestamp, at(0));
        assert_eq!(samples[2].timestamp, at(2));
        assert_eq!(history.latest().unwrap().timestamp, at(2));
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.record(success_ms(i, 10));
        }

        assert_eq!(history.len(), 3);
        let samples = history.samples();
        assert_eq!(samples[0].timestamp, at(2));
        assert_eq!(samples[2].timestamp, at(4));
        assert_eq!(history.latest().unwrap().timestamp, at(4));
    }

    #[test]
    fn test_stats_empty_is_no_data() {
        let history = History::new(8);
        let stats = history.stats();

        assert!(!stats.has_data());
        assert_eq!(stats.min_ms, None);
        assert_eq!(stats.max_ms, None);
        assert_eq!(stats.avg_ms, None);
        assert_eq!(stats.jitter_ms, None);
        assert_eq!(stats.loss_ratio, None);
    }

    #[test]
    fn test_stats_all_losses() {
        let mut history = History::new(8);
        for i in 0..4 {
            history.record(Sample::loss(at(i)));
        }

        let stats = history.stats();
        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.success_count, 0);
        assert_eq!(stats.loss_ratio, Some(1.0));
        assert_eq!(stats.min_ms, None);
        assert_eq!(stats.avg_ms, None);
    }

    #[test]
    fn test_stats_mixed_window() {
        let mut history = History::new(8);
        history.record(success_ms(0, 10));
        history.record(Sample::loss(at(1)));
        history.record(success_ms(2, 30));
        history.record(success_ms(3, 20));

        let stats = history.stats();
        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.success_count, 3);
        assert_eq!(stats.min_ms, Some(10.0));
        assert_eq!(stats.max_ms, Some(30.0));
        assert_eq!(stats.avg_ms, Some(20.0));
        assert_eq!(stats.loss_ratio, Some(0.25));
        // |30-10| and |20-30| over the successful series
        assert_eq!(stats.jitter_ms, Some(15.0));
    }

    #[test]
    fn test_jitter_zero_for_identical_latencies() {
        let mut history = History::new(16);
        for i in 0..6 {
            history.record(success_ms(i, 42));
        }

        assert_eq!(history.stats().jitter_ms, Some(0.0));
    }

    #[test]
    fn test_jitter_single_success_is_zero() {
        let mut history = History::new(4);
        history.record(success_ms(0, 42));

        assert_eq!(history.stats().jitter_ms, Some(0.0));
    }

    #[test]
    fn test_recent_latencies_skips_losses_and_thins() {
        let mut history = History::new(256);
        for i in 0..120 {
            if i % 3 == 0 {
                history.record(Sample::loss(at(i)));
            } else {
                history.record(success_ms(i, 10 + i as u64));
            }
        }

        let points = history.recent_latencies(50);
        assert!(points.len() <= 80);
        assert!(!points.is_empty());
        let full = history.recent_latencies(usize::MAX);
        assert_eq!(full.len(), 80);
    }

    #[test]
    fn test_distribution_percentiles() {
        let samples: Vec<Sample> = (1..=100).map(|i| success_ms(i, i as u64)).collect();
        let dist = LatencyDistribution::from_samples(&samples).unwrap();

        assert_eq!(dist.count(), 100);
        let p50 = dist.percentile_ms(0.5).unwrap();
        assert!((40.0..=60.0).contains(&p50));
        let p99 = dist.percentile_ms(0.99).unwrap();
        assert!(p99 >= p50);
    }

    #[test]
    fn test_distribution_empty() {
        let dist = LatencyDistribution::from_samples(&[]).unwrap();
        assert_eq!(dist.percentile_ms(0.5), None);
    }
}
