//! Per-server probe loops and their cancellation.
//!
//! Every monitored server gets its own thread running probe / record /
//! sleep until cancelled. Loops share nothing but the prober, so one slow
//! or unreachable target never delays another server's schedule.

use crate::monitor::error::ProbeError;
use crate::monitor::history::Sample;
use crate::monitor::probe::Prober;
use crate::monitor::registry::ServerEntry;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Cancellation token shared between a probe loop and its owner.
///
/// Built on a condvar so cancelling interrupts the inter-probe sleep
/// immediately instead of waiting out the interval.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        let mut cancelled = lock.lock().unwrap_or_else(|p| p.into_inner());
        *cancelled = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleep for up to `timeout`; returns true if cancelled during the wait.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut cancelled = lock.lock().unwrap_or_else(|p| p.into_inner());
        let deadline = std::time::Instant::now() + timeout;
        while !*cancelled {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(|p| p.into_inner());
            cancelled = guard;
        }
        true
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one server's running probe loop.
pub struct ProbeLoopHandle {
    token: CancelToken,
    thread: JoinHandle<()>,
}

impl ProbeLoopHandle {
    /// Request the loop to stop; returns without waiting for the thread.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the loop thread to exit.
    pub fn join(self) {
        self.token.cancel();
        if self.thread.join().is_err() {
            warn!("probe loop thread panicked");
        }
    }
}

/// Spawns and configures independent probe loops.
pub struct Scheduler {
    prober: Arc<dyn Prober>,
    interval: Duration,
    timeout: Duration,
    permission_alerted: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(prober: Arc<dyn Prober>, interval: Duration, timeout: Duration) -> Self {
        Self {
            prober,
            interval,
            timeout,
            permission_alerted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the probe loop for one server.
    ///
    /// The first probe fires immediately so a newly added server gives
    /// feedback without waiting a full interval.
    pub fn spawn(&self, entry: Arc<ServerEntry>) -> ProbeLoopHandle {
        let token = CancelToken::new();
        let loop_token = token.clone();
        let prober = Arc::clone(&self.prober);
        let permission_alerted = Arc::clone(&self.permission_alerted);
        let interval = self.interval;
        let timeout = self.timeout;

        let thread = thread::spawn(move || {
            probe_loop(
                prober,
                entry,
                loop_token,
                interval,
                timeout,
                permission_alerted,
            );
        });

        ProbeLoopHandle { token, thread }
    }
}

fn probe_loop(
    prober: Arc<dyn Prober>,
    entry: Arc<ServerEntry>,
    token: CancelToken,
    interval: Duration,
    timeout: Duration,
    permission_alerted: Arc<AtomicBool>,
) {
    let name = entry.server.name.clone();
    info!(server = %name, host = %entry.server.target, "probe loop started");

    loop {
        if token.is_cancelled() {
            break;
        }

        if entry.is_enabled() {
            let outcome = prober.probe(&entry.server.target, timeout);

            // A removal racing the in-flight probe discards its result so a
            // removed server never receives a late sample.
            if token.is_cancelled() {
                break;
            }

            let sample = match outcome {
                Ok(latency) => {
                    debug!(
                        server = %name,
                        latency_ms = latency.as_secs_f64() * 1_000.0,
                        "probe succeeded"
                    );
                    Sample::success(Utc::now(), latency)
                }
                Err(ProbeError::PermissionDenied(ref reason)) => {
                    if !permission_alerted.swap(true, Ordering::Relaxed) {
                        error!(
                            reason = %reason,
                            "probe sockets denied by the operating system; every probe will fail until resolved"
                        );
                    }
                    Sample::loss(Utc::now())
                }
                Err(ProbeError::ResolutionFailed(ref target)) => {
                    warn!(server = %name, host = %target, "resolution failed, recording loss");
                    Sample::loss(Utc::now())
                }
                Err(err) => {
                    debug!(server = %name, error = %err, "probe failed, recording loss");
                    Sample::loss(Utc::now())
                }
            };
            entry.record(sample);
        }

        if token.wait(interval) {
            break;
        }
    }

    info!(server = %name, "probe loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::probe::MockProber;
    use crate::monitor::server::{Server, ServerId};
    use std::time::Instant;

    fn test_entry(name: &str) -> Arc<ServerEntry> {
        Arc::new(ServerEntry::new(
            Server {
                id: ServerId(1),
                name: name.to_string(),
                target: "192.0.2.1".to_string(),
                latitude: 0.0,
                longitude: 0.0,
                city: None,
            },
            16,
        ))
    }

    #[test]
    fn test_first_probe_fires_immediately() {
        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .returning(|_, _| Ok(Duration::from_millis(5)));

        let scheduler = Scheduler::new(
            Arc::new(prober),
            Duration::from_secs(60),
            Duration::from_millis(100),
        );
        let entry = test_entry("immediate");
        let handle = scheduler.spawn(Arc::clone(&entry));

        // Well before the first 60s interval elapses there must be a sample.
        let deadline = Instant::now() + Duration::from_millis(500);
        while entry.stats().sample_count == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(entry.stats().sample_count, 1);
        handle.join();
    }

    #[test]
    fn test_failed_probe_recorded_as_loss_and_loop_continues() {
        let mut prober = MockProber::new();
        prober.expect_probe().returning(|target, _| {
            Err(ProbeError::Timeout {
                target: target.to_string(),
                timeout_ms: 10,
            })
        });

        let scheduler = Scheduler::new(
            Arc::new(prober),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );
        let entry = test_entry("lossy");
        let handle = scheduler.spawn(Arc::clone(&entry));

        let deadline = Instant::now() + Duration::from_secs(2);
        while entry.stats().sample_count < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.join();

        let stats = entry.stats();
        assert!(stats.sample_count >= 3);
        assert_eq!(stats.loss_ratio, Some(1.0));
        assert_eq!(stats.min_ms, None);
    }

    #[test]
    fn test_cancel_interrupts_sleep_promptly() {
        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .returning(|_, _| Ok(Duration::from_millis(1)));

        let scheduler = Scheduler::new(
            Arc::new(prober),
            Duration::from_secs(3600),
            Duration::from_millis(50),
        );
        let entry = test_entry("cancelled");
        let handle = scheduler.spawn(entry);

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        handle.join();
        // The hour-long sleep must be interrupted, not waited out.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_disabled_entry_records_nothing() {
        let mut prober = MockProber::new();
        prober
            .expect_probe()
            .returning(|_, _| Ok(Duration::from_millis(1)));

        let scheduler = Scheduler::new(
            Arc::new(prober),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        let entry = test_entry("disabled");
        entry.set_enabled(false);
        let handle = scheduler.spawn(Arc::clone(&entry));

        thread::sleep(Duration::from_millis(100));
        handle.join();
        assert_eq!(entry.stats().sample_count, 0);
    }

    #[test]
    fn test_cancel_token_wait() {
        let token = CancelToken::new();
        assert!(!token.wait(Duration::from_millis(10)));

        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait(Duration::from_secs(10)));
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
