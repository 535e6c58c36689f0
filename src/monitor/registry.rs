//! Owned registry of monitored servers.
//!
//! Maps each `ServerId` to its server, history, and probe-loop handle. The
//! outer lock guards only map mutation and lookup; sample recording and
//! reads go through per-entry locks, so readers of one server never block
//! on another server's writer.

use crate::monitor::error::ValidationError;
use crate::monitor::history::{History, RollingStats, Sample};
use crate::monitor::scheduler::{ProbeLoopHandle, Scheduler};
use crate::monitor::server::{NewServer, Server, ServerId, Status, StatusThresholds};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// One registered server: identity, history, and its loop handle.
pub struct ServerEntry {
    pub server: Server,
    history: RwLock<History>,
    enabled: AtomicBool,
    handle: Mutex<Option<ProbeLoopHandle>>,
}

impl ServerEntry {
    pub fn new(server: Server, history_capacity: usize) -> Self {
        Self {
            server,
            history: RwLock::new(History::new(history_capacity)),
            enabled: AtomicBool::new(true),
            handle: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Append one sample. Called only from this server's probe loop.
    pub fn record(&self, sample: Sample) {
        let mut history = self.history.write().unwrap_or_else(|p| p.into_inner());
        history.record(sample);
    }

    pub fn stats(&self) -> RollingStats {
        let history = self.history.read().unwrap_or_else(|p| p.into_inner());
        history.stats()
    }

    /// Copy of the current window, oldest sample first.
    pub fn samples(&self) -> Vec<Sample> {
        let history = self.history.read().unwrap_or_else(|p| p.into_inner());
        history.samples()
    }

    pub fn recent_latencies(&self, max_points: usize) -> Vec<f64> {
        let history = self.history.read().unwrap_or_else(|p| p.into_inner());
        history.recent_latencies(max_points)
    }

    /// Status derived from the latest sample under the given thresholds.
    pub fn status(&self, thresholds: StatusThresholds) -> Status {
        let history = self.history.read().unwrap_or_else(|p| p.into_inner());
        match history.latest() {
            None => Status::Unknown,
            Some(sample) => thresholds.classify(sample.latency),
        }
    }

    fn attach_handle(&self, handle: ProbeLoopHandle) {
        let mut slot = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(handle);
    }

    fn take_handle(&self) -> Option<ProbeLoopHandle> {
        let mut slot = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        slot.take()
    }
}

/// Registry of all currently monitored servers.
pub struct ServerRegistry {
    servers: RwLock<HashMap<ServerId, Arc<ServerEntry>>>,
    scheduler: Scheduler,
    history_capacity: usize,
    next_id: AtomicU64,
}

impl ServerRegistry {
    pub fn new(scheduler: Scheduler, history_capacity: usize) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            scheduler,
            history_capacity,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a server and start probing it immediately.
    pub fn add_server(&self, new: NewServer) -> Result<ServerId, ValidationError> {
        if new.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(-90.0..=90.0).contains(&new.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(new.latitude));
        }
        if !(-180.0..=180.0).contains(&new.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(new.longitude));
        }
        if !is_valid_target(&new.target) {
            return Err(ValidationError::InvalidTarget(new.target));
        }

        let mut servers = self.servers.write().unwrap_or_else(|p| p.into_inner());
        if servers.values().any(|e| e.server.name == new.name) {
            return Err(ValidationError::DuplicateName(new.name));
        }

        let id = ServerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let server = Server {
            id,
            name: new.name,
            target: new.target,
            latitude: new.latitude,
            longitude: new.longitude,
            city: new.city,
        };
        info!(id = %id, name = %server.name, host = %server.target, "server added");

        let entry = Arc::new(ServerEntry::new(server, self.history_capacity));
        let handle = self.scheduler.spawn(Arc::clone(&entry));
        entry.attach_handle(handle);
        servers.insert(id, entry);
        Ok(id)
    }

    /// Remove a server: cancel its loop and discard its history.
    ///
    /// History is discarded with the entry; keeping data for servers the
    /// operator deleted would only leak.
    pub fn remove_server(&self, id: ServerId) -> Result<(), ValidationError> {
        let entry = {
            let mut servers = self.servers.write().unwrap_or_else(|p| p.into_inner());
            servers
                .remove(&id)
                .ok_or(ValidationError::UnknownServer(id.0))?
        };
        if let Some(handle) = entry.take_handle() {
            handle.cancel();
        }
        info!(id = %id, name = %entry.server.name, "server removed");
        Ok(())
    }

    /// Pause or resume probing without touching history.
    pub fn set_enabled(&self, id: ServerId, enabled: bool) -> Result<(), ValidationError> {
        let entry = self.entry(id).ok_or(ValidationError::UnknownServer(id.0))?;
        entry.set_enabled(enabled);
        debug!(id = %id, enabled = enabled, "server enabled flag changed");
        Ok(())
    }

    pub fn entry(&self, id: ServerId) -> Option<Arc<ServerEntry>> {
        let servers = self.servers.read().unwrap_or_else(|p| p.into_inner());
        servers.get(&id).cloned()
    }

    /// All current entries ordered by id, for render and export passes.
    pub fn snapshot(&self) -> Vec<Arc<ServerEntry>> {
        let servers = self.servers.read().unwrap_or_else(|p| p.into_inner());
        let mut entries: Vec<Arc<ServerEntry>> = servers.values().cloned().collect();
        entries.sort_by_key(|e| e.server.id);
        entries
    }

    pub fn len(&self) -> usize {
        let servers = self.servers.read().unwrap_or_else(|p| p.into_inner());
        servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every probe loop and wait for the threads to exit.
    pub fn shutdown(&self) {
        let entries = {
            let mut servers = self.servers.write().unwrap_or_else(|p| p.into_inner());
            servers.drain().map(|(_, e)| e).collect::<Vec<_>>()
        };
        // Cancel everything first so the joins below overlap.
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(handle) = entry.take_handle() {
                handle.cancel();
                handles.push(handle);
            }
        }
        for handle in handles {
            handle.join();
        }
        info!("all probe loops stopped");
    }
}

/// Accept an IP literal or a plausible hostname.
fn is_valid_target(target: &str) -> bool {
    if target.parse::<IpAddr>().is_ok() {
        return true;
    }
    if target.is_empty() || target.len() > 253 {
        return false;
    }
    target.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
