use crate::monitor::constants::PROBE_PACKET_SIZE;
use crate::monitor::error::ProbeError;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Trait for issuing one latency probe to one target.
///
/// A probe blocks only the calling thread and is bounded by `timeout`;
/// retry policy lives in the scheduler, never here.
pub trait Prober: Send + Sync {
    fn probe(&self, target: &str, timeout: Duration) -> Result<Duration, ProbeError>;
}

/// UDP echo prober: one sequenced datagram per probe, matched on reply.
///
/// Each probe binds a fresh ephemeral socket and connects it to the target,
/// so replies from other probes cannot be confused with this one's.
pub struct UdpEchoProber {
    port: u16,
    sequence: AtomicU64,
}

impl UdpEchoProber {
    /// Create a prober that probes `port` on every target.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            sequence: AtomicU64::new(0),
        }
    }

    fn resolve(&self, target: &str) -> Result<SocketAddr, ProbeError> {
        let mut addrs = (target, self.port)
            .to_socket_addrs()
            .map_err(|e| {
                debug!(host = target, error = %e, "resolution failed");
                ProbeError::ResolutionFailed(target.to_string())
            })?;
        addrs
            .next()
            .ok_or_else(|| ProbeError::ResolutionFailed(target.to_string()))
    }
}

fn socket_error(target: &str, err: std::io::Error) -> ProbeError {
    match err.kind() {
        ErrorKind::PermissionDenied => ProbeError::PermissionDenied(err.to_string()),
        _ => ProbeError::Unreachable {
            target: target.to_string(),
            reason: err.to_string(),
        },
    }
}

impl Prober for UdpEchoProber {
    fn probe(&self, target: &str, timeout: Duration) -> Result<Duration, ProbeError> {
        let addr = self.resolve(target)?;
        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).map_err(|e| socket_error(target, e))?;
        socket
            .connect(addr)
            .map_err(|e| socket_error(target, e))?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let payload = sequence.to_le_bytes();
        let started = Instant::now();
        socket.send(&payload).map_err(|e| socket_error(target, e))?;

        let mut buf = [0u8; PROBE_PACKET_SIZE];
        loop {
            // Shrink the read timeout to the remaining deadline so stray
            // datagrams cannot extend the probe past `timeout`.
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(ProbeError::Timeout {
                    target: target.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            socket
                .set_read_timeout(Some(remaining))
                .map_err(|e| socket_error(target, e))?;

            match socket.recv(&mut buf) {
                Ok(len) if len >= PROBE_PACKET_SIZE && buf == payload => {
                    let latency = started.elapsed();
                    debug!(
                        host = target,
                        sequence = sequence,
                        latency_us = latency.as_micros() as u64,
                        "probe reply received"
                    );
                    return Ok(latency);
                }
                Ok(len) => {
                    debug!(
                        host = target,
                        bytes_received = len,
                        "mismatched reply, waiting for matching echo"
                    );
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(ProbeError::Timeout {
                        target: target.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
                    ) =>
                {
                    debug!(host = target, error = %e, "target refused probe");
                    return Err(ProbeError::Unreachable {
                        target: target.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(socket_error(target, e)),
            }
        }
    }
}

/// One-time socket check run at process start.
///
/// A process-wide probe denial would otherwise surface as identical losses
/// on every server; detect it once here and report it prominently.
pub fn startup_check() -> Result<(), ProbeError> {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(ProbeError::PermissionDenied(e.to_string()))
        }
        Err(e) => {
            warn!(error = %e, "probe socket check failed for a non-permission reason");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use std::net::UdpSocket;
    use std::thread;

    mock! {
        pub Prober {}

        impl Prober for Prober {
            fn probe(&self, target: &str, timeout: Duration) -> Result<Duration, ProbeError>;
        }
    }

    fn spawn_echo() -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        thread::spawn(move || {
            let mut buf = [0u8; 64];
            while let Ok((len, peer)) = socket.recv_from(&mut buf) {
                let _ = socket.send_to(&buf[..len], peer);
            }
        });
        port
    }

    #[test]
    fn test_probe_against_local_echo() {
        let port = spawn_echo();
        let prober = UdpEchoProber::new(port);

        let latency = prober
            .probe("127.0.0.1", Duration::from_millis(500))
            .unwrap();
        assert!(latency <= Duration::from_millis(500));
    }

    #[test]
    fn test_probe_timeout_on_silent_target() {
        // Bound but never replying: every probe must time out.
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let prober = UdpEchoProber::new(port);

        let started = Instant::now();
        let result = prober.probe("127.0.0.1", Duration::from_millis(100));
        assert!(matches!(result, Err(ProbeError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_probe_resolution_failure() {
        let prober = UdpEchoProber::new(9);
        let result = prober.probe("no-such-host.invalid", Duration::from_millis(100));
        assert!(matches!(result, Err(ProbeError::ResolutionFailed(_))));
    }

    #[test]
    fn test_startup_check_passes_here() {
        assert!(startup_check().is_ok());
    }
}

#[cfg(test)]
pub use tests::MockProber;
