use anyhow::{Context, Result};
use clap::Parser;
use laglens::monitor::init_logging;
use std::net::UdpSocket;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "laglens-echo")]
#[command(about = "UDP echo responder used as a probe target")]
struct EchoConfig {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Bind port
    #[arg(long, default_value_t = 7)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    log_format: String,
}

fn main() {
    let config = EchoConfig::parse();

    init_logging(&config.log_level, config.log_format == "json");

    if let Err(e) = run(config) {
        error!(error = %e, "Echo responder failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: EchoConfig) -> Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let socket = UdpSocket::bind(&addr).with_context(|| format!("failed to bind to {}", addr))?;

    info!(address = %addr, "echo responder listening");

    let mut buf = [0u8; 64];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((len, peer)) => {
                debug!(peer = %peer, bytes = len, "echoing datagram");
                if let Err(e) = socket.send_to(&buf[..len], peer) {
                    warn!(peer = %peer, error = %e, "failed to echo datagram");
                }
            }
            Err(e) => {
                warn!(error = %e, "receive failed");
            }
        }
    }
}
