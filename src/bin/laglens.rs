use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::*;
use laglens::monitor::constants::SPARKLINE_MAX_POINTS;
use laglens::monitor::{
    default_servers, export, init_logging, probe, Config, RollingStats, Scheduler, ServerEntry,
    ServerRegistry, Status, StatusThresholds, UdpEchoProber,
};
use laglens::render::{
    compose, project_markers, sparkline, BaseMapCache, CellClass, Frame, Projection, WorldGeometry,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

fn main() {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize structured logging with config options
    init_logging(&config.log_level, config.is_json_format());

    // Validate configuration
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "Monitor failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<()> {
    // A process-wide socket denial would fail every probe identically, so
    // detect it before any loop starts.
    probe::startup_check().context(
        "probe sockets are not permitted; run with sufficient privileges or adjust sandboxing",
    )?;

    let prober = Arc::new(UdpEchoProber::new(config.probe_port));
    let scheduler = Scheduler::new(prober, config.interval(), config.timeout());
    let registry = Arc::new(ServerRegistry::new(scheduler, config.capacity));

    if !config.no_default_servers {
        for server in default_servers() {
            let name = server.name.clone();
            match registry.add_server(server) {
                Ok(id) => debug!(id = %id, name = %name, "default server registered"),
                Err(e) => warn!(name = %name, error = %e, "skipping default server"),
            }
        }
    }

    let geometry = WorldGeometry::embedded().context("failed to load world geometry")?;
    let cache = BaseMapCache::new(geometry);
    let projection = Projection::new(config.width, config.height);
    let thresholds = config.thresholds();

    info!(
        servers = registry.len(),
        interval_secs = config.interval_secs,
        timeout_ms = config.timeout_ms,
        grid = %format!("{}x{}", config.width, config.height),
        "monitoring started"
    );

    let export_dir = std::path::PathBuf::from(&config.export_dir);
    let export_period = Duration::from_secs(config.export_every_secs);
    let mut last_export = Instant::now();

    loop {
        thread::sleep(config.refresh());

        if config.export_every_secs > 0 && last_export.elapsed() >= export_period {
            // Export failures are reported but never stop monitoring.
            match export::write_snapshot(&registry, &export_dir) {
                Ok(path) => info!(path = %path.display(), "snapshot exported"),
                Err(e) => warn!(error = %e, "snapshot export failed"),
            }
            last_export = Instant::now();
        }

        if config.quiet {
            continue;
        }

        let base = cache.get(&projection);
        let entries = registry.snapshot();
        let markers = project_markers(&entries, &projection, thresholds);
        let frame = compose(&base, &markers);
        print_dashboard(&frame, &entries, thresholds);
    }
}

/// Clear the terminal and print the map plus one stats panel per server.
fn print_dashboard(frame: &Frame, entries: &[Arc<ServerEntry>], thresholds: StatusThresholds) {
    print!("\x1B[2J\x1B[1;1H");
    println!(
        "{}  {}",
        "LagLens".bold(),
        format!("last update {}", Local::now().format("%H:%M:%S")).dimmed()
    );
    println!();

    for row in 0..frame.height {
        let mut line = String::new();
        for col in 0..frame.width {
            let ch = frame.char_at(col, row);
            let cell = match frame.class_at(col, row) {
                CellClass::Ocean => ch.to_string().normal(),
                CellClass::Land => ch.to_string().dimmed(),
                CellClass::Marker(_, status) => colorize_status(ch, status),
            };
            line.push_str(&cell.to_string());
        }
        println!("{}", line);
    }
    println!();

    for entry in entries {
        let stats = entry.stats();
        let status = entry.status(thresholds);
        let latencies = entry.recent_latencies(SPARKLINE_MAX_POINTS);
        let spark = colorize_status_str(
            &sparkline::render(&latencies),
            sparkline::classify(&latencies, thresholds),
        );

        println!(
            "  {:<20} {}  {}",
            entry.server.name,
            latency_indicator(entry, status),
            spark
        );
        println!("      {}", format_stats(&stats).dimmed());
    }
}

/// Latest-probe indicator in the style `● 42 ms`, colored by status.
fn latency_indicator(entry: &Arc<ServerEntry>, status: Status) -> String {
    let latest = entry
        .samples()
        .last()
        .and_then(|s| s.latency_ms());
    match (status, latest) {
        (Status::Unknown, _) => "○ waiting".dimmed().to_string(),
        (Status::Unreachable, _) => "● FAILED".red().bold().to_string(),
        (status, Some(ms)) => colorize_status_str(&format!("● {:.0} ms", ms), status),
        (_, None) => "● FAILED".red().bold().to_string(),
    }
}

fn format_stats(stats: &RollingStats) -> String {
    match (stats.avg_ms, stats.min_ms, stats.max_ms, stats.jitter_ms) {
        (Some(avg), Some(min), Some(max), Some(jitter)) => format!(
            "avg {:.1} ms | min {:.1} ms | max {:.1} ms | jitter {:.1} ms | loss {:.0}%",
            avg,
            min,
            max,
            jitter,
            stats.loss_ratio.unwrap_or(0.0) * 100.0
        ),
        _ if stats.has_data() => format!(
            "no successful probes | loss {:.0}%",
            stats.loss_ratio.unwrap_or(0.0) * 100.0
        ),
        _ => "no data yet".to_string(),
    }
}

fn colorize_status(ch: char, status: Status) -> ColoredString {
    colorize_status_colored(ch.to_string(), status)
}

fn colorize_status_str(text: &str, status: Status) -> String {
    colorize_status_colored(text.to_string(), status).to_string()
}

fn colorize_status_colored(text: String, status: Status) -> ColoredString {
    match status {
        Status::Unknown => text.normal(),
        Status::Healthy => text.green(),
        Status::Degraded => text.yellow(),
        Status::Critical => text.red(),
        Status::Unreachable => text.red().bold(),
    }
}
