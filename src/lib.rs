//! LagLens - live terminal map of network round-trip latency
//!
//! This library continuously probes a set of geographically located servers
//! on independent schedules, keeps a bounded rolling history per server, and
//! renders the results as an ASCII world map with status markers, sparkline
//! trends, and rolling statistics.

pub mod monitor;
pub mod render;
