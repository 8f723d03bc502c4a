//! Sets up tracing for the row estimator on stdout

use tracing::{event, Level};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;

use crate::conf::LogLevel;

/// Build the filter for our local tracer
///
/// The scylla driver is noisy so it never logs below warnings.
///
/// # Arguments
///
/// * `level` - The log level to set
fn build_filter(level: LogLevel) -> Targets {
    let filter = level.to_filter();
    Targets::new()
        .with_default(filter)
        .with_target("scylla", std::cmp::min(filter, LevelFilter::WARN))
}

/// Setup our local tracer
///
/// # Arguments
///
/// * `name` - The name of the service to trace
/// * `level` - The log level to set
pub fn setup(name: &str, level: LogLevel) {
    // build our local tracer/subscriber
    let local = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(build_filter(level));
    // init our tracing registry; this only fails if a subscriber already exists
    if tracing_subscriber::registry().with(local).try_init().is_ok() {
        event!(Level::DEBUG, "Sending {level} logs for {name} to stdout");
    }
}
