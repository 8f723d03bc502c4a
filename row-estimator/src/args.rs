//! The command line args for the row estimator

use clap::{CommandFactory, Parser};
use std::io::Write;
use std::path::PathBuf;

use crate::conf::LogLevel;
use crate::Error;

/// Estimate the size of rows in a Cassandra or ScyllaDB table by sampling token ranges
///
/// Flags that are not set fall back to the config file, then to environment
/// variables prefixed with `ROW_ESTIMATOR__`, then to the defaults below.
#[derive(Parser, Debug, Clone, Default)]
#[clap(version, author)]
pub struct Args {
    /// The path to a yaml config to load settings from
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// The Cassandra endpoint to connect to [default: 127.0.0.1]
    #[clap(long)]
    pub hostname: Option<String>,
    /// The Cassandra native transport port
    #[clap(long)]
    pub port: Option<u16>,
    /// Connect with TLS
    #[clap(long)]
    pub ssl: bool,
    /// The path to the CA certificate to verify the cluster with when using TLS
    #[clap(long)]
    pub path_cert: Option<PathBuf>,
    /// The user to authenticate as
    #[clap(long)]
    pub username: Option<String>,
    /// The password to authenticate with
    #[clap(long)]
    pub password: Option<String>,
    /// The keyspace the table to sample is in
    #[clap(long)]
    pub keyspace: Option<String>,
    /// The table to sample
    #[clap(long)]
    pub table: Option<String>,
    /// How many seconds to sample for before reporting [default: 360]
    #[clap(long)]
    pub execution_timeout: Option<u64>,
    /// Only use every nth token in the ring, for example 2, 4, 8, ..., 256 [default: 4]
    #[clap(long)]
    pub token_step: Option<usize>,
    /// The most rows to sample from each token range [default: 1000]
    #[clap(long)]
    pub rows_per_request: Option<u32>,
    /// The number of rows to fetch per page [default: 200]
    #[clap(long)]
    pub pagination: Option<i32>,
    /// The datacenter to prefer when routing queries [default: datacenter1]
    #[clap(long)]
    pub dc: Option<String>,
    /// Estimate the size of rows serialized as JSON
    #[clap(long)]
    pub json: bool,
    /// How many seconds to wait for a connection to the cluster [default: 360]
    #[clap(long)]
    pub setup_time: Option<u64>,
    /// The level to log at [default: info]
    #[clap(long, value_enum)]
    pub log_level: Option<LogLevel>,
    /// Do not draw a progress spinner while sampling
    #[clap(long)]
    pub no_progress: bool,
}

/// Check if we were called without any arguments at all
pub fn no_args() -> bool {
    std::env::args_os().len() <= 1
}

/// Write our help text out
///
/// # Arguments
///
/// * `out` - Where to write our help
pub fn write_help<W: Write>(out: &mut W) -> Result<(), Error> {
    let help = Args::command().render_help();
    writeln!(out, "{help}")?;
    out.flush()?;
    Ok(())
}
