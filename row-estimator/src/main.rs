//! Estimates Cassandra row sizes by sampling token ranges

use clap::{CommandFactory, Parser};
use std::sync::Arc;
use tracing::{event, Level};

use row_estimator::args::{self, Args};
use row_estimator::conf::RunConfig;
use row_estimator::source::ScyllaSource;
use row_estimator::{estimate, trace, Error};

/// Log the settings for this run
///
/// # Arguments
///
/// * `conf` - The settings to log
fn log_settings(conf: &RunConfig) {
    event!(Level::INFO, "Endpoint: {}", conf.endpoint());
    event!(Level::INFO, "Keyspace name: {}", conf.keyspace);
    event!(Level::INFO, "Table name: {}", conf.table);
    event!(Level::INFO, "Client SSL: {}", conf.ssl);
    event!(Level::INFO, "Token step: {}", conf.token_step);
    event!(Level::INFO, "Limit of rows per token step: {}", conf.rows_per_request);
    event!(Level::INFO, "Pagination: {}", conf.pagination);
    event!(Level::INFO, "Execution-timeout: {}", conf.execution_timeout);
    event!(Level::INFO, "Mode: {}", conf.mode());
}

/// Connect to our cluster then sample and report on our table
///
/// # Arguments
///
/// * `conf` - The settings for this run
async fn estimate(conf: &RunConfig) -> Result<(), Error> {
    let source = ScyllaSource::connect(conf).await?;
    let report = estimate::run(Arc::new(source), conf).await?;
    report.log();
    Ok(())
}

#[tokio::main]
async fn main() {
    // show our help if we got nothing to work with
    if args::no_args() {
        if let Err(err) = args::write_help(&mut std::io::stdout()) {
            eprintln!("{err}");
            std::process::exit(1);
        }
        return;
    }
    // load command line args
    let args = Args::parse();
    // build our config before we try to connect to anything
    let conf = match RunConfig::new(&args) {
        Ok(conf) => conf,
        Err(err) => {
            eprintln!("{err}\n");
            eprintln!("{}", Args::command().render_usage());
            std::process::exit(1);
        }
    };
    trace::setup("row-estimator", conf.log_level);
    log_settings(&conf);
    if let Err(err) = estimate(&conf).await {
        event!(Level::ERROR, "{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}
