//! The config for a single estimation run

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::Args;
use crate::Error;

/// The log level to set
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    /// Do not log any info
    #[serde(alias = "off")]
    Off,
    /// Log at the error level
    #[serde(alias = "error")]
    Error,
    /// Log at the warning level
    #[serde(alias = "warn")]
    Warn,
    /// Log at the info level
    #[default]
    #[serde(alias = "info")]
    Info,
    /// Log at the debug level
    #[serde(alias = "debug")]
    Debug,
    /// Log at the tracing level
    #[serde(alias = "trace")]
    Trace,
}

impl LogLevel {
    /// Cast this log level to a tracing filter
    #[must_use]
    pub fn to_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        match self {
            LogLevel::Off => tracing_subscriber::filter::LevelFilter::OFF,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
        }
    }
}

impl std::fmt::Display for LogLevel {
    /// Allow the log level to be displayed
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LogLevel::Off => write!(f, "Off"),
            LogLevel::Error => write!(f, "Error"),
            LogLevel::Warn => write!(f, "Warn"),
            LogLevel::Info => write!(f, "Info"),
            LogLevel::Debug => write!(f, "Debug"),
            LogLevel::Trace => write!(f, "Trace"),
        }
    }
}

/// What to measure for each sampled row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Measure each column value in a row
    Raw,
    /// Measure each row serialized as JSON
    Json,
}

impl std::fmt::Display for SampleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SampleMode::Raw => write!(f, "Raw"),
            SampleMode::Json => write!(f, "Json"),
        }
    }
}

/// The settings for a single estimation run
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// The endpoint to connect to
    pub hostname: String,
    /// The native transport port to connect to
    pub port: u16,
    /// The user to authenticate as
    #[serde(default)]
    pub username: Option<String>,
    /// The password to authenticate with
    #[serde(default)]
    pub password: Option<String>,
    /// Whether to connect with TLS
    pub ssl: bool,
    /// The CA certificate to verify the cluster with
    #[serde(default)]
    pub path_cert: Option<PathBuf>,
    /// The keyspace the table is in
    pub keyspace: String,
    /// The table to sample
    pub table: String,
    /// How many seconds to sample before reporting
    pub execution_timeout: u64,
    /// Only every nth token in the ring is used as a range boundary
    pub token_step: usize,
    /// The most rows to pull from a single token range
    pub rows_per_request: u32,
    /// The number of rows to fetch per page
    pub pagination: i32,
    /// The datacenter to prefer when routing queries
    pub dc: String,
    /// Whether to measure rows as JSON
    pub json: bool,
    /// How many seconds to wait for a connection
    pub setup_time: u64,
    /// The level to log at
    pub log_level: LogLevel,
    /// Whether to draw a progress spinner
    pub progress: bool,
}

impl RunConfig {
    /// Build a run config from our layered config sources
    ///
    /// Defaults are overlaid by the config file, then environment variables
    /// prefixed with `ROW_ESTIMATOR__`, then any flags that were set.
    ///
    /// # Arguments
    ///
    /// * `args` - The command line args
    pub fn new(args: &Args) -> Result<Self, Error> {
        let mut builder = config::Config::builder()
            .set_default("hostname", "127.0.0.1")?
            .set_default("ssl", false)?
            .set_default("execution_timeout", 360_i64)?
            .set_default("token_step", 4_i64)?
            .set_default("rows_per_request", 1000_i64)?
            .set_default("pagination", 200_i64)?
            .set_default("dc", "datacenter1")?
            .set_default("json", false)?
            .set_default("setup_time", 360_i64)?
            .set_default("log_level", LogLevel::default().to_string())?
            .set_default("progress", true)?;
        // load from a file if we were given one
        if let Some(path) = &args.config {
            builder = builder
                .add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }
        let conf: RunConfig = builder
            // then overlay any environment args ontop
            .add_source(
                config::Environment::with_prefix("row_estimator")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // flags always win
            .set_override_option("hostname", args.hostname.clone())?
            .set_override_option("port", args.port.map(i64::from))?
            .set_override_option("ssl", args.ssl.then_some(true))?
            .set_override_option(
                "path_cert",
                args.path_cert.as_ref().map(|path| path.to_string_lossy().to_string()),
            )?
            .set_override_option("username", args.username.clone())?
            .set_override_option("password", args.password.clone())?
            .set_override_option("keyspace", args.keyspace.clone())?
            .set_override_option("table", args.table.clone())?
            .set_override_option("execution_timeout", args.execution_timeout)?
            .set_override_option("token_step", args.token_step.map(|step| step as u64))?
            .set_override_option("rows_per_request", args.rows_per_request.map(i64::from))?
            .set_override_option("pagination", args.pagination.map(i64::from))?
            .set_override_option("dc", args.dc.clone())?
            .set_override_option("json", args.json.then_some(true))?
            .set_override_option("setup_time", args.setup_time)?
            .set_override_option("log_level", args.log_level.map(|level| level.to_string()))?
            .set_override_option("progress", args.no_progress.then_some(false))?
            .build()?
            .try_deserialize()?;
        conf.validate()?;
        Ok(conf)
    }

    /// Make sure this config describes a run we can actually perform
    pub fn validate(&self) -> Result<(), Error> {
        if self.keyspace.is_empty() || self.table.is_empty() {
            return Err(Error::invalid_config("keyspace and table must not be empty"));
        }
        if self.token_step == 0 {
            return Err(Error::invalid_config("token-step must be at least 1"));
        }
        if self.rows_per_request == 0 {
            return Err(Error::invalid_config("rows-per-request must be at least 1"));
        }
        if self.pagination <= 0 {
            return Err(Error::invalid_config("pagination must be at least 1"));
        }
        if self.ssl && self.path_cert.is_none() {
            return Err(Error::invalid_config("ssl requires path-cert to be set"));
        }
        Ok(())
    }

    /// Get what this run should measure
    pub fn mode(&self) -> SampleMode {
        if self.json {
            SampleMode::Json
        } else {
            SampleMode::Raw
        }
    }

    /// Get the credentials to use if both a username and password are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    /// Get the endpoint to connect to
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Get how long to sample for
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout)
    }

    /// Get how long to wait for a connection
    pub fn setup_time(&self) -> Duration {
        Duration::from_secs(self.setup_time)
    }
}
