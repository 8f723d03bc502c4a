//! Wires a run config into one bounded sampling run and reports on it

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

use crate::conf::{RunConfig, SampleMode};
use crate::monitor::{Monitor, MonitorTotals};
use crate::sampler::{SampleRun, SamplerState, TokenRangeSampler};
use crate::size::Footprint;
use crate::source::DataSource;
use crate::stats::Summary;
use crate::Error;

/// The statistics for a single run
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Column values were measured
    Raw {
        /// The stats over just the row values
        values: Summary,
        /// The stats over the row values plus the column names
        with_names: Summary,
        /// The total footprint of every column name
        column_bytes: u64,
        /// The number of columns in the table
        column_count: usize,
    },
    /// Rows were measured as JSON
    Json {
        /// The stats over the JSON rows
        rows: Summary,
    },
    /// We never got a single row back
    NoSamples {
        /// What we were measuring
        mode: SampleMode,
    },
}

/// Log a set of statistics
///
/// # Arguments
///
/// * `title` - What these stats describe
/// * `stats` - The stats to log
fn log_summary(title: &str, stats: &Summary) {
    event!(Level::INFO, "*** {title}");
    event!(Level::INFO, "Mean: {:06.2} B", stats.mean);
    event!(Level::INFO, "Weighted_mean: {:06.2} B", stats.weighted_mean);
    event!(Level::INFO, "Median: {:06.2} B", stats.median);
    event!(Level::INFO, "Min: {} B", stats.min);
    event!(Level::INFO, "Max: {} B", stats.max);
    event!(
        Level::INFO,
        "P10/P50/P90: {:06.2}/{:06.2}/{:06.2} B",
        stats.p10,
        stats.p50,
        stats.p90
    );
}

impl Report {
    /// Build a report from a finished sampling run
    ///
    /// # Arguments
    ///
    /// * `mode` - What was measured
    /// * `sizes` - The sampled row sizes in discovery order
    /// * `column_bytes` - The total footprint of every column name
    /// * `column_count` - The number of columns in the table
    pub fn new(mode: SampleMode, sizes: &[u64], column_bytes: u64, column_count: usize) -> Self {
        // never aggregate over nothing
        let Some(values) = Summary::new(sizes) else {
            return Report::NoSamples { mode };
        };
        match mode {
            SampleMode::Raw => Report::Raw {
                with_names: values.shifted(column_bytes),
                values,
                column_bytes,
                column_count,
            },
            SampleMode::Json => Report::Json { rows: values },
        }
    }

    /// Get the number of rows this report covers
    pub fn rows(&self) -> usize {
        match self {
            Report::Raw { values, .. } => values.count,
            Report::Json { rows } => rows.count,
            Report::NoSamples { .. } => 0,
        }
    }

    /// Log this report
    pub fn log(&self) {
        event!(Level::INFO, "Number of sampled rows: {}", self.rows());
        match self {
            Report::Raw {
                values,
                with_names,
                column_bytes,
                column_count,
            } => {
                log_summary("Estimated size of column names and values in a row", with_names);
                log_summary("Estimated size of values in a row", values);
                event!(Level::INFO, "Total column name size in a row: {column_bytes} B");
                event!(Level::INFO, "Total columns in a row: {column_count}");
            }
            Report::Json { rows } => {
                log_summary("Estimated size of a JSON row", rows);
            }
            Report::NoSamples { mode } => {
                event!(Level::WARN, "No samples collected in {mode} mode");
            }
        }
    }
}

/// Sample a source for up to our execution timeout and report on it
///
/// # Arguments
///
/// * `source` - The source to sample
/// * `conf` - The settings for this run
#[instrument(name = "estimate::run", skip_all, fields(keyspace = %conf.keyspace, table = %conf.table), err(Debug))]
pub async fn run<D: DataSource>(source: Arc<D>, conf: &RunConfig) -> Result<Report, Error> {
    let step = NonZeroUsize::new(conf.token_step)
        .ok_or_else(|| Error::invalid_config("token-step must be at least 1"))?;
    let footprint = Footprint::default();
    let mode = conf.mode();
    // get the schema for our table
    let columns = source.columns().await?;
    event!(
        Level::DEBUG,
        columns = columns.columns.len(),
        partition_key = %columns.partition_key.join(","),
        "Resolved table schema"
    );
    // spawn our monitor
    let (updates, monitor) = Monitor::spawn(conf.progress)?;
    // build our sampler and start it in the background
    let sampler = TokenRangeSampler::new(source, step, mode)
        .footprint(footprint)
        .monitor(updates);
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let task_columns = columns.clone();
    let mut handle =
        tokio::spawn(async move { sampler.sample(&task_columns, task_cancel).await });
    // wait for sampling to finish or our timeout to expire
    let run: SampleRun = match tokio::time::timeout(conf.execution_timeout(), &mut handle).await {
        Ok(joined) => joined??,
        Err(_) => {
            event!(
                Level::INFO,
                "Execution timeout of {}s reached; stopping sampler",
                conf.execution_timeout
            );
            cancel.cancel();
            handle.await??
        }
    };
    // wait for our monitor to clear its spinner
    let totals: MonitorTotals = monitor.await?;
    if run.state == SamplerState::TimedOut {
        event!(
            Level::INFO,
            "Sampled {} of {} token ranges before timing out",
            run.ranges_sampled,
            run.ranges_planned
        );
    }
    if run.ranges_failed > 0 {
        event!(
            Level::WARN,
            "{} of {} token ranges failed to sample",
            run.ranges_failed,
            run.ranges_planned
        );
    }
    event!(Level::DEBUG, rows = totals.rows, bytes = totals.bytes, "Sampling finished");
    let column_bytes = columns.names_size(&footprint);
    Ok(Report::new(mode, &run.sizes, column_bytes, columns.columns.len()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_report_adds_names() {
        let report = Report::new(SampleMode::Raw, &[22], 2, 2);
        let Report::Raw {
            values, with_names, ..
        } = report
        else {
            panic!("expected a raw report");
        };
        assert_eq!(values.mean, 22.0);
        assert_eq!(with_names.mean, 24.0);
        assert_eq!(with_names.min, 24);
        assert_eq!(format!("{:06.2}", with_names.mean), "024.00");
    }

    #[test]
    fn json_report_has_one_set() {
        let report = Report::new(SampleMode::Json, &[10, 20, 30], 99, 3);
        assert_eq!(report.rows(), 3);
        assert!(matches!(report, Report::Json { rows } if rows.median == 20.0));
    }

    #[test]
    fn empty_runs_have_no_samples() {
        let report = Report::new(SampleMode::Raw, &[], 2, 2);
        assert_eq!(report, Report::NoSamples { mode: SampleMode::Raw });
        assert_eq!(report.rows(), 0);
    }
}
