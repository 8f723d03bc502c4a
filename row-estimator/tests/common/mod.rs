//! An in memory source to sample from in tests

#![allow(dead_code)]

use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use row_estimator::conf::{LogLevel, RunConfig, SampleMode};
use row_estimator::source::{ColumnMetadata, DataSource, RowStream, SampledRow, TokenRange};
use row_estimator::value::Value;
use row_estimator::Error;

/// A table held entirely in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    /// The tokens in our ring
    ring: Vec<i64>,
    /// The schema of our table
    columns: ColumnMetadata,
    /// Our rows keyed by the token of their partition key
    rows: BTreeMap<i64, SampledRow>,
    /// The ranges that fail when queried
    failing: HashSet<TokenRange>,
    /// How long to wait before returning each row
    delay: Option<Duration>,
    /// The number of range queries we have served
    queries: AtomicUsize,
}

impl MemorySource {
    /// Create an empty table with some columns
    ///
    /// # Arguments
    ///
    /// * `columns` - The names of our columns with the first being the partition key
    pub fn new(columns: &[&str]) -> Self {
        let columns = ColumnMetadata {
            columns: columns.iter().map(|name| (*name).to_owned()).collect(),
            partition_key: columns.iter().take(1).map(|name| (*name).to_owned()).collect(),
        };
        MemorySource {
            columns,
            ..Default::default()
        }
    }

    /// Set the tokens in our ring
    #[must_use]
    pub fn ring(mut self, ring: Vec<i64>) -> Self {
        self.ring = ring;
        self
    }

    /// Add a raw row at a token
    #[must_use]
    pub fn row(mut self, token: i64, values: Vec<Value>) -> Self {
        self.rows.insert(token, SampledRow::Raw(values));
        self
    }

    /// Add a json row at a token
    #[must_use]
    pub fn json_row(mut self, token: i64, json: serde_json::Value) -> Self {
        self.rows.insert(token, SampledRow::Json(json.to_string()));
        self
    }

    /// Make a range fail when it is queried
    #[must_use]
    pub fn failing(mut self, range: TokenRange) -> Self {
        self.failing.insert(range);
        self
    }

    /// Slow down every row we return
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of range queries we have served
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DataSource for MemorySource {
    type Query = SampleMode;

    async fn token_ring(&self) -> Result<Vec<i64>, Error> {
        Ok(self.ring.clone())
    }

    async fn columns(&self) -> Result<ColumnMetadata, Error> {
        Ok(self.columns.clone())
    }

    async fn prepare(
        &self,
        _columns: &ColumnMetadata,
        mode: SampleMode,
    ) -> Result<Self::Query, Error> {
        Ok(mode)
    }

    async fn sample_range<'a>(
        &'a self,
        _query: &'a Self::Query,
        range: TokenRange,
    ) -> Result<RowStream<'a>, Error> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&range) {
            return Err(Error::new(format!("range {range} is unavailable")));
        }
        // get the rows strictly within this range
        let rows = self
            .rows
            .iter()
            .filter(|(token, _)| range.contains(**token))
            .map(|(_, row)| row.clone())
            .collect::<Vec<SampledRow>>();
        let delay = self.delay;
        let stream = futures::stream::iter(rows)
            .then(move |row| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok::<SampledRow, Error>(row)
            })
            .boxed();
        Ok(stream)
    }
}

/// Build a run config for sampling an in memory source
///
/// # Arguments
///
/// * `mode` - What to measure
/// * `token_step` - How many tokens to advance between range bounds
/// * `execution_timeout` - How many seconds to sample for
pub fn conf(mode: SampleMode, token_step: usize, execution_timeout: u64) -> RunConfig {
    RunConfig {
        hostname: "127.0.0.1".to_owned(),
        port: 9042,
        username: None,
        password: None,
        ssl: false,
        path_cert: None,
        keyspace: "ks".to_owned(),
        table: "tbl".to_owned(),
        execution_timeout,
        token_step,
        rows_per_request: 1000,
        pagination: 200,
        dc: "datacenter1".to_owned(),
        json: mode == SampleMode::Json,
        setup_time: 5,
        log_level: LogLevel::Off,
        progress: false,
    }
}
