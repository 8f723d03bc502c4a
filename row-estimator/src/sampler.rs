//! Samples rows from spread out token ranges
//!
//! The token ring is thinned to every `token_step`-th token and the
//! remaining tokens are consumed two at a time as the bounds of the ranges
//! to sample. Ranges are sampled one after another and every row is sized as
//! soon as it arrives.

use futures::StreamExt;
use itertools::Itertools;
use kanal::AsyncSender;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

use crate::conf::SampleMode;
use crate::monitor::MonitorUpdate;
use crate::size::Footprint;
use crate::source::{ColumnMetadata, DataSource, SampledRow, TokenRange};
use crate::Error;

/// The states a sampler moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Nothing has happened yet
    Idle,
    /// We have a connected source to sample from
    Connected,
    /// We are turning the ring into ranges
    Ranging,
    /// We are sampling ranges
    Sampling,
    /// Every range was visited
    Done,
    /// We were told to stop before visiting every range
    TimedOut,
    /// We could not sample at all
    Failed,
}

impl std::fmt::Display for SamplerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerState::Idle => write!(f, "Idle"),
            SamplerState::Connected => write!(f, "Connected"),
            SamplerState::Ranging => write!(f, "Ranging"),
            SamplerState::Sampling => write!(f, "Sampling"),
            SamplerState::Done => write!(f, "Done"),
            SamplerState::TimedOut => write!(f, "TimedOut"),
            SamplerState::Failed => write!(f, "Failed"),
        }
    }
}

/// Build the ranges to sample from a token ring
///
/// Every `step`-th token is kept starting with the first one and the kept
/// tokens are paired up without overlap. A trailing unpaired token is
/// dropped.
///
/// # Arguments
///
/// * `ring` - Every token in the ring in order
/// * `step` - How many tokens to advance between kept tokens
pub fn plan_ranges(ring: &[i64], step: NonZeroUsize) -> Vec<TokenRange> {
    ring.iter()
        .step_by(step.get())
        .tuples()
        .map(|(start, end)| TokenRange::new(*start, *end))
        .collect()
}

/// Replace JSON nulls with empty strings so nulls are sized like empty text
///
/// # Arguments
///
/// * `json` - The JSON row to normalize
pub fn normalize_json(json: &str) -> String {
    json.replace("null", "\"\"")
}

/// How sampling a single range ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeEnd {
    /// Every row in the range was sampled
    Exhausted,
    /// We were cancelled partway through
    Cancelled,
}

/// The outcome of a sampling run
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRun {
    /// The estimated size of each sampled row in discovery order
    pub sizes: Vec<u64>,
    /// The state the sampler finished in
    pub state: SamplerState,
    /// The number of ranges we planned to sample
    pub ranges_planned: usize,
    /// The number of ranges we finished sampling
    pub ranges_sampled: usize,
    /// The number of ranges that failed and were skipped
    pub ranges_failed: usize,
}

/// Samples row sizes from a source one token range at a time
pub struct TokenRangeSampler<D: DataSource> {
    /// The source to pull rows from
    source: Arc<D>,
    /// How many tokens to advance between range bounds
    token_step: NonZeroUsize,
    /// What we are measuring in each row
    mode: SampleMode,
    /// The model to estimate sizes with
    footprint: Footprint,
    /// Where we are in sampling
    state: SamplerState,
    /// The channel to send progress updates on
    updates: Option<AsyncSender<MonitorUpdate>>,
}

impl<D: DataSource> TokenRangeSampler<D> {
    /// Create a new sampler
    ///
    /// # Arguments
    ///
    /// * `source` - The source to pull rows from
    /// * `token_step` - How many tokens to advance between range bounds
    /// * `mode` - What we are measuring in each row
    pub fn new(source: Arc<D>, token_step: NonZeroUsize, mode: SampleMode) -> Self {
        TokenRangeSampler {
            source,
            token_step,
            mode,
            footprint: Footprint::default(),
            state: SamplerState::Idle,
            updates: None,
        }
    }

    /// Report progress to a monitor
    ///
    /// # Arguments
    ///
    /// * `updates` - The channel to send progress updates on
    #[must_use]
    pub fn monitor(mut self, updates: AsyncSender<MonitorUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Use a custom footprint model
    ///
    /// # Arguments
    ///
    /// * `footprint` - The model to estimate sizes with
    #[must_use]
    pub fn footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    /// Get the state this sampler is in
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Move to a new state
    fn transition(&mut self, state: SamplerState) {
        event!(Level::DEBUG, from = %self.state, to = %state, "Sampler state change");
        self.state = state;
    }

    /// Send an update to our monitor if we have one
    async fn update(&self, update: MonitorUpdate) {
        if let Some(updates) = &self.updates {
            // a closed monitor should never stop sampling
            if let Err(error) = updates.send(update).await {
                event!(Level::DEBUG, "Failed to update monitor: {error}");
            }
        }
    }

    /// Estimate the size of a single row
    ///
    /// # Arguments
    ///
    /// * `row` - The row to estimate
    pub fn measure(&self, row: &SampledRow) -> u64 {
        match row {
            SampledRow::Raw(values) => self.footprint.estimate_row(values),
            SampledRow::Json(json) => self.footprint.estimate_text(&normalize_json(json)),
        }
    }

    /// Sample the rows in a single range
    ///
    /// # Arguments
    ///
    /// * `query` - The prepared range query
    /// * `range` - The range to sample
    /// * `cancel` - The token to stop sampling on
    /// * `sizes` - The sizes to add our samples to
    async fn sample_range(
        &self,
        query: &D::Query,
        range: TokenRange,
        cancel: &CancellationToken,
        sizes: &mut Vec<u64>,
    ) -> Result<RangeEnd, Error> {
        // start our range query unless we are told to stop first
        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(RangeEnd::Cancelled),
            stream = self.source.sample_range(query, range) => stream?,
        };
        loop {
            // wait for our next row unless we are told to stop first
            let row = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(RangeEnd::Cancelled),
                row = stream.next() => row,
            };
            let Some(row) = row else {
                return Ok(RangeEnd::Exhausted);
            };
            sizes.push(self.measure(&row?));
            // check if we should stop after every row
            if cancel.is_cancelled() {
                return Ok(RangeEnd::Cancelled);
            }
        }
    }

    /// Sample row sizes across the token ring until we finish or are cancelled
    ///
    /// # Arguments
    ///
    /// * `columns` - The schema of the table being sampled
    /// * `cancel` - The token to stop sampling on
    #[instrument(name = "TokenRangeSampler::sample", skip_all, fields(mode = %self.mode, step = self.token_step.get()), err(Debug))]
    pub async fn sample(
        mut self,
        columns: &ColumnMetadata,
        cancel: CancellationToken,
    ) -> Result<SampleRun, Error> {
        self.transition(SamplerState::Connected);
        // get the full ring from our source
        let ring = match self.source.token_ring().await {
            Ok(ring) => ring,
            Err(error) => {
                self.transition(SamplerState::Failed);
                return Err(error);
            }
        };
        self.transition(SamplerState::Ranging);
        let ranges = plan_ranges(&ring, self.token_step);
        event!(
            Level::INFO,
            "Sampling {} token ranges from a ring of {} tokens",
            ranges.len(),
            ring.len()
        );
        let mut run = SampleRun {
            sizes: Vec::new(),
            state: self.state,
            ranges_planned: ranges.len(),
            ranges_sampled: 0,
            ranges_failed: 0,
        };
        // only prepare a query if we actually have something to sample
        if !ranges.is_empty() {
            let query = match self.source.prepare(columns, self.mode).await {
                Ok(query) => query,
                Err(error) => {
                    self.transition(SamplerState::Failed);
                    return Err(error);
                }
            };
            self.transition(SamplerState::Sampling);
            for range in ranges {
                let before = run.sizes.len();
                let end = self
                    .sample_range(&query, range, &cancel, &mut run.sizes)
                    .await;
                // get the rows and bytes this range added
                let added = &run.sizes[before..];
                let update = MonitorUpdate::Sampled {
                    rows: added.len(),
                    bytes: added.iter().sum(),
                };
                match end {
                    Ok(RangeEnd::Exhausted) => {
                        run.ranges_sampled += 1;
                        self.update(update).await;
                    }
                    Ok(RangeEnd::Cancelled) => {
                        self.update(update).await;
                        self.transition(SamplerState::TimedOut);
                        break;
                    }
                    Err(error) => {
                        // a bad range is skipped but keeps any rows it gave us
                        event!(Level::WARN, %range, "Skipping token range: {error}");
                        run.ranges_failed += 1;
                        self.update(MonitorUpdate::Failed).await;
                    }
                }
            }
        }
        if self.state != SamplerState::TimedOut {
            self.transition(SamplerState::Done);
        }
        self.update(MonitorUpdate::Finished).await;
        run.state = self.state;
        Ok(run)
    }
}
