//! The sources rows can be sampled from

use futures::stream::BoxStream;

use crate::conf::SampleMode;
use crate::size::Footprint;
use crate::value::Value;
use crate::Error;

mod cassandra;

pub use cassandra::{RangeStatement, ScyllaSource};

/// An open range of tokens where neither bound is included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenRange {
    /// The token just below the first token in this range
    pub start: i64,
    /// The token just above the last token in this range
    pub end: i64,
}

impl TokenRange {
    /// Create a new open token range
    ///
    /// # Arguments
    ///
    /// * `start` - The exclusive lower bound
    /// * `end` - The exclusive upper bound
    pub fn new(start: i64, end: i64) -> Self {
        TokenRange { start, end }
    }

    /// Check if a token falls within this range
    ///
    /// # Arguments
    ///
    /// * `token` - The token to check
    pub fn contains(&self, token: i64) -> bool {
        self.start < token && token < self.end
    }
}

impl std::fmt::Display for TokenRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// The schema info for the table being sampled
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMetadata {
    /// The name of every column in this table
    pub columns: Vec<String>,
    /// The partition key columns ordered by their position in the key
    pub partition_key: Vec<String>,
}

impl ColumnMetadata {
    /// Get the total footprint of all of our column names
    ///
    /// # Arguments
    ///
    /// * `footprint` - The model to estimate sizes with
    pub fn names_size(&self, footprint: &Footprint) -> u64 {
        self.columns
            .iter()
            .map(|column| footprint.estimate_text(column))
            .sum()
    }
}

/// A single row pulled from a source
#[derive(Debug, Clone, PartialEq)]
pub enum SampledRow {
    /// Every column value in this row
    Raw(Vec<Value>),
    /// This row serialized as JSON
    Json(String),
}

/// A stream of sampled rows
pub type RowStream<'a> = BoxStream<'a, Result<SampledRow, Error>>;

/// A store whose rows can be sampled by token range
#[async_trait::async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// A query ready to be executed against single token ranges
    type Query: Send + Sync;

    /// Get every token in the ring in order
    async fn token_ring(&self) -> Result<Vec<i64>, Error>;

    /// Get the column names and partition key for the table being sampled
    async fn columns(&self) -> Result<ColumnMetadata, Error>;

    /// Prepare the query used to sample each token range
    ///
    /// # Arguments
    ///
    /// * `columns` - The schema for the table being sampled
    /// * `mode` - What we are measuring in each row
    async fn prepare(
        &self,
        columns: &ColumnMetadata,
        mode: SampleMode,
    ) -> Result<Self::Query, Error>;

    /// Start streaming the rows within a single token range
    ///
    /// # Arguments
    ///
    /// * `query` - The prepared range query
    /// * `range` - The range of tokens to sample
    async fn sample_range<'a>(
        &'a self,
        query: &'a Self::Query,
        range: TokenRange,
    ) -> Result<RowStream<'a>, Error>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges_are_open() {
        let range = TokenRange::new(-10, 10);
        assert!(range.contains(0));
        assert!(!range.contains(-10));
        assert!(!range.contains(10));
    }

    #[test]
    fn column_names_size() {
        let meta = ColumnMetadata {
            columns: vec!["a".to_owned(), "b".to_owned()],
            partition_key: vec!["a".to_owned()],
        };
        assert_eq!(meta.names_size(&Footprint::default()), 2);
    }
}
