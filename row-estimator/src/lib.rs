//! Estimates the size of rows in a Cassandra or ScyllaDB table by sampling
//! rows from spread out token ranges

pub mod args;
pub mod conf;
mod error;
pub mod estimate;
pub mod monitor;
pub mod sampler;
pub mod size;
pub mod source;
pub mod stats;
pub mod trace;
pub mod value;

pub use error::Error;
