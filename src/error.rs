//! Hard errors surfaced by the engine.
//!
//! Only stale-index queries and invalid configuration abort a run. Statistics
//! whose preconditions fail are reported as absent values, and analyses with
//! too little data are reported as skipped, both inside the output itself.

use thiserror::Error;

use crate::index::DatasetVersion;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("index is stale: caller expected dataset version {expected}, index holds {actual}")]
    IndexStale {
        expected: DatasetVersion,
        actual: DatasetVersion,
    },

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("case table load failed: {0}")]
    Load(String),
}

impl From<polars::error::PolarsError> for EngineError {
    fn from(err: polars::error::PolarsError) -> Self {
        EngineError::Load(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Load(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
