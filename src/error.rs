//src/error.rs

use std::num::ParseFloatError;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Rank;

/// Every way a run can fail. None of these are recoverable mid-run:
/// the pipeline is a batch transform and aborts on the first defect.
#[derive(Debug, Error)]
pub enum AbundanceError {
    /// Merge was called with no samples at all.
    #[error("merge stage: no samples supplied")]
    EmptyInput,

    /// Pivot was called with no aggregated rows.
    #[error("pivot stage: no aggregated {rank} rows to pivot")]
    EmptyAggregation { rank: Rank },

    /// A required column is absent from the table, or its cell is empty.
    /// `row` is the 1-based data row (0 when the header itself lacks the column).
    #[error("projection stage: sample `{sample_id}` row {row}: missing required field `{field}`")]
    MissingField {
        sample_id: String,
        row: usize,
        field: &'static str,
    },

    #[error("projection stage: sample `{sample_id}` row {row}: abundance `{value}` is not a number")]
    InvalidAbundance {
        sample_id: String,
        row: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// Parsed fine, but NaN, infinite or negative.
    #[error("projection stage: sample `{sample_id}` row {row}: abundance `{value}` is not a finite non-negative number")]
    AbundanceOutOfRange {
        sample_id: String,
        row: usize,
        value: String,
    },

    #[error("merge stage: sample `{0}` supplied more than once")]
    DuplicateSample(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, AbundanceError>;
