//! Structural errors raised by the normalization pipeline.
//!
//! Data-quality problems (bid cells carrying an `ERROR...` marker) are not
//! errors in this sense: they are extracted into the error report and the run
//! continues. Everything here aborts the run.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline stages.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage in which a structural error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ErrorExtraction,
    RateAssignment,
    Reshape,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ErrorExtraction => "error extraction",
            Stage::RateAssignment => "rate assignment",
            Stage::Reshape => "reshape",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A column the stage depends on is not part of the bid feed.
    #[error("{stage}: missing required column '{column}'")]
    MissingColumn { stage: Stage, column: String },

    #[error("{stage}: row {row}: unparseable timestamp '{value}': {source}")]
    Timestamp {
        stage: Stage,
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{stage}: row {row}: invalid {field} value '{value}'")]
    InvalidValue {
        stage: Stage,
        row: usize,
        field: String,
        value: String,
    },

    /// Two rate intervals start at the same instant.
    #[error("{stage}: rate schedule rows {first_row} and {second_row} overlap at '{valid_from}'")]
    OverlappingRates {
        stage: Stage,
        first_row: usize,
        second_row: usize,
        valid_from: String,
    },

    #[error("{stage}: row {row}: bid matched {matches} rate intervals")]
    AmbiguousRate {
        stage: Stage,
        row: usize,
        matches: usize,
    },

    #[error("{stage}: error report sink failed: {reason:#}")]
    Sink { stage: Stage, reason: anyhow::Error },
}

impl PipelineError {
    /// Stage that raised the error.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::MissingColumn { stage, .. }
            | PipelineError::Timestamp { stage, .. }
            | PipelineError::InvalidValue { stage, .. }
            | PipelineError::OverlappingRates { stage, .. }
            | PipelineError::AmbiguousRate { stage, .. }
            | PipelineError::Sink { stage, .. } => *stage,
        }
    }

    /// Source row that triggered the error, when one is known.
    pub fn row(&self) -> Option<usize> {
        match self {
            PipelineError::Timestamp { row, .. }
            | PipelineError::InvalidValue { row, .. }
            | PipelineError::AmbiguousRate { row, .. } => Some(*row),
            PipelineError::OverlappingRates { second_row, .. } => Some(*second_row),
            PipelineError::MissingColumn { .. } | PipelineError::Sink { .. } => None,
        }
    }
}
