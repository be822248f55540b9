use spatrel_data::DataError;
use spatrel_model::{Method, ModelError, ModelKind, ParseMethodError, ParseModelKindError};

use crate::{metric::Metric, partition::PartitionScope, record::PerformanceKey};

/// Invalid experiment configuration, detected before any fold runs.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigurationError {
    #[display("unknown partition scope '{name}' (expected none, triplets or words)")]
    UnknownScope { name: String },
    #[display("unknown method '{name}' (expected one of: emb, rnd, onehot, ctrl)")]
    UnknownMethod { name: String },
    #[display("unknown model type '{name}' (expected REG or PIX)")]
    UnknownModelKind { name: String },
    #[display("unknown metric '{name}'")]
    UnknownMetric { name: String },
    #[display("metric {metric} does not apply to {kind} models")]
    InapplicableMetric { metric: Metric, kind: ModelKind },
    #[display("metric {metric} is listed more than once")]
    DuplicateMetric { metric: Metric },
    #[display("metric list is empty")]
    EmptyMetricList,
    #[display("method list is empty")]
    EmptyMethodList,
    #[display("method {method} is listed more than once")]
    DuplicateMethod { method: Method },
    #[display("fold count must be positive")]
    InvalidFoldCount,
    #[display("cannot form {folds} non-empty folds from {rows} rows")]
    TooFewRows { rows: usize, folds: usize },
    #[display("grid side must be positive in grid-output mode")]
    InvalidGridSide,
    #[display("generalized and clean partitions both reference '{identifier}'")]
    OverlappingPartitions { identifier: String },
    #[display("generalized scope '{scope}' matches no rows")]
    EmptyGeneralizedSet { scope: PartitionScope },
    #[display("expected {expected} predictions, got {actual} predictions")]
    PredictionKindMismatch {
        expected: ModelKind,
        actual: ModelKind,
    },
}

impl From<ParseMethodError> for ConfigurationError {
    fn from(e: ParseMethodError) -> Self {
        Self::UnknownMethod { name: e.name }
    }
}

impl From<ParseModelKindError> for ConfigurationError {
    fn from(e: ParseModelKindError) -> Self {
        Self::UnknownModelKind { name: e.name }
    }
}

/// A row or subset index outside its index space.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum IndexError {
    #[display("row {row} is out of range for {len} rows")]
    RowOutOfRange { row: usize, len: usize },
    #[display("subset position {position} is out of range for a view of {len} rows")]
    SubsetOutOfRange { position: usize, len: usize },
}

/// Parallel arrays that disagree on their shape.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum AlignmentError {
    #[display("{array} has {actual} rows, expected {expected}")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("grid-output scoring requires grid targets")]
    MissingGridTargets,
    #[display("predicted grids have side {actual}, target grids have side {expected}")]
    GridSideMismatch { expected: usize, actual: usize },
}

/// Any failure that aborts an experiment run.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ExperimentError {
    #[display("configuration error: {_0}")]
    Configuration(ConfigurationError),
    #[display("index error: {_0}")]
    Index(IndexError),
    #[display("alignment error: {_0}")]
    Alignment(AlignmentError),
    #[display("data error: {_0}")]
    Data(DataError),
    #[display("method {method} failed: {source}")]
    Model { method: Method, source: ModelError },
    #[display("performance record already holds {key}")]
    DuplicateRecord { key: PerformanceKey },
}

impl From<ConfigurationError> for ExperimentError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<IndexError> for ExperimentError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<AlignmentError> for ExperimentError {
    fn from(e: AlignmentError) -> Self {
        Self::Alignment(e)
    }
}

impl From<DataError> for ExperimentError {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parse_errors_are_configuration_errors() {
        let err = ExperimentError::from(ConfigurationError::from(
            "init".parse::<Method>().unwrap_err(),
        ));
        assert_eq!(
            err.to_string(),
            "configuration error: unknown method 'init' (expected one of: emb, rnd, onehot, ctrl)"
        );
        assert_eq!(
            ConfigurationError::from("MLP".parse::<ModelKind>().unwrap_err()),
            ConfigurationError::UnknownModelKind {
                name: "MLP".to_owned()
            }
        );
    }
}
