//! Cross-validation evaluation engine of the spatrel harness.
//!
//! The engine compares predictive methods for spatial relations (where does
//! the object of "man riding horse" go, given the man?) over k-fold
//! cross-validation, with two optional held-out partitions:
//!
//! - a **generalized** partition removed from training and scored separately,
//!   measuring extrapolation to unseen words or triplets
//! - a **clean** partition kept in training but also scored on its own
//!
//! # Pipeline
//!
//! ```text
//! PartitionPolicy ──▶ FoldSplitter ──▶ for each fold:
//!                                        view::slice ──▶ for each method:
//!                                          train ▸ predict ▸ metric::evaluate
//!                                                              │
//!                                      PerformanceRecord ◀─────┘
//!                                              │
//!                                      assemble::flatten ──▶ ResultTable
//! ```
//!
//! # Modules
//!
//! - [`partition`]: scopes, identifier tables and row membership
//! - [`fold`]: deterministic k-fold splitting
//! - [`view`]: row-aligned slicing of the parallel arrays with lazy grid views
//! - [`metric`]: metric definitions and scoring
//! - [`record`]: the append-only performance record
//! - [`assemble`]: result tables
//! - [`experiment`]: configuration, orchestration and reports
//!
//! # Example
//!
//! ```
//! use spatrel_cv::{Experiment, ExperimentConfig, partition::{PartitionPolicy, PartitionScope}};
//! use spatrel_data::synthetic::{self, SyntheticParams};
//! use spatrel_model::{Method, ModelKind};
//!
//! let (dataset, embeddings) = synthetic::generate(&SyntheticParams { rows: 100, ..Default::default() });
//! let config = ExperimentConfig {
//!     fold_count: 5,
//!     methods: vec![Method::Control],
//!     generalized_scope: PartitionScope::None,
//!     ..ExperimentConfig::new(ModelKind::Regression)
//! };
//! let experiment = Experiment::prepare(config, &dataset, embeddings, &PartitionPolicy::default())?;
//! let report = experiment.run()?;
//! let [_, test] = report.train_test_tables();
//! assert_eq!(test.folds, vec![1, 2, 3, 4, 5]);
//! assert!(report.generalized_table().is_none());
//! # Ok::<(), spatrel_cv::ExperimentError>(())
//! ```

pub use self::{
    error::{AlignmentError, ConfigurationError, ExperimentError, IndexError},
    experiment::{
        Experiment, ExperimentConfig, ExperimentReport, FoldOutcome, MethodOutcome, PredictionDump,
    },
};

pub mod assemble;
mod error;
pub mod experiment;
pub mod fold;
pub mod metric;
pub mod partition;
pub mod record;
pub mod view;
