//! Cross-validation experiment driver.
//!
//! # Lifecycle
//!
//! 1. [`Experiment::prepare`] validates the configuration, resolves both
//!    partitions, removes generalized rows from the population, builds the
//!    parallel arrays (rasterising grid targets once) and splits the eligible
//!    rows into folds. Everything computed here is shared read-only by all
//!    folds.
//! 2. [`Experiment::run_fold`] trains a fresh model per method on one fold and
//!    scores it on every applicable population. It touches no shared mutable
//!    state, so folds can run in any order or concurrently.
//! 3. [`ExperimentReport::absorb`] appends a fold's scores to the run's
//!    [`PerformanceRecord`]; the report then assembles the result tables.
//!
//! [`Experiment::run`] and [`Experiment::run_parallel`] drive all three steps;
//! [`Experiment::run_folds_parallel`] stops before the third.
//! Callers that persist results after every fold drive `run_fold` themselves.
//!
//! # Populations
//!
//! | population    | rows scored                                              |
//! |---------------|----------------------------------------------------------|
//! | `train`       | the fold's training rows                                 |
//! | `test`        | the fold's test rows                                     |
//! | `clean_train` | clean rows among the training rows                       |
//! | `clean_test`  | clean rows among the test rows                           |
//! | `generalized` | every generalized row, scored by each fold's model       |
//!
//! Clean populations are scored only in folds where both clean subsets are
//! non-empty. Other folds have no clean entries at all.

use std::thread;

use serde::{Deserialize, Serialize};
use spatrel_data::{Dataset, EmbeddingTable};
use spatrel_model::{
    LearningParams, Method, ModelKind, ModelState, ModelStrategy, Predictions,
};

use crate::{
    ConfigurationError, ExperimentError,
    assemble::{self, ResultTable},
    fold::{Fold, FoldSplitter},
    metric::{self, Metric, MetricSet, Scores},
    partition::{PartitionIds, PartitionPolicy, PartitionScope},
    record::{PerformanceKey, PerformanceRecord, Population},
    view::{self, DatasetArrays, SlicedArrays},
};

/// Settings of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub model_kind: ModelKind,
    /// Side of the target grids in grid mode.
    pub grid_side: usize,
    pub fold_count: usize,
    /// Methods under comparison, in reporting order.
    pub methods: Vec<Method>,
    /// Metrics to report, in reporting order.
    pub metrics: Vec<Metric>,
    pub generalized_scope: PartitionScope,
    pub clean_scope: PartitionScope,
    /// Keep per-row predictions in fold outcomes.
    pub save_predictions: bool,
    /// Keep exported model state in fold outcomes.
    pub save_model: bool,
    /// Skip the generalized/clean overlap check.
    pub allow_partition_overlap: bool,
    /// Shuffle rows before splitting into folds.
    pub shuffle_seed: Option<u64>,
    /// Base seed of model initialisation.
    pub model_seed: u64,
    pub learning: LearningParams,
}

impl ExperimentConfig {
    /// Defaults of the harness for `model_kind`.
    #[must_use]
    pub fn new(model_kind: ModelKind) -> Self {
        Self {
            model_kind,
            grid_side: 15,
            fold_count: 10,
            methods: Method::ALL.to_vec(),
            metrics: Metric::defaults(model_kind).to_vec(),
            generalized_scope: PartitionScope::Words,
            clean_scope: PartitionScope::None,
            save_predictions: false,
            save_model: false,
            allow_partition_overlap: false,
            shuffle_seed: None,
            model_seed: 0,
            learning: LearningParams::for_kind(model_kind),
        }
    }

    fn validate(&self) -> Result<MetricSet, ConfigurationError> {
        if self.methods.is_empty() {
            return Err(ConfigurationError::EmptyMethodList);
        }
        for (i, &method) in self.methods.iter().enumerate() {
            if self.methods[..i].contains(&method) {
                return Err(ConfigurationError::DuplicateMethod { method });
            }
        }
        if self.model_kind == ModelKind::Grid && self.grid_side == 0 {
            return Err(ConfigurationError::InvalidGridSide);
        }
        if self.fold_count == 0 {
            return Err(ConfigurationError::InvalidFoldCount);
        }
        MetricSet::new(self.model_kind, self.metrics.clone())
    }
}

/// Predictions of one model on one population, with the dataset row ids
/// they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionDump {
    pub population: Population,
    pub row_ids: Vec<usize>,
    pub predictions: Predictions,
}

/// What one method produced in one fold.
#[derive(Debug, Clone)]
pub struct MethodOutcome {
    pub method: Method,
    pub scores: Vec<(Population, Scores)>,
    /// Present only when predictions are saved.
    pub predictions: Vec<PredictionDump>,
    /// Present only when model saving is requested and the method can export
    /// its state.
    pub state: Option<ModelState>,
}

/// What one fold produced.
#[derive(Debug, Clone)]
pub struct FoldOutcome {
    pub fold: usize,
    pub record: PerformanceRecord,
    pub methods: Vec<MethodOutcome>,
}

/// A prepared experiment.
#[derive(Debug)]
pub struct Experiment {
    config: ExperimentConfig,
    metrics: MetricSet,
    embeddings: EmbeddingTable,
    arrays: DatasetArrays,
    eligible_rows: Vec<usize>,
    generalized_rows: Vec<usize>,
    clean_mask: Vec<bool>,
    strategies: Vec<ModelStrategy>,
    folds: Vec<Fold>,
}

impl Experiment {
    /// Validates `config` and computes everything folds share.
    ///
    /// Rows touching the generalized partition are excluded from the folds.
    /// Fold index sets hold dataset row ids.
    pub fn prepare(
        config: ExperimentConfig,
        dataset: &Dataset,
        embeddings: EmbeddingTable,
        policy: &PartitionPolicy,
    ) -> Result<Self, ExperimentError> {
        let metrics = config.validate()?;

        let generalized_ids = policy.resolve(config.generalized_scope);
        let clean_ids = policy.resolve(config.clean_scope);
        if !config.allow_partition_overlap {
            PartitionPolicy::check_disjoint(&generalized_ids, &clean_ids)?;
        }

        let (generalized_rows, eligible_rows) = split_generalized(dataset, &generalized_ids);
        if !config.generalized_scope.is_none() && generalized_rows.is_empty() {
            return Err(ConfigurationError::EmptyGeneralizedSet {
                scope: config.generalized_scope,
            }
            .into());
        }
        let clean_mask = dataset
            .triplets()
            .map(|t| clean_ids.touches(t))
            .collect::<Vec<_>>();

        let grid_side = (config.model_kind == ModelKind::Grid).then_some(config.grid_side);
        let arrays = DatasetArrays::from_records(&dataset.records, &embeddings, grid_side)?;

        let mut splitter = FoldSplitter::new(config.fold_count);
        if let Some(seed) = config.shuffle_seed {
            splitter = splitter.with_shuffle(seed);
        }
        let folds = splitter
            .split(eligible_rows.len())?
            .into_iter()
            .map(|fold| Fold {
                number: fold.number,
                train: fold.train.iter().map(|&p| eligible_rows[p]).collect(),
                test: fold.test.iter().map(|&p| eligible_rows[p]).collect(),
            })
            .collect();

        let strategies = config
            .methods
            .iter()
            .map(|&method| ModelStrategy::new(method, config.model_kind, config.learning))
            .collect();

        Ok(Self {
            config,
            metrics,
            embeddings,
            arrays,
            eligible_rows,
            generalized_rows,
            clean_mask,
            strategies,
            folds,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    #[must_use]
    pub fn metric_set(&self) -> &MetricSet {
        &self.metrics
    }

    #[must_use]
    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Dataset row ids taking part in cross-validation.
    #[must_use]
    pub fn eligible_rows(&self) -> &[usize] {
        &self.eligible_rows
    }

    /// Dataset row ids held out for generalized evaluation.
    #[must_use]
    pub fn generalized_rows(&self) -> &[usize] {
        &self.generalized_rows
    }

    /// Whether dataset row `row` belongs to the clean partition.
    #[must_use]
    pub fn is_clean(&self, row: usize) -> bool {
        self.clean_mask.get(row).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn arrays(&self) -> &DatasetArrays {
        &self.arrays
    }

    /// An empty report for this experiment's configuration.
    #[must_use]
    pub fn report(&self) -> ExperimentReport {
        ExperimentReport::new(&self.config)
    }

    /// Trains and scores every method on one fold.
    pub fn run_fold(&self, fold: &Fold) -> Result<FoldOutcome, ExperimentError> {
        let (train, test) = view::slice(&self.arrays, &fold.train, &fold.test)?;
        let generalized = if self.generalized_rows.is_empty() {
            None
        } else {
            Some(self.arrays.gather(&self.generalized_rows)?)
        };
        let clean_train = train.positions_where(|row| self.is_clean(row));
        let clean_test = test.positions_where(|row| self.is_clean(row));
        let clean = if clean_train.is_empty() || clean_test.is_empty() {
            None
        } else {
            Some((
                train.slice_by_subset(&clean_train)?,
                test.slice_by_subset(&clean_test)?,
            ))
        };

        let mut populations = vec![(Population::Train, &train), (Population::Test, &test)];
        if let Some((clean_train, clean_test)) = &clean {
            populations.push((Population::CleanTrain, clean_train));
            populations.push((Population::CleanTest, clean_test));
        }
        if let Some(generalized) = &generalized {
            populations.push((Population::Generalized, generalized));
        }

        let mut record = PerformanceRecord::new();
        let mut methods = Vec::with_capacity(self.strategies.len());
        for (index, strategy) in self.strategies.iter().enumerate() {
            let outcome = self.run_method(strategy, index, fold.number, &train, &populations)?;
            for (population, scores) in &outcome.scores {
                for (metric, value) in scores.iter() {
                    record.insert(
                        PerformanceKey {
                            population: *population,
                            method: strategy.method,
                            metric,
                            fold: fold.number,
                        },
                        value,
                    )?;
                }
            }
            methods.push(outcome);
        }

        Ok(FoldOutcome {
            fold: fold.number,
            record,
            methods,
        })
    }

    fn run_method(
        &self,
        strategy: &ModelStrategy,
        index: usize,
        fold: usize,
        train: &SlicedArrays<'_>,
        populations: &[(Population, &SlicedArrays<'_>)],
    ) -> Result<MethodOutcome, ExperimentError> {
        let method = strategy.method;
        let model_error = |source| ExperimentError::Model { method, source };

        let mut model = strategy.build(self.model_seed(fold, index));
        model
            .train(
                train.inputs(),
                &train.targets,
                train.grids.as_ref(),
                &self.embeddings,
            )
            .map_err(model_error)?;

        let mut scores = Vec::with_capacity(populations.len());
        let mut predictions = Vec::new();
        for &(population, rows) in populations {
            let predicted = model
                .predict(rows.inputs(), &train.targets)
                .map_err(model_error)?;
            let population_scores = metric::evaluate(
                &predicted,
                &rows.targets,
                rows.grids.as_ref(),
                &rows.geometry,
                &self.metrics,
                self.config.model_kind,
            )?;
            scores.push((population, population_scores));
            if self.config.save_predictions && population != Population::Train {
                predictions.push(PredictionDump {
                    population,
                    row_ids: rows.row_ids().to_vec(),
                    predictions: predicted,
                });
            }
        }

        let state = if self.config.save_model {
            model.export_state()
        } else {
            None
        };
        Ok(MethodOutcome {
            method,
            scores,
            predictions,
            state,
        })
    }

    fn model_seed(&self, fold: usize, method_index: usize) -> u64 {
        let offset = (fold as u64) * 1_000 + method_index as u64;
        self.config.model_seed.wrapping_add(offset)
    }

    /// Runs every fold in order.
    pub fn run(&self) -> Result<ExperimentReport, ExperimentError> {
        let mut report = self.report();
        for fold in &self.folds {
            report.absorb(&self.run_fold(fold)?)?;
        }
        Ok(report)
    }

    /// Runs every fold on its own thread.
    ///
    /// Outcomes are returned in fold order.
    pub fn run_folds_parallel(&self) -> Result<Vec<FoldOutcome>, ExperimentError> {
        thread::scope(|s| {
            let handles = self
                .folds
                .iter()
                .map(|fold| s.spawn(move || self.run_fold(fold)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// Runs every fold on its own thread and merges the outcomes in fold
    /// order.
    pub fn run_parallel(&self) -> Result<ExperimentReport, ExperimentError> {
        let mut report = self.report();
        for outcome in self.run_folds_parallel()? {
            report.absorb(&outcome)?;
        }
        Ok(report)
    }
}

/// Dataset row ids touching `ids`, and the rest.
fn split_generalized(dataset: &Dataset, ids: &PartitionIds) -> (Vec<usize>, Vec<usize>) {
    (0..dataset.len()).partition(|&row| ids.touches(&dataset.records[row].triplet))
}

/// Accumulated scores of a run, with the table layout of its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    methods: Vec<Method>,
    metrics: Vec<Metric>,
    generalized_scope: PartitionScope,
    clean_scope: PartitionScope,
    record: PerformanceRecord,
}

impl ExperimentReport {
    #[must_use]
    pub fn new(config: &ExperimentConfig) -> Self {
        Self {
            methods: config.methods.clone(),
            metrics: config.metrics.clone(),
            generalized_scope: config.generalized_scope,
            clean_scope: config.clean_scope,
            record: PerformanceRecord::new(),
        }
    }

    /// Appends a fold's scores.
    pub fn absorb(&mut self, outcome: &FoldOutcome) -> Result<(), ExperimentError> {
        self.record.merge(outcome.record.clone())
    }

    #[must_use]
    pub fn record(&self) -> &PerformanceRecord {
        &self.record
    }

    fn table(&self, population: Population) -> ResultTable {
        assemble::flatten(&self.record, population, &self.methods, &self.metrics)
    }

    /// The train and test tables.
    #[must_use]
    pub fn train_test_tables(&self) -> [ResultTable; 2] {
        [self.table(Population::Train), self.table(Population::Test)]
    }

    /// The generalized table, if a generalized partition is configured.
    #[must_use]
    pub fn generalized_table(&self) -> Option<ResultTable> {
        (!self.generalized_scope.is_none()).then(|| self.table(Population::Generalized))
    }

    /// The clean train and test tables, if a clean partition is configured
    /// and some fold produced clean scores.
    #[must_use]
    pub fn clean_tables(&self) -> Option<[ResultTable; 2]> {
        if self.clean_scope.is_none() || self.record.folds(Population::CleanTest).is_empty() {
            return None;
        }
        Some([
            self.table(Population::CleanTrain),
            self.table(Population::CleanTest),
        ])
    }
}
