use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use spatrel_cv::{
    Experiment, ExperimentConfig, FoldOutcome,
    metric::Metric,
    partition::{PartitionPolicy, PartitionScope},
};
use spatrel_model::{LearningParams, Method, ModelKind};

use crate::{util, writer::RunFolder};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum Execution {
    /// One fold after another, rewriting the score tables after each
    #[default]
    Sequential,
    /// All folds at once on scoped threads
    Parallel,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// Path to the dataset JSON file
    dataset: PathBuf,
    /// Path to the embedding table JSON file
    #[arg(long)]
    embeddings: PathBuf,
    /// Output mode of the models (REG or PIX)
    #[arg(long, default_value = "PIX")]
    model_type: ModelKind,
    /// Side of the target grids in PIX mode
    #[arg(long, default_value_t = 15)]
    n_side_pixl: usize,
    /// Methods to compare (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = ["emb", "rnd", "onehot", "ctrl"])]
    methods: Vec<Method>,
    /// Metrics to report (comma-separated); defaults depend on the model type
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<Metric>,
    /// Number of cross-validation folds
    #[arg(long, default_value_t = 10)]
    n_folds: usize,
    /// Rows held out of training and scored separately (none, triplets, words)
    #[arg(long, default_value = "words")]
    eval_generalized_set: PartitionScope,
    /// Rows kept in training but also scored separately (none, triplets, words)
    #[arg(long, default_value = "none")]
    eval_clean_set: PartitionScope,
    /// Partition identifier lists (JSON); the built-in lists are used if omitted
    #[arg(long)]
    partition_table: Option<PathBuf>,
    /// Allow the generalized and clean partitions to share identifiers
    #[arg(long)]
    allow_partition_overlap: bool,
    /// Write per-row predictions of every fold
    #[arg(long)]
    save_indiv_predictions: bool,
    /// Write the trained state of every learned model
    #[arg(long)]
    save_model: bool,
    /// Grid cells below this value are left out of prediction files
    #[arg(long, default_value_t = 0.1)]
    threshold: f32,
    /// Keep rows whose object lies left of the subject as they are
    #[arg(long)]
    no_mirror_x: bool,
    /// Shuffle rows with this seed before splitting into folds
    #[arg(long)]
    shuffle_seed: Option<u64>,
    /// Base seed of model initialisation
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value = "sequential")]
    execution: Execution,
    /// Directory the result folder is created in
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
    #[clap(flatten)]
    learning: LearningArg,
}

/// Overrides of the default learning parameters.
#[derive(Default, Debug, Clone, clap::Args)]
struct LearningArg {
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f32>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    hidden_units: Option<usize>,
    #[arg(long)]
    hidden_layers: Option<usize>,
}

impl LearningArg {
    fn apply(&self, params: LearningParams) -> LearningParams {
        LearningParams {
            batch_size: self.batch_size.unwrap_or(params.batch_size),
            learning_rate: self.learning_rate.unwrap_or(params.learning_rate),
            epochs: self.epochs.unwrap_or(params.epochs),
            hidden_units: self.hidden_units.unwrap_or(params.hidden_units),
            hidden_layers: self.hidden_layers.unwrap_or(params.hidden_layers),
            ..params
        }
    }
}

impl RunArg {
    pub(crate) fn experiment_config(&self) -> ExperimentConfig {
        let defaults = ExperimentConfig::new(self.model_type);
        ExperimentConfig {
            grid_side: self.n_side_pixl,
            fold_count: self.n_folds,
            methods: self.methods.clone(),
            metrics: if self.metrics.is_empty() {
                defaults.metrics.clone()
            } else {
                self.metrics.clone()
            },
            generalized_scope: self.eval_generalized_set,
            clean_scope: self.eval_clean_set,
            save_predictions: self.save_indiv_predictions,
            save_model: self.save_model,
            allow_partition_overlap: self.allow_partition_overlap,
            shuffle_seed: self.shuffle_seed,
            model_seed: self.seed,
            learning: self.learning.apply(defaults.learning),
            ..defaults
        }
    }
}

/// Contents of `config.json` in the result folder.
#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    started_at: DateTime<Utc>,
    dataset: &'a Path,
    embeddings: &'a Path,
    rows: usize,
    dropped_rows: usize,
    mirrored_rows: usize,
    eligible_rows: usize,
    generalized_rows: usize,
    prediction_threshold: f32,
    config: &'a ExperimentConfig,
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    let started_at = Utc::now();

    let mut dataset = util::read_dataset_file(&arg.dataset)?;
    let embeddings = util::read_embeddings_file(&arg.embeddings)?;
    let policy = match &arg.partition_table {
        Some(path) => PartitionPolicy::new(util::read_partition_table_file(path)?),
        None => PartitionPolicy::default(),
    };

    let dropped_rows = dataset.retain_known_words(&embeddings);
    let mirrored_rows = if arg.no_mirror_x {
        0
    } else {
        dataset.mirror_x()
    };
    eprintln!(
        "Loaded {} rows ({dropped_rows} dropped for unknown words, {mirrored_rows} mirrored)",
        dataset.len()
    );

    let experiment = Experiment::prepare(arg.experiment_config(), &dataset, embeddings, &policy)
        .context("Failed to prepare the experiment")?;
    let config = experiment.config();
    eprintln!(
        "{} mode, {} folds over {} rows, {} generalized rows held out",
        config.model_kind,
        experiment.folds().len(),
        experiment.eligible_rows().len(),
        experiment.generalized_rows().len()
    );

    let folder = RunFolder::create(&arg.output_dir, config, started_at)?;
    folder.write_manifest(&RunManifest {
        started_at,
        dataset: &arg.dataset,
        embeddings: &arg.embeddings,
        rows: dataset.len(),
        dropped_rows,
        mirrored_rows,
        eligible_rows: experiment.eligible_rows().len(),
        generalized_rows: experiment.generalized_rows().len(),
        prediction_threshold: arg.threshold,
        config,
    })?;
    eprintln!("Writing results to {}", folder.path().display());

    let mut report = experiment.report();
    match arg.execution {
        Execution::Sequential => {
            for fold in experiment.folds() {
                eprintln!(
                    "Fold #{} ({} train rows, {} test rows):",
                    fold.number,
                    fold.train.len(),
                    fold.test.len()
                );
                let outcome = experiment
                    .run_fold(fold)
                    .with_context(|| format!("Failed to run fold {}", fold.number))?;
                print_scores(&outcome);
                report.absorb(&outcome)?;
                folder.write_fold(&dataset, &outcome, arg.threshold)?;
                folder.write_tables(&report)?;
            }
        }
        Execution::Parallel => {
            eprintln!("Running {} folds in parallel...", experiment.folds().len());
            let outcomes = experiment
                .run_folds_parallel()
                .context("Failed to run the folds")?;
            for outcome in &outcomes {
                eprintln!("Fold #{}:", outcome.fold);
                print_scores(outcome);
                report.absorb(outcome)?;
                folder.write_fold(&dataset, outcome, arg.threshold)?;
            }
            folder.write_tables(&report)?;
        }
    }

    let [_, test] = report.train_test_tables();
    eprintln!("Test summary (mean ± std over folds):");
    for row in &test.rows {
        if let (Some(mean), Some(std_dev)) = (row.mean, row.std_dev) {
            eprintln!(
                "  {:8} {:10} {mean:.3} ± {std_dev:.3}",
                row.method.id(),
                row.metric.name()
            );
        }
    }
    Ok(())
}

fn print_scores(outcome: &FoldOutcome) {
    for method in &outcome.methods {
        for (population, scores) in &method.scores {
            let line = scores
                .iter()
                .map(|(metric, value)| format!("{metric}={value:.3}"))
                .collect::<Vec<_>>()
                .join(" ");
            eprintln!("  {:8} {:12} {line}", method.method.id(), population.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use spatrel_data::synthetic::{self, SyntheticParams};

    use super::*;
    use crate::util::Output;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        arg: RunArg,
    }

    #[test]
    fn test_learning_overrides() {
        let arg = LearningArg {
            epochs: Some(2),
            hidden_units: Some(8),
            ..LearningArg::default()
        };
        let params = arg.apply(LearningParams::for_kind(ModelKind::Grid));
        assert_eq!(params.epochs, 2);
        assert_eq!(params.hidden_units, 8);
        assert_eq!(params.batch_size, 64);
        assert_eq!(params.loss, LearningParams::for_kind(ModelKind::Grid).loss);
    }

    #[test]
    fn test_execution_names() {
        assert_eq!("parallel".parse::<Execution>().unwrap(), Execution::Parallel);
        assert_eq!("Sequential".parse::<Execution>().unwrap(), Execution::Sequential);
    }

    #[test]
    fn test_run_writes_result_folder() {
        let dir = std::env::temp_dir().join(format!("spatrel-run-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let (dataset, embeddings) = synthetic::generate(&SyntheticParams {
            rows: 80,
            seed: 3,
            ..SyntheticParams::default()
        });
        let dataset_path = dir.join("dataset.json");
        let embeddings_path = dir.join("embeddings.json");
        Output::save_json(&dataset, Some(dataset_path.clone())).unwrap();
        Output::save_json(&embeddings, Some(embeddings_path.clone())).unwrap();

        let output_dir = dir.join("results");
        let dataset_arg = dataset_path.display().to_string();
        let embeddings_arg = embeddings_path.display().to_string();
        let output_arg = output_dir.display().to_string();
        let cli = Cli::try_parse_from([
            "run",
            &dataset_arg,
            "--embeddings",
            &embeddings_arg,
            "--model-type",
            "REG",
            "--methods",
            "ctrl",
            "--n-folds",
            "3",
            "--save-indiv-predictions",
            "--output-dir",
            &output_arg,
        ])
        .unwrap();
        run(&cli.arg).unwrap();

        let folders = fs::read_dir(&output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect::<Vec<_>>();
        assert_eq!(folders.len(), 1);
        let folder = &folders[0];
        for name in [
            "config.json",
            "TRAIN-TEST.csv",
            "GEN.csv",
            "INDIV_ctrl_fld_1.csv",
            "INDIV-GEN_ctrl_fld_3.csv",
        ] {
            assert!(folder.join(name).is_file(), "{name} is missing");
        }
        assert!(!folder.join("CLEAN.csv").exists());
        assert!(!folder.join("MODEL_ctrl_fld_1.json").exists());

        let table = fs::read_to_string(folder.join("TRAIN-TEST.csv")).unwrap();
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "population,method,metric,fold_1,fold_2,fold_3,mean,std_dev");
        assert_eq!(lines.len(), 1 + 2 * Metric::defaults(ModelKind::Regression).len());
        assert!(lines[1].starts_with("train,ctrl,R2,"));

        let manifest: serde_json::Value =
            util::read_json_file("manifest", folder.join("config.json")).unwrap();
        assert_eq!(manifest["config"]["model_kind"], "REG");
        assert_eq!(manifest["config"]["fold_count"], 3);
        assert_eq!(manifest["rows"], 80);

        fs::remove_dir_all(&dir).unwrap();
    }
}
