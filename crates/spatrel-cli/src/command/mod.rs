use clap::{Parser, Subcommand};

use self::{generate::GenerateArg, run::RunArg};

mod generate;
mod run;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Generate a synthetic dataset and a matching embedding table
    Generate(#[clap(flatten)] GenerateArg),
    /// Cross-validate the predictive methods on a dataset
    Run(#[clap(flatten)] RunArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Generate(arg) => generate::run(&arg)?,
        Mode::Run(arg) => run::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use spatrel_cv::{metric::Metric, partition::PartitionScope};
    use spatrel_model::{Method, ModelKind};

    use super::*;

    #[test]
    fn test_run_defaults() {
        let args = CommandArgs::try_parse_from([
            "spatrel",
            "run",
            "data.json",
            "--embeddings",
            "emb.json",
        ])
        .unwrap();
        let Mode::Run(arg) = args.mode else {
            panic!("expected the run subcommand");
        };
        let config = arg.experiment_config();
        assert_eq!(config.model_kind, ModelKind::Grid);
        assert_eq!(config.grid_side, 15);
        assert_eq!(config.fold_count, 10);
        assert_eq!(config.methods, Method::ALL.to_vec());
        assert_eq!(config.metrics, Metric::defaults(ModelKind::Grid).to_vec());
        assert_eq!(config.generalized_scope, PartitionScope::Words);
        assert_eq!(config.clean_scope, PartitionScope::None);
    }

    #[test]
    fn test_run_lists_and_overrides() {
        let args = CommandArgs::try_parse_from([
            "spatrel",
            "run",
            "data.json",
            "--embeddings",
            "emb.json",
            "--model-type",
            "REG",
            "--methods",
            "ctrl,emb",
            "--metrics",
            "R2,IoU_t",
            "--eval-generalized-set",
            "none",
            "--eval-clean-set",
            "triplets",
            "--epochs",
            "3",
        ])
        .unwrap();
        let Mode::Run(arg) = args.mode else {
            panic!("expected the run subcommand");
        };
        let config = arg.experiment_config();
        assert_eq!(config.model_kind, ModelKind::Regression);
        assert_eq!(config.methods, vec![Method::Control, Method::Embedding]);
        assert_eq!(config.metrics, vec![Metric::R2, Metric::Iou]);
        assert_eq!(config.generalized_scope, PartitionScope::None);
        assert_eq!(config.clean_scope, PartitionScope::Triplets);
        assert_eq!(config.learning.epochs, 3);
        assert_eq!(config.learning.batch_size, 64);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = CommandArgs::try_parse_from([
            "spatrel",
            "run",
            "data.json",
            "--embeddings",
            "emb.json",
            "--methods",
            "init",
        ]);
        assert!(result.is_err());
    }
}
