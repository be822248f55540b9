//! Result folder layout.
//!
//! ```text
//! <output_dir>/<kind>_<methods>_k<folds>_gen-<scope>_clean-<scope>_<timestamp>/
//! ├─ config.json                  run manifest
//! ├─ TRAIN-TEST.csv               train and test scores
//! ├─ GEN.csv                      generalized scores
//! ├─ CLEAN.csv                    clean train and test scores
//! ├─ INDIV_<method>_fld_<k>.csv   per-row test predictions
//! ├─ INDIV-GEN_<method>_fld_<k>.csv
//! ├─ INDIV-CLEAN_TST_<method>_fld_<k>.csv
//! └─ MODEL_<method>_fld_<k>.json  trained model state
//! ```
//!
//! Score tables are rewritten after every fold, so an interrupted run keeps
//! the scores of its finished folds.

use std::{
    collections::BTreeSet,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use spatrel_cv::{
    ExperimentConfig, ExperimentReport, FoldOutcome, PredictionDump, assemble::ResultTable,
    record::Population,
};
use spatrel_data::Dataset;
use spatrel_model::{Method, Predictions};

use crate::util::Output;

const BOX_COLUMNS: [&str; 4] = ["ctr_x", "ctr_y", "sd_x", "sd_y"];

#[derive(Debug, Clone)]
pub(crate) struct RunFolder {
    path: PathBuf,
}

impl RunFolder {
    pub(crate) fn create(
        output_dir: &Path,
        config: &ExperimentConfig,
        started_at: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let path = output_dir.join(folder_name(config, started_at));
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create result folder: {}", path.display()))?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_manifest<T>(&self, manifest: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        Output::save_json(manifest, Some(self.path.join("config.json")))
    }

    /// Rewrites every score table the report has.
    pub(crate) fn write_tables(&self, report: &ExperimentReport) -> anyhow::Result<()> {
        self.write_csv("TRAIN-TEST.csv", &tables_csv(&report.train_test_tables())?)?;
        if let Some(table) = report.generalized_table() {
            self.write_csv("GEN.csv", &tables_csv(&[table])?)?;
        }
        if let Some(tables) = report.clean_tables() {
            self.write_csv("CLEAN.csv", &tables_csv(&tables)?)?;
        }
        Ok(())
    }

    /// Writes the prediction dumps and model states a fold kept.
    pub(crate) fn write_fold(
        &self,
        dataset: &Dataset,
        outcome: &FoldOutcome,
        threshold: f32,
    ) -> anyhow::Result<()> {
        for method in &outcome.methods {
            for dump in &method.predictions {
                let Some(prefix) = dump_prefix(dump.population) else {
                    continue;
                };
                let name = format!("{prefix}_{}_fld_{}.csv", method.method, outcome.fold);
                self.write_csv(&name, &predictions_csv(dataset, dump, threshold)?)?;
            }
            if let Some(state) = &method.state {
                let path = self.path.join(model_file_name(method.method, outcome.fold));
                Output::open(path)?.write_json(state)?;
            }
        }
        Ok(())
    }

    fn write_csv(&self, name: &str, content: &str) -> anyhow::Result<()> {
        let path = self.path.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))
    }
}

pub(crate) fn folder_name(config: &ExperimentConfig, started_at: DateTime<Utc>) -> String {
    let methods = config
        .methods
        .iter()
        .map(|m| m.id())
        .collect::<Vec<_>>()
        .join("-");
    format!(
        "{}_{methods}_k{}_gen-{}_clean-{}_{}",
        config.model_kind,
        config.fold_count,
        config.generalized_scope,
        config.clean_scope,
        started_at.format("%Y%m%d-%H%M%S"),
    )
}

fn model_file_name(method: Method, fold: usize) -> String {
    format!("MODEL_{method}_fld_{fold}.json")
}

/// File prefix of a prediction dump; training predictions are never written.
fn dump_prefix(population: Population) -> Option<&'static str> {
    match population {
        Population::Test => Some("INDIV"),
        Population::Generalized => Some("INDIV-GEN"),
        Population::CleanTest => Some("INDIV-CLEAN_TST"),
        Population::Train | Population::CleanTrain => None,
    }
}

/// Renders result tables as one wide CSV.
///
/// Fold columns are the union of the tables' folds; a table lacking a fold
/// leaves that cell empty, as does a missing score.
pub(crate) fn tables_csv(tables: &[ResultTable]) -> anyhow::Result<String> {
    let folds = tables
        .iter()
        .flat_map(|t| t.folds.iter().copied())
        .collect::<BTreeSet<_>>();

    let mut csv = String::from("population,method,metric");
    for fold in &folds {
        write!(&mut csv, ",fold_{fold}").context("Failed to write CSV header")?;
    }
    csv.push_str(",mean,std_dev\n");

    for table in tables {
        for row in &table.rows {
            write!(&mut csv, "{},{},{}", table.population, row.method, row.metric)
                .with_context(|| format!("Failed to write CSV row for {}", row.method))?;
            for fold in &folds {
                let value = table
                    .folds
                    .iter()
                    .position(|f| f == fold)
                    .and_then(|column| row.values[column]);
                csv.push(',');
                csv.push_str(&cell(value));
            }
            writeln!(&mut csv, ",{},{}", cell(row.mean), cell(row.std_dev))
                .with_context(|| format!("Failed to write CSV row for {}", row.method))?;
        }
    }
    Ok(csv)
}

fn cell(value: Option<f32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Renders one prediction dump next to the true object boxes.
///
/// Grid predictions list the cells at or above `threshold` as
/// space-separated `cell:value` pairs.
pub(crate) fn predictions_csv(
    dataset: &Dataset,
    dump: &PredictionDump,
    threshold: f32,
) -> anyhow::Result<String> {
    let mut csv = format!("row,subject,relation,object,{}", box_columns("obj"));
    match &dump.predictions {
        Predictions::Boxes(_) => {
            writeln!(&mut csv, ",{}", box_columns("pred")).context("Failed to write CSV header")?;
        }
        Predictions::Grids(_) => csv.push_str(",active_cells\n"),
    }

    for (i, &row) in dump.row_ids.iter().enumerate() {
        let record = dataset
            .records
            .get(row)
            .with_context(|| format!("Row {row} is not in the dataset"))?;
        let t = &record.triplet;
        let [x, y, w, h] = record.object_box.to_array();
        write!(
            &mut csv,
            "{row},{},{},{},{x},{y},{w},{h}",
            t.subject, t.relation, t.object
        )
        .with_context(|| format!("Failed to write CSV data for row {row}"))?;

        let written = match &dump.predictions {
            Predictions::Boxes(boxes) => {
                let [px, py, pw, ph] = boxes[i].to_array();
                writeln!(&mut csv, ",{px},{py},{pw},{ph}")
            }
            Predictions::Grids(grids) => {
                let cells = grids
                    .row(i)
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v >= threshold)
                    .map(|(c, v)| format!("{c}:{v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(&mut csv, ",{cells}")
            }
        };
        written.with_context(|| format!("Failed to write CSV data for row {row}"))?;
    }
    Ok(csv)
}

fn box_columns(prefix: &str) -> String {
    BOX_COLUMNS.map(|c| format!("{prefix}_{c}")).join(",")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use spatrel_cv::{assemble::ResultRow, metric::Metric, partition::PartitionScope};
    use spatrel_data::{BoundingBox, GridArray, RelationRecord, Triplet};
    use spatrel_model::ModelKind;

    use super::*;

    fn dataset() -> Dataset {
        let record = |object: &str, x: f32| RelationRecord {
            triplet: Triplet::new("man", "riding", object),
            subject_box: BoundingBox::new(0.5, 0.5, 0.1, 0.1),
            object_box: BoundingBox::new(x, 0.25, 0.5, 0.125),
        };
        Dataset::new(vec![record("horse", 0.5), record("bike", 0.75)])
    }

    fn row(method: Method, values: Vec<Option<f32>>, mean: Option<f32>) -> ResultRow {
        ResultRow {
            method,
            metric: Metric::AccuracyY,
            values,
            mean,
            std_dev: mean.map(|_| 0.0),
        }
    }

    #[test]
    fn test_folder_name() {
        let config = ExperimentConfig {
            methods: vec![Method::Embedding, Method::Control],
            fold_count: 5,
            clean_scope: PartitionScope::Triplets,
            ..ExperimentConfig::new(ModelKind::Regression)
        };
        let started_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            folder_name(&config, started_at),
            "REG_emb-ctrl_k5_gen-words_clean-triplets_20240309-140507"
        );
    }

    #[test]
    fn test_dump_prefixes() {
        assert_eq!(dump_prefix(Population::Test), Some("INDIV"));
        assert_eq!(dump_prefix(Population::Generalized), Some("INDIV-GEN"));
        assert_eq!(dump_prefix(Population::CleanTest), Some("INDIV-CLEAN_TST"));
        assert_eq!(dump_prefix(Population::CleanTrain), None);
        assert_eq!(model_file_name(Method::OneHot, 3), "MODEL_onehot_fld_3.json");
    }

    #[test]
    fn test_tables_csv_aligns_fold_columns() {
        let tables = [
            ResultTable {
                population: Population::CleanTrain,
                folds: vec![1, 3],
                rows: vec![row(Method::Control, vec![Some(0.5), Some(1.0)], Some(0.75))],
            },
            ResultTable {
                population: Population::CleanTest,
                folds: vec![3],
                rows: vec![row(Method::Control, vec![None], None)],
            },
        ];
        let csv = tables_csv(&tables).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "population,method,metric,fold_1,fold_3,mean,std_dev",
                "clean_train,ctrl,acc_y,0.5,1,0.75,0",
                "clean_test,ctrl,acc_y,,,,",
            ]
        );
    }

    #[test]
    fn test_box_predictions_csv() {
        let dump = PredictionDump {
            population: Population::Test,
            row_ids: vec![1],
            predictions: Predictions::Boxes(vec![BoundingBox::new(0.5, 0.5, 0.25, 0.25)]),
        };
        let csv = predictions_csv(&dataset(), &dump, 0.1).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "row,subject,relation,object,obj_ctr_x,obj_ctr_y,obj_sd_x,obj_sd_y,\
             pred_ctr_x,pred_ctr_y,pred_sd_x,pred_sd_y"
        );
        assert_eq!(lines[1], "1,man,riding,bike,0.75,0.25,0.5,0.125,0.5,0.5,0.25,0.25");
    }

    #[test]
    fn test_grid_predictions_omit_cells_below_threshold() {
        let grids = GridArray::from_flat(2, vec![0.05, 0.5, 0.1, 0.0]).unwrap();
        let dump = PredictionDump {
            population: Population::Generalized,
            row_ids: vec![0],
            predictions: Predictions::Grids(grids),
        };
        let csv = predictions_csv(&dataset(), &dump, 0.1).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();
        assert!(lines[0].ends_with(",active_cells"));
        assert_eq!(lines[1], "0,man,riding,horse,0.5,0.25,0.5,0.125,1:0.5 2:0.1");
    }

    #[test]
    fn test_unknown_row_is_an_error() {
        let dump = PredictionDump {
            population: Population::Test,
            row_ids: vec![7],
            predictions: Predictions::Boxes(vec![BoundingBox::new(0.5, 0.5, 0.1, 0.1)]),
        };
        assert!(predictions_csv(&dataset(), &dump, 0.1).is_err());
    }
}
