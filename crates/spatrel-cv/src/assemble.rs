//! Flattening of the performance record into report tables.

use serde::{Deserialize, Serialize};
use spatrel_model::Method;
use spatrel_stats::descriptive::DescriptiveStats;

use crate::{
    metric::Metric,
    record::{PerformanceKey, PerformanceRecord, Population},
};

/// One `(method, metric)` row of a result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub method: Method,
    pub metric: Metric,
    /// One cell per fold column; `None` where the fold has no score.
    pub values: Vec<Option<f32>>,
    /// Summary of the finite values, if any.
    pub mean: Option<f32>,
    pub std_dev: Option<f32>,
}

/// Scores of one population, one column per fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub population: Population,
    /// Fold numbers of the columns, ascending.
    pub folds: Vec<usize>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    #[must_use]
    pub fn row(&self, method: Method, metric: Metric) -> Option<&ResultRow> {
        self.rows
            .iter()
            .find(|r| r.method == method && r.metric == metric)
    }
}

/// Builds the table of `population`.
///
/// Columns are the folds with at least one entry for the population, so a
/// fold that produced no scores is absent rather than filled with
/// placeholders. Rows follow `methods` order, then `metrics` order.
#[must_use]
pub fn flatten(
    record: &PerformanceRecord,
    population: Population,
    methods: &[Method],
    metrics: &[Metric],
) -> ResultTable {
    let folds = record.folds(population);
    let rows = methods
        .iter()
        .flat_map(|&method| metrics.iter().map(move |&metric| (method, metric)))
        .map(|(method, metric)| {
            let values = folds
                .iter()
                .map(|&fold| {
                    record.get(&PerformanceKey {
                        population,
                        method,
                        metric,
                        fold,
                    })
                })
                .collect::<Vec<_>>();
            let stats = DescriptiveStats::new(values.iter().flatten().copied());
            ResultRow {
                method,
                metric,
                values,
                mean: stats.as_ref().map(|s| s.mean),
                std_dev: stats.as_ref().map(|s| s.std_dev),
            }
        })
        .collect();
    ResultTable {
        population,
        folds,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(record: &mut PerformanceRecord, population: Population, method: Method, fold: usize, value: f32) {
        record
            .insert(
                PerformanceKey {
                    population,
                    method,
                    metric: Metric::AccuracyY,
                    fold,
                },
                value,
            )
            .unwrap();
    }

    #[test]
    fn test_rows_follow_caller_order() {
        let mut record = PerformanceRecord::new();
        for method in [Method::Embedding, Method::Control] {
            insert(&mut record, Population::Test, method, 1, 0.5);
        }
        let table = flatten(
            &record,
            Population::Test,
            &[Method::Control, Method::Embedding],
            &[Metric::F1Y, Metric::AccuracyY],
        );
        let order = table
            .rows
            .iter()
            .map(|r| (r.method, r.metric))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (Method::Control, Metric::F1Y),
                (Method::Control, Metric::AccuracyY),
                (Method::Embedding, Metric::F1Y),
                (Method::Embedding, Metric::AccuracyY),
            ]
        );
        assert_eq!(table.rows[0].values, vec![None]);
        assert_eq!(table.rows[0].mean, None);
    }

    #[test]
    fn test_absent_folds_are_not_columns() {
        let mut record = PerformanceRecord::new();
        insert(&mut record, Population::CleanTest, Method::Control, 2, 0.25);
        insert(&mut record, Population::CleanTest, Method::Control, 4, 0.75);
        insert(&mut record, Population::Test, Method::Control, 1, 0.1);
        let table = flatten(
            &record,
            Population::CleanTest,
            &[Method::Control],
            &[Metric::AccuracyY],
        );
        assert_eq!(table.folds, vec![2, 4]);
        let row = table.row(Method::Control, Metric::AccuracyY).unwrap();
        assert_eq!(row.values, vec![Some(0.25), Some(0.75)]);
        assert_eq!(row.mean, Some(0.5));
        assert_eq!(row.std_dev, Some(0.25));
    }

    #[test]
    fn test_nan_scores_are_kept_but_not_summarised() {
        let mut record = PerformanceRecord::new();
        insert(&mut record, Population::Test, Method::Control, 1, f32::NAN);
        insert(&mut record, Population::Test, Method::Control, 2, 0.4);
        let table = flatten(&record, Population::Test, &[Method::Control], &[Metric::AccuracyY]);
        let row = &table.rows[0];
        assert!(row.values[0].unwrap().is_nan());
        assert_eq!(row.mean, Some(0.4));
    }
}
