use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use spatrel_model::Method;

use crate::{ExperimentError, metric::Metric};

/// The row population a score was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    Train,
    Test,
    CleanTrain,
    CleanTest,
    Generalized,
}

impl Population {
    pub const ALL: [Self; 5] = [
        Self::Train,
        Self::Test,
        Self::CleanTrain,
        Self::CleanTest,
        Self::Generalized,
    ];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
            Self::CleanTrain => "clean_train",
            Self::CleanTest => "clean_test",
            Self::Generalized => "generalized",
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PerformanceKey {
    pub population: Population,
    pub method: Method,
    pub metric: Metric,
    /// 1-based fold number.
    pub fold: usize,
}

impl fmt::Display for PerformanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/fold {}",
            self.population, self.method, self.metric, self.fold
        )
    }
}

/// Append-only store of every score of a run.
///
/// Each key is written at most once; a fold that produced no score for a
/// population simply has no entry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PerformanceRecord {
    entries: BTreeMap<PerformanceKey, f32>,
}

impl PerformanceRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: PerformanceKey, value: f32) -> Result<(), ExperimentError> {
        if self.entries.contains_key(&key) {
            return Err(ExperimentError::DuplicateRecord { key });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Moves every entry of `other` into this record.
    pub fn merge(&mut self, other: Self) -> Result<(), ExperimentError> {
        for (key, value) in other.entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &PerformanceKey) -> Option<f32> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PerformanceKey, f32)> + '_ {
        self.entries.iter().map(|(k, &v)| (k, v))
    }

    /// Folds holding at least one entry for `population`, ascending.
    #[must_use]
    pub fn folds(&self, population: Population) -> Vec<usize> {
        self.entries
            .keys()
            .filter(|k| k.population == population)
            .map(|k| k.fold)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn contains_fold(&self, population: Population, fold: usize) -> bool {
        self.entries
            .keys()
            .any(|k| k.population == population && k.fold == fold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(population: Population, fold: usize) -> PerformanceKey {
        PerformanceKey {
            population,
            method: Method::Control,
            metric: Metric::AccuracyY,
            fold,
        }
    }

    #[test]
    fn test_keys_are_written_once() {
        let mut record = PerformanceRecord::new();
        record.insert(key(Population::Test, 1), 0.5).unwrap();
        let err = record.insert(key(Population::Test, 1), 0.7).unwrap_err();
        assert!(matches!(err, ExperimentError::DuplicateRecord { .. }));
        assert_eq!(record.get(&key(Population::Test, 1)), Some(0.5));
    }

    #[test]
    fn test_folds_per_population() {
        let mut record = PerformanceRecord::new();
        record.insert(key(Population::Test, 3), 0.1).unwrap();
        record.insert(key(Population::Test, 1), 0.2).unwrap();
        record.insert(key(Population::CleanTest, 2), 0.3).unwrap();
        assert_eq!(record.folds(Population::Test), vec![1, 3]);
        assert_eq!(record.folds(Population::CleanTest), vec![2]);
        assert!(record.folds(Population::Generalized).is_empty());
        assert!(!record.contains_fold(Population::CleanTest, 1));
    }

    #[test]
    fn test_merge_rejects_collisions() {
        let mut a = PerformanceRecord::new();
        a.insert(key(Population::Train, 1), 0.1).unwrap();
        let mut b = PerformanceRecord::new();
        b.insert(key(Population::Train, 2), 0.2).unwrap();
        a.merge(b.clone()).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.merge(b).is_err());
    }
}
