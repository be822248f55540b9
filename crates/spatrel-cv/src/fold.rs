use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// One train/test split of the eligible rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// 1-based fold number, as reported in result tables.
    pub number: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Standard k-fold splitting over `0..row_count`.
///
/// Rows are cut into `k` blocks; the first `row_count % k` blocks hold one
/// extra row. Fold `i` tests on block `i` and trains on the rest. With a
/// shuffle seed the rows are permuted first, deterministically.
///
/// ```
/// use spatrel_cv::fold::FoldSplitter;
///
/// let folds = FoldSplitter::new(3).split(7)?;
/// assert_eq!(folds[0].test, vec![0, 1, 2]);
/// assert_eq!(folds[1].test, vec![3, 4]);
/// assert_eq!(folds[2].train, vec![0, 1, 2, 3, 4]);
/// # Ok::<(), spatrel_cv::ConfigurationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldSplitter {
    folds: usize,
    shuffle_seed: Option<u64>,
}

impl FoldSplitter {
    #[must_use]
    pub fn new(folds: usize) -> Self {
        Self {
            folds,
            shuffle_seed: None,
        }
    }

    #[must_use]
    pub fn with_shuffle(self, seed: u64) -> Self {
        Self {
            shuffle_seed: Some(seed),
            ..self
        }
    }

    #[must_use]
    pub fn fold_count(&self) -> usize {
        self.folds
    }

    pub fn split(&self, row_count: usize) -> Result<Vec<Fold>, ConfigurationError> {
        if self.folds == 0 {
            return Err(ConfigurationError::InvalidFoldCount);
        }
        if row_count < self.folds {
            return Err(ConfigurationError::TooFewRows {
                rows: row_count,
                folds: self.folds,
            });
        }

        let mut order = (0..row_count).collect::<Vec<_>>();
        if let Some(seed) = self.shuffle_seed {
            order.shuffle(&mut Pcg32::seed_from_u64(seed));
        }

        let base = row_count / self.folds;
        let remainder = row_count % self.folds;
        let mut start = 0;
        let folds = (0..self.folds)
            .map(|i| {
                let end = start + base + usize::from(i < remainder);
                let fold = Fold {
                    number: i + 1,
                    train: order[..start].iter().chain(&order[end..]).copied().collect(),
                    test: order[start..end].to_vec(),
                };
                start = end;
                fold
            })
            .collect();
        Ok(folds)
    }
}
