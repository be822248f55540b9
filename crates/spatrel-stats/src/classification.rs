//! Binary classification counts.

/// Confusion counts for a binary decision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BinaryCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl BinaryCounts {
    /// Tallies `(truth, predicted)` pairs.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        pairs
            .into_iter()
            .fold(Self::default(), |mut counts, (truth, predicted)| {
                match (truth, predicted) {
                    (true, true) => counts.true_positives += 1,
                    (false, true) => counts.false_positives += 1,
                    (false, false) => counts.true_negatives += 1,
                    (true, false) => counts.false_negatives += 1,
                }
                counts
            })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Fraction of correct decisions; `NaN` when nothing was counted.
    #[must_use]
    pub fn accuracy(&self) -> f32 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Precision of the positive class; 0.0 when nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f32 {
        ratio_or_zero(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// Recall of the positive class; 0.0 when there are no actual positives.
    #[must_use]
    pub fn recall(&self) -> f32 {
        ratio_or_zero(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// F1 score of the positive class.
    ///
    /// Computed as `2·TP / (2·TP + FP + FN)`, which is 0.0 when the positive
    /// class never appears in either truth or prediction.
    #[must_use]
    pub fn f1(&self) -> f32 {
        ratio_or_zero(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }
}

#[expect(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        return f32::NAN;
    }
    numerator as f32 / denominator as f32
}

fn ratio_or_zero(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        ratio(numerator, denominator)
    }
}
