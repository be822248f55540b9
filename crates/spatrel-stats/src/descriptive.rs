/// Descriptive statistics summarizing a series of scores.
///
/// Used to build the summary columns of result tables, where each series holds
/// one score per cross-validation fold. Non-finite values (for example the NaN
/// produced by an undefined correlation) are skipped and counted separately.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of finite values summarized.
    pub count: usize,
    /// Number of non-finite values that were skipped.
    pub skipped: usize,
    /// The minimum finite value.
    pub min: f32,
    /// The maximum finite value.
    pub max: f32,
    /// The arithmetic mean of the finite values.
    pub mean: f32,
    /// The population standard deviation of the finite values.
    pub std_dev: f32,
}

impl DescriptiveStats {
    /// Computes descriptive statistics over the finite values of `values`.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if at least one value is finite
    /// * `None` - if the series is empty or contains only non-finite values
    ///
    /// # Examples
    ///
    /// ```
    /// # use spatrel_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([1.0, f32::NAN, 3.0]).unwrap();
    /// assert_eq!(stats.count, 2);
    /// assert_eq!(stats.skipped, 1);
    /// assert_eq!(stats.mean, 2.0);
    /// assert_eq!(stats.std_dev, 1.0);
    ///
    /// assert!(DescriptiveStats::new([f32::NAN]).is_none());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut skipped = 0;
        let finite = values
            .into_iter()
            .filter(|v| {
                let keep = v.is_finite();
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .collect::<Vec<_>>();

        let min = finite.iter().copied().reduce(f32::min)?;
        let max = finite.iter().copied().reduce(f32::max)?;
        let n = finite.len() as f32;
        let mean = finite.iter().sum::<f32>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;

        Some(Self {
            count: finite.len(),
            skipped,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series() {
        assert!(DescriptiveStats::new(std::iter::empty()).is_none());
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::new([0.25]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 0.25);
        assert_eq!(stats.max, 0.25);
        assert_eq!(stats.mean, 0.25);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_skips_infinite_and_nan() {
        let stats = DescriptiveStats::new([f32::INFINITY, 2.0, f32::NAN, 4.0]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 3.0);
    }

    #[test]
    fn test_population_std_dev() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert!((stats.std_dev - 2.0).abs() < 1e-6);
    }
}
