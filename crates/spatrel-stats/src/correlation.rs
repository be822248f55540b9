//! Linear association between predicted and true values.
//!
//! Both functions accumulate in `f64` and return `f32`, matching the precision
//! the rest of the harness stores scores in.

/// Pearson correlation coefficient between two equally long series.
///
/// Returns `NaN` when either series has zero variance or fewer than two
/// values, since the coefficient is undefined there.
///
/// # Panics
///
/// Panics if the series differ in length.
///
/// # Examples
///
/// ```
/// use spatrel_stats::correlation::pearson;
///
/// let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
/// assert!((r + 1.0).abs() < 1e-6);
/// assert!(pearson(&[1.0, 1.0], &[1.0, 2.0]).is_nan());
/// ```
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn pearson(xs: &[f32], ys: &[f32]) -> f32 {
    assert_eq!(xs.len(), ys.len(), "series must have equal length");
    if xs.len() < 2 {
        return f32::NAN;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let mean_y = ys.iter().map(|&y| f64::from(y)).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = f64::from(x) - mean_x;
        let dy = f64::from(y) - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return f32::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Coefficient of determination of `predicted` against `truth`.
///
/// A perfect prediction scores 1.0; predicting the mean scores 0.0. When the
/// truth has zero variance the score is 1.0 for an exact prediction and 0.0
/// otherwise, so the result is always finite for non-empty input.
///
/// Returns `NaN` for empty series.
///
/// # Panics
///
/// Panics if the series differ in length.
///
/// # Examples
///
/// ```
/// use spatrel_stats::correlation::r_squared;
///
/// assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
/// assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]), 0.0);
/// ```
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn r_squared(truth: &[f32], predicted: &[f32]) -> f32 {
    assert_eq!(
        truth.len(),
        predicted.len(),
        "series must have equal length"
    );
    if truth.is_empty() {
        return f32::NAN;
    }

    let n = truth.len() as f64;
    let mean = truth.iter().map(|&t| f64::from(t)).sum::<f64>() / n;
    let residual = truth
        .iter()
        .zip(predicted)
        .map(|(&t, &p)| (f64::from(t) - f64::from(p)).powi(2))
        .sum::<f64>();
    let total = truth
        .iter()
        .map(|&t| (f64::from(t) - mean).powi(2))
        .sum::<f64>();

    if total <= f64::EPSILON {
        return if residual <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - residual / total) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_perfect_positive() {
        let xs = [0.1, 0.4, 0.2, 0.9];
        let ys = xs.map(|x| 3.0 * x - 1.0);
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_uncorrelated() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, -1.0, -1.0, 1.0];
        assert!(pearson(&xs, &ys).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_too_short() {
        assert!(pearson(&[1.0], &[2.0]).is_nan());
        assert!(pearson(&[], &[]).is_nan());
    }

    #[test]
    fn test_r_squared_constant_truth() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_r_squared_can_be_negative() {
        let r2 = r_squared(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
        assert!((r2 + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_r_squared_empty() {
        assert!(r_squared(&[], &[]).is_nan());
    }
}
