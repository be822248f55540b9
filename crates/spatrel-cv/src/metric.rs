//! Scoring of predictions against targets.
//!
//! # Metrics
//!
//! | name         | modes    | definition |
//! |--------------|----------|------------|
//! | `R2`         | REG      | coefficient of determination, averaged over the four box components |
//! | `acc_y`      | REG, PIX | accuracy of "object above subject" |
//! | `F1_y`       | REG, PIX | F1 of "object above subject" as the positive class |
//! | `Pear_x`     | REG, PIX | Pearson correlation of predicted and true object centre x |
//! | `Pear_y`     | REG, PIX | Pearson correlation of predicted and true object centre y |
//! | `IoU_t`      | REG      | mean intersection over union of predicted and true boxes |
//! | `max_acc_px` | PIX      | fraction of rows whose highest predicted cell is active in the target grid |
//!
//! In grid mode both sides are read from grids: the predicted object centre
//! is the weighted centroid of the predicted map (centred when the map has no
//! positive weight) and the true centre is the centroid of the target map.
//! An identical grid prediction therefore scores maximal on every metric,
//! even when the object lies within half a cell of its subject.
//!
//! Correlations are `NaN` when either series is constant. A `NaN` score is
//! stored as such and skipped by the summary statistics, so it never reads
//! as a real value.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use spatrel_data::{BoundingBox, GridView, RowGeometry, grid};
use spatrel_model::{ModelKind, Predictions};
use spatrel_stats::{classification::BinaryCounts, correlation};

use crate::{AlignmentError, ConfigurationError, ExperimentError};

/// Cell value above which a target grid cell counts as active.
const ACTIVE_CELL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "R2")]
    R2,
    #[serde(rename = "acc_y")]
    AccuracyY,
    #[serde(rename = "F1_y")]
    F1Y,
    #[serde(rename = "Pear_x")]
    PearsonX,
    #[serde(rename = "Pear_y")]
    PearsonY,
    #[serde(rename = "IoU_t")]
    Iou,
    #[serde(rename = "max_acc_px")]
    MaxPixelAccuracy,
}

impl Metric {
    pub const ALL: [Self; 7] = [
        Self::R2,
        Self::AccuracyY,
        Self::F1Y,
        Self::PearsonX,
        Self::PearsonY,
        Self::Iou,
        Self::MaxPixelAccuracy,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R2 => "R2",
            Self::AccuracyY => "acc_y",
            Self::F1Y => "F1_y",
            Self::PearsonX => "Pear_x",
            Self::PearsonY => "Pear_y",
            Self::Iou => "IoU_t",
            Self::MaxPixelAccuracy => "max_acc_px",
        }
    }

    #[must_use]
    pub const fn applies_to(self, kind: ModelKind) -> bool {
        match self {
            Self::AccuracyY | Self::F1Y | Self::PearsonX | Self::PearsonY => true,
            Self::R2 | Self::Iou => matches!(kind, ModelKind::Regression),
            Self::MaxPixelAccuracy => matches!(kind, ModelKind::Grid),
        }
    }

    /// The default metric list of `kind`, in reporting order.
    #[must_use]
    pub const fn defaults(kind: ModelKind) -> &'static [Self] {
        match kind {
            ModelKind::Regression => &[
                Self::R2,
                Self::AccuracyY,
                Self::F1Y,
                Self::PearsonX,
                Self::PearsonY,
                Self::Iou,
            ],
            ModelKind::Grid => &[
                Self::AccuracyY,
                Self::F1Y,
                Self::PearsonX,
                Self::PearsonY,
                Self::MaxPixelAccuracy,
            ],
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownMetric { name: s.to_owned() })
    }
}

/// An ordered list of distinct metrics applicable to one output mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSet {
    kind: ModelKind,
    metrics: Vec<Metric>,
}

impl MetricSet {
    pub fn new(kind: ModelKind, metrics: Vec<Metric>) -> Result<Self, ConfigurationError> {
        if metrics.is_empty() {
            return Err(ConfigurationError::EmptyMetricList);
        }
        for (i, &metric) in metrics.iter().enumerate() {
            if !metric.applies_to(kind) {
                return Err(ConfigurationError::InapplicableMetric { metric, kind });
            }
            if metrics[..i].contains(&metric) {
                return Err(ConfigurationError::DuplicateMetric { metric });
            }
        }
        Ok(Self { kind, metrics })
    }

    #[must_use]
    pub fn for_kind(kind: ModelKind) -> Self {
        Self {
            kind,
            metrics: Metric::defaults(kind).to_vec(),
        }
    }

    /// Parses metric names into a set.
    ///
    /// ```
    /// use spatrel_cv::metric::{Metric, MetricSet};
    /// use spatrel_model::ModelKind;
    ///
    /// let set = MetricSet::parse(ModelKind::Grid, ["max_acc_px", "acc_y"])?;
    /// assert_eq!(set.metrics(), &[Metric::MaxPixelAccuracy, Metric::AccuracyY]);
    /// assert!(MetricSet::parse(ModelKind::Grid, ["R2"]).is_err());
    /// assert!(MetricSet::parse(ModelKind::Grid, ["mAP"]).is_err());
    /// # Ok::<(), spatrel_cv::ConfigurationError>(())
    /// ```
    pub fn parse<I, S>(kind: ModelKind, names: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metrics = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kind, metrics)
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.metrics.iter().copied()
    }
}

/// Scores of one evaluation, in metric-set order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scores {
    entries: Vec<(Metric, f32)>,
}

impl Scores {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f32> {
        self.entries
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f32)> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scores `predictions` against the targets of the same rows.
///
/// `geometry` carries each row's true subject and object boxes.
/// `grid_targets` is required in grid mode.
pub fn evaluate(
    predictions: &Predictions,
    targets: &[BoundingBox],
    grid_targets: Option<&GridView<'_>>,
    geometry: &[RowGeometry],
    metrics: &MetricSet,
    kind: ModelKind,
) -> Result<Scores, ExperimentError> {
    if predictions.kind() != kind {
        return Err(ConfigurationError::PredictionKindMismatch {
            expected: kind,
            actual: predictions.kind(),
        }
        .into());
    }
    if let Some(metric) = metrics.iter().find(|m| !m.applies_to(kind)) {
        return Err(ConfigurationError::InapplicableMetric { metric, kind }.into());
    }
    let rows = targets.len();
    check_len("predictions", rows, predictions.len())?;
    check_len("geometry", rows, geometry.len())?;

    let (truth, centres, boxes, grid_rows) = match predictions {
        Predictions::Boxes(boxes) => (
            targets.iter().map(|t| (t.ctr_x, t.ctr_y)).collect::<Vec<_>>(),
            boxes.iter().map(|b| (b.ctr_x, b.ctr_y)).collect::<Vec<_>>(),
            Some(boxes.as_slice()),
            None,
        ),
        Predictions::Grids(maps) => {
            let grid_targets = grid_targets.ok_or(AlignmentError::MissingGridTargets)?;
            check_len("grid targets", rows, grid_targets.len())?;
            if maps.side() != grid_targets.side() {
                return Err(AlignmentError::GridSideMismatch {
                    expected: grid_targets.side(),
                    actual: maps.side(),
                }
                .into());
            }
            let side = maps.side();
            let truth = grid_targets
                .iter()
                .zip(targets)
                .map(|(map, t)| grid::centroid(map, side).unwrap_or((t.ctr_x, t.ctr_y)))
                .collect::<Vec<_>>();
            let centres = maps
                .rows()
                .map(|map| grid::centroid(map, side).unwrap_or((0.5, 0.5)))
                .collect::<Vec<_>>();
            (truth, centres, None, Some((maps, grid_targets)))
        }
    };

    let above = BinaryCounts::from_pairs(
        geometry
            .iter()
            .zip(truth.iter().zip(&centres))
            .map(|(g, (&(_, true_y), &(_, pred_y)))| {
                (g.is_above_subject(true_y), g.is_above_subject(pred_y))
            }),
    );
    let true_x = truth.iter().map(|c| c.0).collect::<Vec<_>>();
    let true_y = truth.iter().map(|c| c.1).collect::<Vec<_>>();
    let pred_x = centres.iter().map(|c| c.0).collect::<Vec<_>>();
    let pred_y = centres.iter().map(|c| c.1).collect::<Vec<_>>();

    let entries = metrics
        .iter()
        .map(|metric| {
            let value = match metric {
                Metric::AccuracyY => above.accuracy(),
                Metric::F1Y => above.f1(),
                Metric::PearsonX => correlation::pearson(&pred_x, &true_x),
                Metric::PearsonY => correlation::pearson(&pred_y, &true_y),
                Metric::R2 => boxes.map_or(f32::NAN, |b| mean_r_squared(targets, b)),
                Metric::Iou => boxes.map_or(f32::NAN, |b| {
                    mean(targets.iter().zip(b).map(|(t, p)| t.iou(p)))
                }),
                Metric::MaxPixelAccuracy => grid_rows.map_or(f32::NAN, |(maps, truth)| {
                    mean(maps.rows().zip(truth.iter()).map(|(map, target)| {
                        let hit = grid::argmax(map)
                            .is_some_and(|cell| target[cell] > ACTIVE_CELL);
                        if hit { 1.0 } else { 0.0 }
                    }))
                }),
            };
            (metric, value)
        })
        .collect();
    Ok(Scores { entries })
}

fn check_len(array: &'static str, expected: usize, actual: usize) -> Result<(), AlignmentError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AlignmentError::LengthMismatch {
            array,
            expected,
            actual,
        })
    }
}

fn mean_r_squared(truth: &[BoundingBox], predicted: &[BoundingBox]) -> f32 {
    let component = |i: usize, boxes: &[BoundingBox]| {
        boxes.iter().map(|b| b.to_array()[i]).collect::<Vec<_>>()
    };
    mean((0..BoundingBox::COMPONENTS)
        .map(|i| correlation::r_squared(&component(i, truth), &component(i, predicted))))
}

/// Mean of `values`; `NaN` when empty.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn mean<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(s, n), v| (s + f64::from(v), n + 1));
    if n == 0 {
        return f32::NAN;
    }
    (sum / n as f64) as f32
}
