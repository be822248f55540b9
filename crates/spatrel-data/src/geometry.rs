use serde::{Deserialize, Serialize};

/// An axis-aligned box given by its centre and half-extent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ctr_x: f32,
    pub ctr_y: f32,
    pub sd_x: f32,
    pub sd_y: f32,
}

impl BoundingBox {
    pub const COMPONENTS: usize = 4;

    #[must_use]
    pub const fn new(ctr_x: f32, ctr_y: f32, sd_x: f32, sd_y: f32) -> Self {
        Self {
            ctr_x,
            ctr_y,
            sd_x,
            sd_y,
        }
    }

    /// Components in `[ctr_x, ctr_y, sd_x, sd_y]` order.
    #[must_use]
    pub const fn to_array(self) -> [f32; Self::COMPONENTS] {
        [self.ctr_x, self.ctr_y, self.sd_x, self.sd_y]
    }

    #[must_use]
    pub const fn from_array([ctr_x, ctr_y, sd_x, sd_y]: [f32; Self::COMPONENTS]) -> Self {
        Self::new(ctr_x, ctr_y, sd_x, sd_y)
    }

    /// Reflects the box horizontally across the image centre.
    #[must_use]
    pub fn mirrored_x(self) -> Self {
        Self {
            ctr_x: 1.0 - self.ctr_x,
            ..self
        }
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (x - self.ctr_x).abs() <= self.sd_x.abs() && (y - self.ctr_y).abs() <= self.sd_y.abs()
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        4.0 * self.sd_x.abs() * self.sd_y.abs()
    }

    /// Intersection over union with `other`.
    ///
    /// Negative half-extents are treated by magnitude. Two degenerate boxes
    /// (zero area) score 0.0.
    ///
    /// ```
    /// use spatrel_data::BoundingBox;
    ///
    /// let a = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
    /// let b = BoundingBox::new(0.6, 0.5, 0.1, 0.1);
    /// assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    /// assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-5);
    /// ```
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let overlap = |c1: f32, s1: f32, c2: f32, s2: f32| {
            let (s1, s2) = (s1.abs(), s2.abs());
            ((c1 + s1).min(c2 + s2) - (c1 - s1).max(c2 - s2)).max(0.0)
        };
        let intersection = overlap(self.ctr_x, self.sd_x, other.ctr_x, other.sd_x)
            * overlap(self.ctr_y, self.sd_y, other.ctr_y, other.sd_y);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Subject and object boxes of a single row.
///
/// Carried alongside the training arrays as per-row metadata: the metrics that
/// judge "is the object above the subject?" and the predicted object centre
/// need both boxes regardless of the model's output representation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowGeometry {
    pub subject: BoundingBox,
    pub object: BoundingBox,
}

impl RowGeometry {
    /// Whether an object centred at height `ctr_y` lies strictly above the
    /// subject centre.
    #[must_use]
    pub fn is_above_subject(&self, ctr_y: f32) -> bool {
        ctr_y > self.subject.ctr_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_boxes_have_zero_iou() {
        let a = BoundingBox::new(0.2, 0.2, 0.05, 0.05);
        let b = BoundingBox::new(0.8, 0.8, 0.05, 0.05);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_degenerate_boxes() {
        let a = BoundingBox::new(0.5, 0.5, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_negative_extent_treated_by_magnitude() {
        let a = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
        let b = BoundingBox::new(0.5, 0.5, -0.1, -0.1);
        assert!((a.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mirror_is_involution() {
        let a = BoundingBox::new(0.3, 0.7, 0.1, 0.2);
        assert!((a.mirrored_x().ctr_x - 0.7).abs() < 1e-6);
        assert!((a.mirrored_x().mirrored_x().ctr_x - a.ctr_x).abs() < 1e-6);
        assert_eq!(a.mirrored_x().ctr_y, a.ctr_y);
    }

    #[test]
    fn test_contains() {
        let a = BoundingBox::new(0.5, 0.5, 0.1, 0.2);
        assert!(a.contains(0.55, 0.65));
        assert!(!a.contains(0.65, 0.5));
    }

    #[test]
    fn test_object_above_subject() {
        let geometry = RowGeometry {
            subject: BoundingBox::new(0.5, 0.4, 0.1, 0.1),
            object: BoundingBox::new(0.5, 0.6, 0.1, 0.1),
        };
        assert!(geometry.is_above_subject(geometry.object.ctr_y));
        assert!(!geometry.is_above_subject(geometry.subject.ctr_y));
    }
}
