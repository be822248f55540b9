//! Row-aligned slicing of the parallel dataset arrays.
//!
//! [`DatasetArrays`] holds one entry per row in each of its arrays. Slicing
//! gathers the small per-row arrays into owned vectors but never copies the
//! grid targets: a [`GridView`] keeps only the raw row ids and reads the
//! shared [`GridArray`] on demand. Every slice keeps the row ids it was built
//! from, so all arrays of a slice stay aligned with each other and with the
//! underlying population.

use spatrel_data::{
    BoundingBox, EmbeddingTable, GridArray, GridView, RelationRecord, RowGeometry, WordTriple,
};
use spatrel_model::ModelInputs;

use crate::{AlignmentError, ExperimentError, IndexError};

/// Parallel per-row arrays of a row population.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetArrays {
    features: Vec<WordTriple>,
    extra: Vec<[f32; 4]>,
    targets: Vec<BoundingBox>,
    grids: Option<GridArray>,
    geometry: Vec<RowGeometry>,
}

impl DatasetArrays {
    /// Bundles arrays after checking they all describe the same rows.
    pub fn new(
        features: Vec<WordTriple>,
        extra: Vec<[f32; 4]>,
        targets: Vec<BoundingBox>,
        grids: Option<GridArray>,
        geometry: Vec<RowGeometry>,
    ) -> Result<Self, AlignmentError> {
        let expected = features.len();
        let check = |array: &'static str, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(AlignmentError::LengthMismatch {
                    array,
                    expected,
                    actual,
                })
            }
        };
        check("extra features", extra.len())?;
        check("targets", targets.len())?;
        check("geometry", geometry.len())?;
        if let Some(grids) = &grids {
            check("grid targets", grids.len())?;
        }
        Ok(Self {
            features,
            extra,
            targets,
            grids,
            geometry,
        })
    }

    /// Builds the arrays of `records`, rasterising grid targets when
    /// `grid_side` is given.
    pub fn from_records(
        records: &[RelationRecord],
        embeddings: &EmbeddingTable,
        grid_side: Option<usize>,
    ) -> Result<Self, ExperimentError> {
        let features = records
            .iter()
            .map(|r| WordTriple::resolve(&r.triplet, embeddings))
            .collect::<Result<Vec<_>, _>>()?;
        let targets = records.iter().map(|r| r.object_box).collect::<Vec<_>>();
        let grids = grid_side.map(|side| GridArray::rasterize(&targets, side));
        Ok(Self::new(
            features,
            records.iter().map(|r| r.subject_box.to_array()).collect(),
            targets,
            grids,
            records.iter().map(RelationRecord::geometry).collect(),
        )?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn grids(&self) -> Option<&GridArray> {
        self.grids.as_ref()
    }

    /// A slice of the given raw row ids, in the given order.
    pub fn gather(&self, rows: &[usize]) -> Result<SlicedArrays<'_>, IndexError> {
        let len = self.len();
        if let Some(&row) = rows.iter().find(|&&row| row >= len) {
            return Err(IndexError::RowOutOfRange { row, len });
        }
        let grids = match &self.grids {
            Some(grids) => Some(
                GridView::new(grids, rows.to_vec())
                    .map_err(|e| IndexError::RowOutOfRange { row: e.row, len: e.len })?,
            ),
            None => None,
        };
        Ok(SlicedArrays {
            row_ids: rows.to_vec(),
            features: rows.iter().map(|&r| self.features[r]).collect(),
            extra: rows.iter().map(|&r| self.extra[r]).collect(),
            targets: rows.iter().map(|&r| self.targets[r]).collect(),
            grids,
            geometry: rows.iter().map(|&r| self.geometry[r]).collect(),
        })
    }
}

/// Row-aligned arrays restricted to a subset of a population.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicedArrays<'a> {
    row_ids: Vec<usize>,
    pub features: Vec<WordTriple>,
    pub extra: Vec<[f32; 4]>,
    pub targets: Vec<BoundingBox>,
    pub grids: Option<GridView<'a>>,
    pub geometry: Vec<RowGeometry>,
}

impl<'a> SlicedArrays<'a> {
    /// Raw row ids of the population, in slice order.
    #[must_use]
    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    #[must_use]
    pub fn inputs(&self) -> ModelInputs<'_> {
        ModelInputs {
            features: &self.features,
            extra: &self.extra,
        }
    }

    /// Re-indexes this slice by positions within it.
    ///
    /// `subset` holds positions in `0..self.len()`, not raw row ids.
    pub fn slice_by_subset(&self, subset: &[usize]) -> Result<SlicedArrays<'a>, IndexError> {
        let len = self.len();
        if let Some(&position) = subset.iter().find(|&&p| p >= len) {
            return Err(IndexError::SubsetOutOfRange { position, len });
        }
        let grids = match &self.grids {
            Some(view) => Some(
                view.select(subset).map_err(|e| IndexError::SubsetOutOfRange {
                    position: e.row,
                    len: e.len,
                })?,
            ),
            None => None,
        };
        Ok(SlicedArrays {
            row_ids: subset.iter().map(|&p| self.row_ids[p]).collect(),
            features: subset.iter().map(|&p| self.features[p]).collect(),
            extra: subset.iter().map(|&p| self.extra[p]).collect(),
            targets: subset.iter().map(|&p| self.targets[p]).collect(),
            grids,
            geometry: subset.iter().map(|&p| self.geometry[p]).collect(),
        })
    }

    /// Positions of the slice rows whose raw id satisfies `keep`.
    pub fn positions_where<F>(&self, mut keep: F) -> Vec<usize>
    where
        F: FnMut(usize) -> bool,
    {
        self.row_ids
            .iter()
            .enumerate()
            .filter(|&(_, &row)| keep(row))
            .map(|(pos, _)| pos)
            .collect()
    }
}

/// Slices `arrays` into a fold's train and test views.
pub fn slice<'a>(
    arrays: &'a DatasetArrays,
    train: &[usize],
    test: &[usize],
) -> Result<(SlicedArrays<'a>, SlicedArrays<'a>), IndexError> {
    Ok((arrays.gather(train)?, arrays.gather(test)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrays(rows: usize, with_grids: bool) -> DatasetArrays {
        let features = (0..rows)
            .map(|i| WordTriple {
                subject: i,
                relation: 0,
                object: i + 1,
            })
            .collect();
        #[expect(clippy::cast_precision_loss)]
        let targets = (0..rows)
            .map(|i| BoundingBox::new(i as f32 / rows as f32, 0.5, 0.1, 0.1))
            .collect::<Vec<_>>();
        let grids = with_grids.then(|| GridArray::rasterize(&targets, 4));
        let geometry = targets
            .iter()
            .map(|&object| RowGeometry {
                subject: BoundingBox::default(),
                object,
            })
            .collect();
        DatasetArrays::new(features, vec![[0.0; 4]; rows], targets, grids, geometry).unwrap()
    }

    #[test]
    fn test_misaligned_arrays_are_rejected() {
        let err = DatasetArrays::new(
            vec![WordTriple {
                subject: 0,
                relation: 0,
                object: 0,
            }],
            vec![],
            vec![BoundingBox::default()],
            None,
            vec![RowGeometry::default()],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AlignmentError::LengthMismatch {
                array: "extra features",
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_grid_rows_must_align() {
        let mut a = arrays(3, false);
        a.grids = Some(GridArray::zeros(4, 2));
        let err = DatasetArrays::new(a.features, a.extra, a.targets, a.grids, a.geometry);
        assert!(matches!(
            err,
            Err(AlignmentError::LengthMismatch {
                array: "grid targets",
                ..
            })
        ));
    }

    #[test]
    fn test_slice_keeps_rows_aligned() {
        let a = arrays(6, true);
        let (train, test) = slice(&a, &[0, 2, 4, 5], &[3, 1]).unwrap();
        assert_eq!(train.row_ids(), &[0, 2, 4, 5]);
        assert_eq!(test.len(), 2);
        for sliced in [&train, &test] {
            let grids = sliced.grids.as_ref().unwrap();
            for (pos, &row) in sliced.row_ids().iter().enumerate() {
                assert_eq!(sliced.features[pos].subject, row);
                assert_eq!(sliced.geometry[pos].object, sliced.targets[pos]);
                assert_eq!(grids.get(pos), a.grids().unwrap().row(row));
            }
        }
    }

    #[test]
    fn test_grid_view_shares_storage() {
        let a = arrays(4, true);
        let (train, _) = slice(&a, &[1, 3], &[0, 2]).unwrap();
        let view = train.grids.unwrap();
        assert!(std::ptr::eq(view.get(0), a.grids().unwrap().row(1)));
    }

    #[test]
    fn test_slice_out_of_range() {
        let a = arrays(3, true);
        assert_eq!(
            slice(&a, &[0, 1], &[3]).unwrap_err(),
            IndexError::RowOutOfRange { row: 3, len: 3 }
        );
    }

    #[test]
    fn test_identity_subset_is_equal() {
        let a = arrays(5, true);
        let (train, _) = slice(&a, &[4, 0, 3], &[1, 2]).unwrap();
        let identity = (0..train.len()).collect::<Vec<_>>();
        assert_eq!(train.slice_by_subset(&identity).unwrap(), train);
    }

    #[test]
    fn test_subset_uses_positions() {
        let a = arrays(5, true);
        let (train, _) = slice(&a, &[4, 0, 3], &[1, 2]).unwrap();
        let subset = train.slice_by_subset(&[2, 0]).unwrap();
        assert_eq!(subset.row_ids(), &[3, 4]);
        assert_eq!(subset.features[0].subject, 3);
        assert_eq!(subset.grids.unwrap().row_ids(), &[3, 4]);
        assert_eq!(
            train.slice_by_subset(&[3]).unwrap_err(),
            IndexError::SubsetOutOfRange { position: 3, len: 3 }
        );
    }

    #[test]
    fn test_positions_where() {
        let a = arrays(5, false);
        let view = a.gather(&[4, 1, 2]).unwrap();
        assert_eq!(view.positions_where(|row| row < 3), vec![1, 2]);
    }
}
