//! Dense per-row grid targets.
//!
//! Grid-output models predict, for every row, a `side × side` map of how
//! likely each cell is to be covered by the object. [`GridArray`] stores those
//! maps contiguously (row-major, one map per row) and is by far the largest
//! array of a dataset, so subsets of it are expressed as a [`GridView`]: a
//! borrowed array plus the list of row ids the view exposes. Re-indexing a
//! view composes the id lists; the cell data is never copied.
//!
//! Cell `i` of a map sits at column `i % side` and row `i / side`, with row 0
//! at the bottom of the image (see [`cell_center`]).

use crate::{BoundingBox, DataError};

#[derive(Debug, Clone, PartialEq)]
pub struct GridArray {
    side: usize,
    data: Vec<f32>,
}

impl GridArray {
    /// Creates `rows` all-zero maps.
    #[must_use]
    pub fn zeros(side: usize, rows: usize) -> Self {
        Self {
            side,
            data: vec![0.0; side * side * rows],
        }
    }

    /// Wraps flat row-major storage holding whole maps.
    pub fn from_flat(side: usize, data: Vec<f32>) -> Result<Self, DataError> {
        let cells = side * side;
        if cells == 0 || data.len() % cells != 0 {
            return Err(DataError::GridSize {
                cells,
                actual: data.len(),
            });
        }
        Ok(Self { side, data })
    }

    /// Builds binary occupancy maps for object boxes.
    ///
    /// A cell is set when its centre lies inside the box. Boxes too small to
    /// cover any cell centre set the single cell containing the box centre, so
    /// every map has at least one active cell.
    ///
    /// ```
    /// use spatrel_data::{BoundingBox, GridArray};
    ///
    /// let grids = GridArray::rasterize(&[BoundingBox::new(0.5, 0.5, 0.25, 0.25)], 5);
    /// assert_eq!(grids.row(0).iter().filter(|&&v| v > 0.5).count(), 9);
    /// ```
    #[must_use]
    pub fn rasterize(boxes: &[BoundingBox], side: usize) -> Self {
        let mut grids = Self::zeros(side, boxes.len());
        for (i, bbox) in boxes.iter().enumerate() {
            let map = grids.row_mut(i);
            let mut any = false;
            for (cell, value) in map.iter_mut().enumerate() {
                let (x, y) = cell_center(side, cell);
                if bbox.contains(x, y) {
                    *value = 1.0;
                    any = true;
                }
            }
            if !any {
                map[cell_at(side, bbox.ctr_x, bbox.ctr_y)] = 1.0;
            }
        }
        grids
    }

    #[must_use]
    pub fn side(&self) -> usize {
        self.side
    }

    #[must_use]
    pub fn cells(&self) -> usize {
        self.side * self.side
    }

    /// Number of maps stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.cells()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Map of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        let cells = self.cells();
        &self.data[i * cells..(i + 1) * cells]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        let cells = self.cells();
        &mut self.data[i * cells..(i + 1) * cells]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cells())
    }

    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// A view over every row, in order.
    #[must_use]
    pub fn full_view(&self) -> GridView<'_> {
        GridView {
            grids: self,
            rows: (0..self.len()).collect(),
        }
    }

    fn check_row(&self, row: usize) -> Result<(), RowOutOfRange> {
        if row >= self.len() {
            return Err(RowOutOfRange {
                row,
                len: self.len(),
            });
        }
        Ok(())
    }
}

/// A lazily indexed subset of a [`GridArray`].
/// A raw row id (or view position) past the end of its index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("row {row} is out of range for {len} rows")]
pub struct RowOutOfRange {
    pub row: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridView<'a> {
    grids: &'a GridArray,
    rows: Vec<usize>,
}

impl<'a> GridView<'a> {
    /// A view of `grids` restricted to the raw row ids in `rows`.
    pub fn new(grids: &'a GridArray, rows: Vec<usize>) -> Result<Self, RowOutOfRange> {
        for &row in &rows {
            grids.check_row(row)?;
        }
        Ok(Self { grids, rows })
    }

    /// Re-indexes this view by positions within it.
    ///
    /// ```
    /// use spatrel_data::GridArray;
    ///
    /// let grids = GridArray::from_flat(1, vec![10.0, 11.0, 12.0, 13.0])?;
    /// let view = spatrel_data::GridView::new(&grids, vec![3, 1, 2])?;
    /// let subset = view.select(&[2, 0])?;
    /// assert_eq!(subset.row_ids(), &[2, 3]);
    /// assert_eq!(subset.get(0), &[12.0]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// An out-of-range position is reported with `row` set to the position.
    pub fn select(&self, positions: &[usize]) -> Result<GridView<'a>, RowOutOfRange> {
        let rows = positions
            .iter()
            .map(|&pos| {
                self.rows
                    .get(pos)
                    .copied()
                    .ok_or(RowOutOfRange {
                        row: pos,
                        len: self.rows.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GridView {
            grids: self.grids,
            rows,
        })
    }

    #[must_use]
    pub fn side(&self) -> usize {
        self.grids.side()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw row ids of the underlying array, in view order.
    #[must_use]
    pub fn row_ids(&self) -> &[usize] {
        &self.rows
    }

    /// Map at view position `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of range.
    #[must_use]
    pub fn get(&self, pos: usize) -> &'a [f32] {
        self.grids.row(self.rows[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        self.rows.iter().map(|&row| self.grids.row(row))
    }
}

/// Centre of `cell` in unit-square coordinates.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn cell_center(side: usize, cell: usize) -> (f32, f32) {
    let (row, col) = (cell / side, cell % side);
    let side = side as f32;
    ((col as f32 + 0.5) / side, (row as f32 + 0.5) / side)
}

/// Index of the cell containing `(x, y)`; coordinates are clamped to the grid.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn cell_at(side: usize, x: f32, y: f32) -> usize {
    let to_index = |v: f32| ((v * side as f32).floor().max(0.0) as usize).min(side - 1);
    to_index(y) * side + to_index(x)
}

/// Weighted centroid of a map over cell centres.
///
/// Negative cell values are ignored. Returns `None` when the map carries no
/// positive weight.
#[must_use]
pub fn centroid(map: &[f32], side: usize) -> Option<(f32, f32)> {
    let (mut sum_w, mut sum_x, mut sum_y) = (0.0_f32, 0.0_f32, 0.0_f32);
    for (cell, &value) in map.iter().enumerate() {
        let w = value.max(0.0);
        let (x, y) = cell_center(side, cell);
        sum_w += w;
        sum_x += w * x;
        sum_y += w * y;
    }
    (sum_w > 0.0).then(|| (sum_x / sum_w, sum_y / sum_w))
}

/// Index of the highest-valued cell (first on ties).
#[must_use]
pub fn argmax(map: &[f32]) -> Option<usize> {
    map.iter()
        .enumerate()
        .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
        .map(|(i, _)| i)
}
