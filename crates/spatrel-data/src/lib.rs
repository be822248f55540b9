//! Data model for spatial-relation experiments.
//!
//! A training example describes a *subject* and an *object* in an image, the
//! *relation* word linking them (for example `man riding horse`), and the
//! bounding boxes of both participants. Models learn to predict where the
//! object lies given the subject's box and the three words.
//!
//! # Data Structure
//!
//! ```text
//! Dataset
//! └─ records: Vec<RelationRecord>
//!     ├─ triplet (subject, relation, object words)
//!     ├─ subject_box (centre + half-extent)
//!     └─ object_box  (centre + half-extent)
//!
//! EmbeddingTable
//! └─ word → vector (fixed dimension)
//!
//! GridArray
//! └─ one side × side occupancy grid per row (dense, row-major)
//! ```
//!
//! # Coordinates
//!
//! All coordinates are normalised to the unit square with `y` growing
//! upward. A box is stored as its centre (`ctr_x`, `ctr_y`) and half-extent
//! (`sd_x`, `sd_y`). Grid cells use the same frame: cell `(row, col)` covers
//! `[col/side, (col+1)/side) × [row/side, (row+1)/side)`.
//!
//! # Modules
//!
//! - [`geometry`]: bounding boxes and per-row geometry
//! - [`triplet`]: word triplets and their vocabulary indices
//! - [`dataset`]: relation records and dataset-level preprocessing
//! - [`grid`]: dense grid targets and lazy row views over them
//! - [`embedding`]: word embedding tables
//! - [`synthetic`]: deterministic synthetic datasets for demos and tests

pub use self::{
    dataset::{Dataset, RelationRecord},
    embedding::EmbeddingTable,
    geometry::{BoundingBox, RowGeometry},
    grid::{GridArray, GridView, RowOutOfRange},
    triplet::{Triplet, WordTriple},
};

pub mod dataset;
pub mod embedding;
pub mod geometry;
pub mod grid;
pub mod synthetic;
pub mod triplet;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DataError {
    #[display("word '{word}' is not in the embedding table")]
    UnknownWord { word: String },
    #[display("word '{word}' appears more than once in the embedding table")]
    DuplicateWord { word: String },
    #[display("embedding storage holds {actual} values, expected {expected}")]
    EmbeddingSize { expected: usize, actual: usize },
    #[display("grid storage holds {actual} values, expected a multiple of {cells}")]
    GridSize { cells: usize, actual: usize },
}
