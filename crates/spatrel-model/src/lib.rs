//! Predictive methods compared by the spatrel harness.
//!
//! Every method implements [`Model`]: it is trained on one fold's training
//! rows and then asked for predictions on any row set. The evaluation engine
//! treats models as black boxes; it only relies on the trait contract and on
//! the [`Model::export_state`] capability to decide whether a trained model
//! can be persisted.
//!
//! # Methods
//!
//! | id       | [`Method`]            | input representation                         |
//! |----------|-----------------------|----------------------------------------------|
//! | `emb`    | [`Method::Embedding`] | pretrained word vectors                      |
//! | `rnd`    | [`Method::Random`]    | fixed random vectors of the same dimension   |
//! | `onehot` | [`Method::OneHot`]    | one-hot blocks over the training vocabulary  |
//! | `ctrl`   | [`Method::Control`]   | none: predicts the training mean             |
//!
//! The three learned methods share the same multi-layer perceptron
//! ([`network::Mlp`]) and differ only in how words are encoded, so the
//! comparison isolates the value of the word representation.
//!
//! # Output Modes
//!
//! - [`ModelKind::Regression`] (`REG`): the object box `[ctr_x, ctr_y, sd_x, sd_y]`
//! - [`ModelKind::Grid`] (`PIX`): a `side × side` occupancy map per row
//!
//! # Example
//!
//! ```
//! use spatrel_data::synthetic::{self, SyntheticParams};
//! use spatrel_data::{BoundingBox, WordTriple};
//! use spatrel_model::{LearningParams, Method, ModelInputs, ModelKind, ModelStrategy};
//!
//! let (dataset, embeddings) = synthetic::generate(&SyntheticParams { rows: 40, ..Default::default() });
//! let features = dataset
//!     .triplets()
//!     .map(|t| WordTriple::resolve(t, &embeddings))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let extra = dataset.records.iter().map(|r| r.subject_box.to_array()).collect::<Vec<_>>();
//! let targets = dataset.records.iter().map(|r| r.object_box).collect::<Vec<BoundingBox>>();
//!
//! let strategy = ModelStrategy::new(Method::Embedding, ModelKind::Regression, LearningParams::for_kind(ModelKind::Regression));
//! let mut model = strategy.build(7);
//! let inputs = ModelInputs { features: &features, extra: &extra };
//! model.train(inputs, &targets, None, &embeddings)?;
//! let predictions = model.predict(inputs, &targets)?;
//! assert_eq!(predictions.len(), 40);
//! assert!(model.export_state().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;

use spatrel_data::{BoundingBox, DataError, EmbeddingTable, GridArray, GridView, WordTriple};

pub use self::{
    control::ControlModel,
    learner::NeuralModel,
    method::{Method, ModelKind, ParseMethodError, ParseModelKindError},
    params::{Activation, LearningParams, Loss},
    state::ModelState,
    strategy::ModelStrategy,
};

pub mod control;
pub mod encoding;
pub mod learner;
pub mod method;
pub mod network;
pub mod params;
pub mod state;
pub mod strategy;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ModelError {
    #[display("model must be trained before predicting")]
    NotTrained,
    #[display("cannot train on an empty row set")]
    EmptyTrainingSet,
    #[display("grid-output training requires grid targets")]
    MissingGridTargets,
    #[display("{what} has {actual} rows, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("{_0}")]
    Data(DataError),
}

impl From<DataError> for ModelError {
    fn from(e: DataError) -> Self {
        Self::Data(e)
    }
}

/// Row-aligned model inputs.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    /// Word indices of each row's triplet.
    pub features: &'a [WordTriple],
    /// Extra numeric features of each row (the subject box).
    pub extra: &'a [[f32; 4]],
}

impl ModelInputs<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub(crate) fn check(&self) -> Result<(), ModelError> {
        if self.extra.len() != self.features.len() {
            return Err(ModelError::LengthMismatch {
                what: "extra features",
                expected: self.features.len(),
                actual: self.extra.len(),
            });
        }
        Ok(())
    }
}

/// Per-row predictions in the representation of the model's output mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Boxes(Vec<BoundingBox>),
    Grids(GridArray),
}

impl Predictions {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Boxes(boxes) => boxes.len(),
            Self::Grids(grids) => grids.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Boxes(_) => ModelKind::Regression,
            Self::Grids(_) => ModelKind::Grid,
        }
    }
}

/// A predictive method under comparison.
///
/// A model instance is owned by a single fold and method; training mutates
/// its internal state and must not be shared.
pub trait Model: fmt::Debug + Send {
    fn method(&self) -> Method;

    /// Fits the model to a fold's training rows.
    ///
    /// `grid_targets` is required in grid-output mode and ignored otherwise.
    fn train(
        &mut self,
        inputs: ModelInputs<'_>,
        targets: &[BoundingBox],
        grid_targets: Option<&GridView<'_>>,
        embeddings: &EmbeddingTable,
    ) -> Result<(), ModelError>;

    /// Predicts every row of `inputs`.
    ///
    /// `train_targets` are the targets the model was trained on; baselines
    /// that predict training statistics read them.
    fn predict(
        &self,
        inputs: ModelInputs<'_>,
        train_targets: &[BoundingBox],
    ) -> Result<Predictions, ModelError>;

    /// Serializable trained state, if this method has any to persist.
    fn export_state(&self) -> Option<ModelState> {
        None
    }
}

pub type BoxedModel = Box<dyn Model>;
