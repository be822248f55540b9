use crate::{BoxedModel, ControlModel, LearningParams, Method, ModelKind, NeuralModel};

/// Builds fresh, untrained models of one method.
///
/// The engine asks the strategy for a new instance for every fold, so no
/// trained state ever leaks between folds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelStrategy {
    pub method: Method,
    pub kind: ModelKind,
    pub params: LearningParams,
}

impl ModelStrategy {
    /// Grid-mode models take their output side from the grid targets they
    /// are trained on.
    #[must_use]
    pub fn new(method: Method, kind: ModelKind, params: LearningParams) -> Self {
        Self {
            method,
            kind,
            params,
        }
    }

    /// Creates an untrained model whose randomness is derived from `seed`.
    #[must_use]
    pub fn build(&self, seed: u64) -> BoxedModel {
        match self.method {
            Method::Control => Box::new(ControlModel::new(self.kind)),
            method @ (Method::Embedding | Method::Random | Method::OneHot) => {
                Box::new(NeuralModel::new(method, self.kind, self.params, seed))
            }
        }
    }
}
