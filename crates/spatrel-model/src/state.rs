use serde::{Deserialize, Serialize};

use crate::{LearningParams, Method, ModelKind, encoding::Encoder, network::Mlp};

/// Persistable trained state of a learned method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub method: Method,
    pub kind: ModelKind,
    /// Side of the output grid, or `None` in regression mode.
    pub grid_side: Option<usize>,
    pub params: LearningParams,
    pub encoder: Encoder,
    pub network: Mlp,
}
