use serde::{Deserialize, Serialize};

use crate::ModelKind;

/// Hidden-layer activation function.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
    Linear,
}

impl Activation {
    #[must_use]
    pub fn apply(self, z: f32) -> f32 {
        match self {
            Self::Relu => z.max(0.0),
            Self::Tanh => z.tanh(),
            Self::Sigmoid => sigmoid(z),
            Self::Linear => z,
        }
    }

    /// Derivative expressed through the activation's output `a`.
    #[must_use]
    pub fn derivative_from_output(self, a: f32) -> f32 {
        match self {
            Self::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Tanh => 1.0 - a * a,
            Self::Sigmoid => a * (1.0 - a),
            Self::Linear => 1.0,
        }
    }
}

#[must_use]
pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Training objective, paired with the output activation it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Mean squared error over a linear output.
    Mse,
    /// Binary cross-entropy over a sigmoid output.
    BinaryCrossEntropy,
}

impl Loss {
    #[must_use]
    pub fn output_activation(self) -> Activation {
        match self {
            Self::Mse => Activation::Linear,
            Self::BinaryCrossEntropy => Activation::Sigmoid,
        }
    }
}

/// Hyperparameters of the learned methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    pub batch_size: usize,
    pub learning_rate: f32,
    pub epochs: usize,
    pub hidden_units: usize,
    pub hidden_layers: usize,
    pub activation: Activation,
    pub loss: Loss,
}

impl LearningParams {
    /// Defaults of the harness for the given output mode.
    ///
    /// ```
    /// use spatrel_model::{LearningParams, Loss, ModelKind};
    ///
    /// let params = LearningParams::for_kind(ModelKind::Grid);
    /// assert_eq!(params.batch_size, 64);
    /// assert_eq!(params.loss, Loss::BinaryCrossEntropy);
    /// ```
    #[must_use]
    pub fn for_kind(kind: ModelKind) -> Self {
        Self {
            batch_size: 64,
            learning_rate: 1e-4,
            epochs: 10,
            hidden_units: 100,
            hidden_layers: 2,
            activation: Activation::Relu,
            loss: match kind {
                ModelKind::Regression => Loss::Mse,
                ModelKind::Grid => Loss::BinaryCrossEntropy,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivatives_match_finite_differences() {
        let h = 1e-3;
        for activation in [Activation::Tanh, Activation::Sigmoid, Activation::Linear] {
            for z in [-1.5_f32, -0.2, 0.3, 2.0] {
                let numeric = (activation.apply(z + h) - activation.apply(z - h)) / (2.0 * h);
                let analytic = activation.derivative_from_output(activation.apply(z));
                assert!(
                    (numeric - analytic).abs() < 1e-2,
                    "{activation:?} at {z}: {numeric} vs {analytic}"
                );
            }
        }
    }

    #[test]
    fn test_relu() {
        assert_eq!(Activation::Relu.apply(-1.0), 0.0);
        assert_eq!(Activation::Relu.derivative_from_output(0.0), 0.0);
        assert_eq!(Activation::Relu.derivative_from_output(0.5), 1.0);
    }
}
