//! A small fully connected network trained with mini-batch Adam.
//!
//! # Architecture
//!
//! ```text
//! input ─▶ [Dense → hidden activation] × hidden_layers ─▶ Dense → output activation
//! ```
//!
//! The loss/output pairs are chosen so that the gradient of the loss with
//! respect to the output layer's pre-activation is `output - target` in both
//! cases (linear + half squared error, sigmoid + binary cross-entropy), which
//! keeps backpropagation uniform.
//!
//! # Optimizer
//!
//! Adam with `β1 = 0.9`, `β2 = 0.999`, `ε = 1e-7` and the bias-corrected
//! step size `lr · √(1 − β2ᵗ) / (1 − β1ᵗ)`.
//!
//! Weights use He-normal initialisation from the caller's RNG, so a seeded RNG
//! yields a reproducible network.

use rand::{Rng, seq::SliceRandom as _};
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use crate::params::{Activation, LearningParams};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

/// One fully connected layer; `weights` is `outputs × inputs`, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Dense {
    fn random<R>(inputs: usize, outputs: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        #[expect(clippy::cast_precision_loss)]
        let std_dev = (2.0 / inputs.max(1) as f32).sqrt();
        let weights = match Normal::new(0.0, std_dev) {
            Ok(normal) => (0..inputs * outputs).map(|_| normal.sample(rng)).collect(),
            Err(_) => vec![0.0; inputs * outputs],
        };
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
        }
    }

    fn forward(&self, x: &[f32], activation: Activation) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| {
                let z = row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b;
                activation.apply(z)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
    hidden_activation: Activation,
    output_activation: Activation,
}

impl Mlp {
    /// Creates a randomly initialised network.
    pub fn new<R>(
        inputs: usize,
        outputs: usize,
        params: &LearningParams,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut layers = Vec::with_capacity(params.hidden_layers + 1);
        let mut width = inputs;
        for _ in 0..params.hidden_layers {
            layers.push(Dense::random(width, params.hidden_units, rng));
            width = params.hidden_units;
        }
        layers.push(Dense::random(width, outputs, rng));
        Self {
            layers,
            hidden_activation: params.activation,
            output_activation: params.loss.output_activation(),
        }
    }

    #[must_use]
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    #[must_use]
    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.inputs)
    }

    #[must_use]
    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.outputs)
    }

    fn activation_of(&self, layer: usize) -> Activation {
        if layer + 1 == self.layers.len() {
            self.output_activation
        } else {
            self.hidden_activation
        }
    }

    #[must_use]
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .enumerate()
            .fold(x.to_vec(), |a, (i, layer)| {
                layer.forward(&a, self.activation_of(i))
            })
    }

    /// Activations of every layer, starting with the input itself.
    fn trace(&self, x: &[f32]) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_vec());
        for (i, layer) in self.layers.iter().enumerate() {
            let next = layer.forward(&activations[i], self.activation_of(i));
            activations.push(next);
        }
        activations
    }

    /// Trains on `(inputs[i], targets[i])` pairs for `params.epochs` epochs.
    ///
    /// Rows are reshuffled every epoch with `rng`. Returns the mean loss of
    /// the last epoch.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` and `targets` differ in length.
    pub fn fit<R>(
        &mut self,
        inputs: &[Vec<f32>],
        targets: &[Vec<f32>],
        params: &LearningParams,
        rng: &mut R,
    ) -> f32
    where
        R: Rng + ?Sized,
    {
        assert_eq!(inputs.len(), targets.len());
        let mut adam = Adam::new(params.learning_rate, &self.layers);
        let mut order = (0..inputs.len()).collect::<Vec<_>>();
        let mut last_loss = f32::NAN;

        for _ in 0..params.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;
            for batch in order.chunks(params.batch_size.max(1)) {
                epoch_loss += self.train_batch(batch, inputs, targets, params, &mut adam);
            }
            last_loss = mean_over(epoch_loss, inputs.len());
        }
        last_loss
    }

    fn train_batch(
        &mut self,
        batch: &[usize],
        inputs: &[Vec<f32>],
        targets: &[Vec<f32>],
        params: &LearningParams,
        adam: &mut Adam,
    ) -> f32 {
        let mut grad_w = self
            .layers
            .iter()
            .map(|l| vec![0.0; l.weights.len()])
            .collect::<Vec<_>>();
        let mut grad_b = self
            .layers
            .iter()
            .map(|l| vec![0.0; l.bias.len()])
            .collect::<Vec<_>>();
        #[expect(clippy::cast_precision_loss)]
        let scale = 1.0 / batch.len() as f32;
        let mut loss = 0.0;

        for &row in batch {
            let activations = self.trace(&inputs[row]);
            let output = &activations[self.layers.len()];
            let target = &targets[row];
            loss += sample_loss(params, output, target);

            let mut delta = output
                .iter()
                .zip(target)
                .map(|(o, t)| (o - t) * scale)
                .collect::<Vec<_>>();

            for l in (0..self.layers.len()).rev() {
                let layer = &self.layers[l];
                let input = &activations[l];
                for (i, d) in delta.iter().enumerate() {
                    let grads = &mut grad_w[l][i * layer.inputs..(i + 1) * layer.inputs];
                    for (g, a) in grads.iter_mut().zip(input) {
                        *g += d * a;
                    }
                    grad_b[l][i] += d;
                }
                if l > 0 {
                    let activation = self.activation_of(l - 1);
                    delta = (0..layer.inputs)
                        .map(|j| {
                            let back = delta
                                .iter()
                                .enumerate()
                                .map(|(i, d)| layer.weights[i * layer.inputs + j] * d)
                                .sum::<f32>();
                            back * activation.derivative_from_output(input[j])
                        })
                        .collect();
                }
            }
        }

        adam.step();
        for (l, layer) in self.layers.iter_mut().enumerate() {
            adam.update(2 * l, &mut layer.weights, &grad_w[l]);
            adam.update(2 * l + 1, &mut layer.bias, &grad_b[l]);
        }
        loss
    }
}

#[expect(clippy::cast_precision_loss)]
fn mean_over(total: f32, n: usize) -> f32 {
    total / n.max(1) as f32
}

fn sample_loss(params: &LearningParams, output: &[f32], target: &[f32]) -> f32 {
    #[expect(clippy::cast_precision_loss)]
    let n = output.len().max(1) as f32;
    let total = match params.loss {
        crate::Loss::Mse => output
            .iter()
            .zip(target)
            .map(|(o, t)| (o - t).powi(2))
            .sum::<f32>(),
        crate::Loss::BinaryCrossEntropy => output
            .iter()
            .zip(target)
            .map(|(o, t)| {
                let o = o.clamp(1e-7, 1.0 - 1e-7);
                -(t * o.ln() + (1.0 - t) * (1.0 - o).ln())
            })
            .sum::<f32>(),
    };
    total / n
}

/// Adam moments for every parameter tensor of a network.
///
/// Tensor slot `2·l` holds layer `l`'s weights and `2·l + 1` its bias.
#[derive(Debug)]
struct Adam {
    learning_rate: f32,
    t: i32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    fn new(learning_rate: f32, layers: &[Dense]) -> Self {
        let shapes = layers
            .iter()
            .flat_map(|l| [l.weights.len(), l.bias.len()])
            .collect::<Vec<_>>();
        Self {
            learning_rate,
            t: 0,
            m: shapes.iter().map(|&n| vec![0.0; n]).collect(),
            v: shapes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    fn step(&mut self) {
        self.t = self.t.saturating_add(1);
    }

    fn update(&mut self, slot: usize, param: &mut [f32], grad: &[f32]) {
        let lr_t = self.learning_rate * (1.0 - BETA2.powi(self.t)).sqrt() / (1.0 - BETA1.powi(self.t));
        let (m, v) = (&mut self.m[slot], &mut self.v[slot]);
        for (((p, g), m), v) in param.iter_mut().zip(grad).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::{Loss, ModelKind};

    fn params(loss: Loss) -> LearningParams {
        LearningParams {
            batch_size: 8,
            learning_rate: 1e-2,
            epochs: 200,
            hidden_units: 8,
            hidden_layers: 1,
            activation: Activation::Tanh,
            loss,
        }
    }

    #[test]
    fn test_shapes() {
        let mut rng = Pcg32::seed_from_u64(0);
        let net = Mlp::new(5, 3, &LearningParams::for_kind(ModelKind::Regression), &mut rng);
        assert_eq!(net.layers().len(), 3);
        assert_eq!(net.input_width(), 5);
        assert_eq!(net.output_width(), 3);
        assert_eq!(net.forward(&[0.0; 5]).len(), 3);
    }

    #[test]
    fn test_same_seed_same_network() {
        let p = LearningParams::for_kind(ModelKind::Grid);
        let a = Mlp::new(4, 2, &p, &mut Pcg32::seed_from_u64(3));
        let b = Mlp::new(4, 2, &p, &mut Pcg32::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fits_linear_function() {
        let mut rng = Pcg32::seed_from_u64(1);
        let inputs = (0..32)
            .map(|i| vec![f32::from(u8::try_from(i).unwrap()) / 32.0])
            .collect::<Vec<_>>();
        let targets = inputs
            .iter()
            .map(|x| vec![0.5 * x[0] + 0.1])
            .collect::<Vec<_>>();
        let p = params(Loss::Mse);
        let mut net = Mlp::new(1, 1, &p, &mut rng);
        let loss = net.fit(&inputs, &targets, &p, &mut rng);
        assert!(loss < 5e-3, "loss {loss}");
    }

    #[test]
    fn test_sigmoid_output_is_probability() {
        let mut rng = Pcg32::seed_from_u64(2);
        let inputs = vec![vec![0.0], vec![1.0]];
        let targets = vec![vec![0.0], vec![1.0]];
        let p = params(Loss::BinaryCrossEntropy);
        let mut net = Mlp::new(1, 1, &p, &mut rng);
        net.fit(&inputs, &targets, &p, &mut rng);
        let low = net.forward(&[0.0])[0];
        let high = net.forward(&[1.0])[0];
        assert!((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high));
        assert!(high > low);
    }
}
