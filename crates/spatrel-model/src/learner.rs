use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use spatrel_data::{BoundingBox, EmbeddingTable, GridArray, GridView};

use crate::{
    LearningParams, Method, Model, ModelError, ModelInputs, ModelKind, ModelState, Predictions,
    encoding::Encoder, network::Mlp,
};

/// A learned method: a word encoder feeding a multi-layer perceptron.
///
/// All randomness (weight initialisation, random word vectors, batch order)
/// comes from one generator seeded at construction, so training the same
/// model on the same rows twice yields the same predictions.
#[derive(Debug, Clone)]
pub struct NeuralModel {
    method: Method,
    kind: ModelKind,
    params: LearningParams,
    seed: u64,
    trained: Option<Trained>,
}

#[derive(Debug, Clone)]
struct Trained {
    encoder: Encoder,
    network: Mlp,
    grid_side: Option<usize>,
}

impl NeuralModel {
    #[must_use]
    pub fn new(method: Method, kind: ModelKind, params: LearningParams, seed: u64) -> Self {
        Self {
            method,
            kind,
            params,
            seed,
            trained: None,
        }
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }
}

impl Model for NeuralModel {
    fn method(&self) -> Method {
        self.method
    }

    fn train(
        &mut self,
        inputs: ModelInputs<'_>,
        targets: &[BoundingBox],
        grid_targets: Option<&GridView<'_>>,
        embeddings: &EmbeddingTable,
    ) -> Result<(), ModelError> {
        inputs.check()?;
        if inputs.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        check_len("targets", inputs.len(), targets.len())?;

        let target_rows: Vec<Vec<f32>> = match self.kind {
            ModelKind::Regression => targets.iter().map(|t| t.to_array().to_vec()).collect(),
            ModelKind::Grid => {
                let grids = grid_targets.ok_or(ModelError::MissingGridTargets)?;
                check_len("grid targets", inputs.len(), grids.len())?;
                grids.iter().map(<[f32]>::to_vec).collect::<Vec<_>>()
            }
        };
        let grid_side = match self.kind {
            ModelKind::Regression => None,
            ModelKind::Grid => grid_targets.map(GridView::side),
        };

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let encoder = Encoder::fit(self.method, inputs.features, embeddings, &mut rng)?
            .ok_or(ModelError::EmptyTrainingSet)?;
        let input_rows = encode_all(&encoder, inputs);
        let outputs = target_rows.first().map_or(0, Vec::len);

        let mut network = Mlp::new(encoder.input_width(), outputs, &self.params, &mut rng);
        network.fit(&input_rows, &target_rows, &self.params, &mut rng);

        self.trained = Some(Trained {
            encoder,
            network,
            grid_side,
        });
        Ok(())
    }

    fn predict(
        &self,
        inputs: ModelInputs<'_>,
        _train_targets: &[BoundingBox],
    ) -> Result<Predictions, ModelError> {
        let trained = self.trained.as_ref().ok_or(ModelError::NotTrained)?;
        inputs.check()?;
        let outputs = encode_all(&trained.encoder, inputs)
            .iter()
            .map(|row| trained.network.forward(row))
            .collect::<Vec<_>>();

        match trained.grid_side {
            None => Ok(Predictions::Boxes(
                outputs
                    .into_iter()
                    .map(|out| {
                        let mut components = [0.0; BoundingBox::COMPONENTS];
                        for (c, v) in components.iter_mut().zip(out) {
                            *c = v;
                        }
                        BoundingBox::from_array(components)
                    })
                    .collect(),
            )),
            Some(side) => Ok(Predictions::Grids(GridArray::from_flat(
                side,
                outputs.into_iter().flatten().collect(),
            )?)),
        }
    }

    fn export_state(&self) -> Option<ModelState> {
        let trained = self.trained.as_ref()?;
        Some(ModelState {
            method: self.method,
            kind: self.kind,
            grid_side: trained.grid_side,
            params: self.params,
            encoder: trained.encoder.clone(),
            network: trained.network.clone(),
        })
    }
}

fn encode_all(encoder: &Encoder, inputs: ModelInputs<'_>) -> Vec<Vec<f32>> {
    inputs
        .features
        .iter()
        .zip(inputs.extra)
        .map(|(&words, &extra)| encoder.encode(words, extra))
        .collect()
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use spatrel_data::{
        WordTriple,
        synthetic::{self, SyntheticParams},
    };

    use super::*;

    struct Rows {
        features: Vec<WordTriple>,
        extra: Vec<[f32; 4]>,
        targets: Vec<BoundingBox>,
        embeddings: EmbeddingTable,
    }

    impl Rows {
        fn new(rows: usize) -> Self {
            let (dataset, embeddings) = synthetic::generate(&SyntheticParams {
                rows,
                ..SyntheticParams::default()
            });
            Self {
                features: dataset
                    .triplets()
                    .map(|t| WordTriple::resolve(t, &embeddings).unwrap())
                    .collect(),
                extra: dataset
                    .records
                    .iter()
                    .map(|r| r.subject_box.to_array())
                    .collect(),
                targets: dataset.records.iter().map(|r| r.object_box).collect(),
                embeddings,
            }
        }

        fn inputs(&self) -> ModelInputs<'_> {
            ModelInputs {
                features: &self.features,
                extra: &self.extra,
            }
        }
    }

    fn small_params(kind: ModelKind) -> LearningParams {
        LearningParams {
            epochs: 2,
            hidden_units: 8,
            ..LearningParams::for_kind(kind)
        }
    }

    #[test]
    fn test_predict_before_train_fails() {
        let rows = Rows::new(5);
        let model = NeuralModel::new(
            Method::OneHot,
            ModelKind::Regression,
            small_params(ModelKind::Regression),
            0,
        );
        assert!(matches!(
            model.predict(rows.inputs(), &rows.targets),
            Err(ModelError::NotTrained)
        ));
        assert!(model.export_state().is_none());
    }

    #[test]
    fn test_regression_predicts_one_box_per_row() {
        let rows = Rows::new(30);
        let mut model = NeuralModel::new(
            Method::Random,
            ModelKind::Regression,
            small_params(ModelKind::Regression),
            1,
        );
        model
            .train(rows.inputs(), &rows.targets, None, &rows.embeddings)
            .unwrap();
        let Predictions::Boxes(boxes) = model.predict(rows.inputs(), &rows.targets).unwrap() else {
            panic!("expected boxes");
        };
        assert_eq!(boxes.len(), 30);
    }

    #[test]
    fn test_grid_mode_requires_grid_targets() {
        let rows = Rows::new(10);
        let mut model = NeuralModel::new(
            Method::Embedding,
            ModelKind::Grid,
            small_params(ModelKind::Grid),
            0,
        );
        assert!(matches!(
            model.train(rows.inputs(), &rows.targets, None, &rows.embeddings),
            Err(ModelError::MissingGridTargets)
        ));
    }

    #[test]
    fn test_grid_predictions_are_probabilities() {
        let rows = Rows::new(20);
        let grids = GridArray::rasterize(&rows.targets, 6);
        let view = grids.full_view();
        let mut model = NeuralModel::new(
            Method::Embedding,
            ModelKind::Grid,
            small_params(ModelKind::Grid),
            0,
        );
        model
            .train(rows.inputs(), &rows.targets, Some(&view), &rows.embeddings)
            .unwrap();
        let Predictions::Grids(predicted) = model.predict(rows.inputs(), &rows.targets).unwrap()
        else {
            panic!("expected grids");
        };
        assert_eq!(predicted.len(), 20);
        assert_eq!(predicted.side(), 6);
        assert!(predicted.as_flat().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(model.export_state().unwrap().grid_side, Some(6));
    }

    #[test]
    fn test_training_is_reproducible() {
        let rows = Rows::new(25);
        let train = || {
            let mut model = NeuralModel::new(
                Method::Random,
                ModelKind::Regression,
                small_params(ModelKind::Regression),
                9,
            );
            model
                .train(rows.inputs(), &rows.targets, None, &rows.embeddings)
                .unwrap();
            model.predict(rows.inputs(), &rows.targets).unwrap()
        };
        assert_eq!(train(), train());
    }

    #[test]
    fn test_target_length_mismatch() {
        let rows = Rows::new(5);
        let mut model = NeuralModel::new(
            Method::Embedding,
            ModelKind::Regression,
            small_params(ModelKind::Regression),
            0,
        );
        assert!(matches!(
            model.train(rows.inputs(), &rows.targets[..3], None, &rows.embeddings),
            Err(ModelError::LengthMismatch { what: "targets", .. })
        ));
    }
}
