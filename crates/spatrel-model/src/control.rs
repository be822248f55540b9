use spatrel_data::{BoundingBox, EmbeddingTable, GridArray, GridView};

use crate::{Method, Model, ModelError, ModelInputs, ModelKind, Predictions};

/// Baseline that ignores its inputs and predicts training statistics.
///
/// In regression mode every row gets the component-wise mean of the training
/// boxes passed to [`Model::predict`]; in grid mode every row gets the mean
/// training map recorded by [`Model::train`]. The baseline has no state worth
/// persisting.
#[derive(Debug, Clone, Default)]
pub struct ControlModel {
    kind: ModelKind,
    trained: bool,
    mean_grid: Option<(usize, Vec<f32>)>,
}

impl ControlModel {
    #[must_use]
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            trained: false,
            mean_grid: None,
        }
    }
}

impl Model for ControlModel {
    fn method(&self) -> Method {
        Method::Control
    }

    fn train(
        &mut self,
        inputs: ModelInputs<'_>,
        targets: &[BoundingBox],
        grid_targets: Option<&GridView<'_>>,
        _embeddings: &EmbeddingTable,
    ) -> Result<(), ModelError> {
        inputs.check()?;
        if targets.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if self.kind == ModelKind::Grid {
            let grids = grid_targets.ok_or(ModelError::MissingGridTargets)?;
            let mut mean = vec![0.0; grids.side() * grids.side()];
            for map in grids.iter() {
                for (m, v) in mean.iter_mut().zip(map) {
                    *m += v;
                }
            }
            #[expect(clippy::cast_precision_loss)]
            let n = grids.len().max(1) as f32;
            mean.iter_mut().for_each(|m| *m /= n);
            self.mean_grid = Some((grids.side(), mean));
        }
        self.trained = true;
        Ok(())
    }

    fn predict(
        &self,
        inputs: ModelInputs<'_>,
        train_targets: &[BoundingBox],
    ) -> Result<Predictions, ModelError> {
        if !self.trained {
            return Err(ModelError::NotTrained);
        }
        inputs.check()?;
        match &self.mean_grid {
            Some((side, mean)) => {
                let mut grids = GridArray::zeros(*side, inputs.len());
                for i in 0..inputs.len() {
                    grids.row_mut(i).copy_from_slice(mean);
                }
                Ok(Predictions::Grids(grids))
            }
            None => {
                let mean = mean_box(train_targets).ok_or(ModelError::EmptyTrainingSet)?;
                Ok(Predictions::Boxes(vec![mean; inputs.len()]))
            }
        }
    }
}

fn mean_box(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    if boxes.is_empty() {
        return None;
    }
    let mut sum = [0.0_f64; BoundingBox::COMPONENTS];
    for b in boxes {
        for (s, v) in sum.iter_mut().zip(b.to_array()) {
            *s += f64::from(v);
        }
    }
    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let mean = sum.map(|s| (s / boxes.len() as f64) as f32);
    Some(BoundingBox::from_array(mean))
}

#[cfg(test)]
mod tests {
    use spatrel_data::WordTriple;

    use super::*;

    fn table() -> EmbeddingTable {
        EmbeddingTable::new(1, vec!["a".into()], vec![0.0]).unwrap()
    }

    const FEATURES: [WordTriple; 2] = [
        WordTriple {
            subject: 0,
            relation: 0,
            object: 0,
        };
        2
    ];
    const EXTRA: [[f32; 4]; 2] = [[0.0; 4]; 2];

    fn inputs() -> ModelInputs<'static> {
        ModelInputs {
            features: &FEATURES,
            extra: &EXTRA,
        }
    }

    #[test]
    fn test_regression_predicts_training_mean() {
        let targets = [
            BoundingBox::new(0.2, 0.4, 0.1, 0.1),
            BoundingBox::new(0.4, 0.8, 0.3, 0.1),
        ];
        let mut model = ControlModel::new(ModelKind::Regression);
        model.train(inputs(), &targets, None, &table()).unwrap();
        let Predictions::Boxes(boxes) = model.predict(inputs(), &targets).unwrap() else {
            panic!("expected boxes");
        };
        assert_eq!(boxes.len(), 2);
        for b in boxes {
            assert!((b.ctr_x - 0.3).abs() < 1e-6);
            assert!((b.ctr_y - 0.6).abs() < 1e-6);
            assert!((b.sd_x - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_grid_predicts_mean_map() {
        let grids = GridArray::from_flat(1, vec![1.0, 0.0]).unwrap();
        let view = grids.full_view();
        let targets = [BoundingBox::default(); 2];
        let mut model = ControlModel::new(ModelKind::Grid);
        model.train(inputs(), &targets, Some(&view), &table()).unwrap();
        let Predictions::Grids(predicted) = model.predict(inputs(), &targets).unwrap() else {
            panic!("expected grids");
        };
        assert_eq!(predicted.as_flat(), &[0.5, 0.5]);
    }

    #[test]
    fn test_has_no_state() {
        let targets = [BoundingBox::default(); 2];
        let mut model = ControlModel::new(ModelKind::Regression);
        assert!(matches!(
            model.predict(inputs(), &targets),
            Err(ModelError::NotTrained)
        ));
        model.train(inputs(), &targets, None, &table()).unwrap();
        assert!(model.export_state().is_none());
    }
}
