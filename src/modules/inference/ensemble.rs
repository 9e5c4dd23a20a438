use std::sync::Arc;

use tracing::debug;

use crate::modules::inference::{ImageClassifier, ImageTensor, InferenceError};

/// Weighted sum of member outputs, `Σ_k w_k · out_k[i]`.
///
/// Weights are normalized to sum to 1 so the result stays a probability
/// vector whenever the members emit probabilities.
pub fn weighted_sum(outputs: &[Vec<f32>], weights: &[f32]) -> Result<Vec<f32>, InferenceError> {
    if outputs.is_empty() {
        return Err(InferenceError::Ensemble("no member outputs".to_string()));
    }
    if outputs.len() != weights.len() {
        return Err(InferenceError::Ensemble(format!(
            "{} outputs but {} weights",
            outputs.len(),
            weights.len()
        )));
    }

    let total: f32 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 || weights.iter().any(|w| *w < 0.0) {
        return Err(InferenceError::Ensemble(format!(
            "invalid weights {:?}",
            weights
        )));
    }

    let len = outputs[0].len();
    if let Some(bad) = outputs.iter().find(|o| o.len() != len) {
        return Err(InferenceError::Ensemble(format!(
            "output length mismatch: {} vs {}",
            len,
            bad.len()
        )));
    }

    let mut combined = vec![0.0f32; len];
    for (output, weight) in outputs.iter().zip(weights) {
        let w = weight / total;
        for (acc, value) in combined.iter_mut().zip(output) {
            *acc += w * value;
        }
    }
    Ok(combined)
}

/// Fixed-weight ensemble of classifiers sharing one input
pub struct WeightedEnsemble {
    members: Vec<(Arc<dyn ImageClassifier>, f32)>,
}

impl WeightedEnsemble {
    pub fn new(members: Vec<(Arc<dyn ImageClassifier>, f32)>) -> Result<Self, InferenceError> {
        if members.is_empty() {
            return Err(InferenceError::Ensemble(
                "ensemble needs at least one member".to_string(),
            ));
        }
        Ok(Self { members })
    }

    /// Single model, weight 1
    pub fn single(model: Arc<dyn ImageClassifier>) -> Self {
        Self {
            members: vec![(model, 1.0)],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let mut outputs = Vec::with_capacity(self.members.len());
        let mut weights = Vec::with_capacity(self.members.len());

        for (model, weight) in &self.members {
            let output = model.predict(input)?;
            debug!("{} -> {:?}", model.name(), output);
            outputs.push(output);
            weights.push(*weight);
        }

        weighted_sum(&outputs, &weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::FixedClassifier;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_weighted_sum_known_inputs() {
        let outputs = vec![vec![0.9, 0.1], vec![0.3, 0.7]];
        let combined = weighted_sum(&outputs, &[0.6, 0.4]).unwrap();
        // 0.6*0.9 + 0.4*0.3 = 0.66, 0.6*0.1 + 0.4*0.7 = 0.34
        assert_close(&combined, &[0.66, 0.34]);
    }

    #[test]
    fn test_weighted_sum_normalizes_weights() {
        let outputs = vec![vec![1.0], vec![0.0]];
        let combined = weighted_sum(&outputs, &[3.0, 1.0]).unwrap();
        assert_close(&combined, &[0.75]);
    }

    #[test]
    fn test_weighted_sum_single_member_is_identity() {
        let combined = weighted_sum(&[vec![0.2, 0.8]], &[0.5]).unwrap();
        assert_close(&combined, &[0.2, 0.8]);
    }

    #[test]
    fn test_weighted_sum_errors() {
        assert!(weighted_sum(&[], &[]).is_err());
        assert!(weighted_sum(&[vec![0.5]], &[0.5, 0.5]).is_err());
        assert!(weighted_sum(&[vec![0.5], vec![0.5, 0.5]], &[0.5, 0.5]).is_err());
        assert!(weighted_sum(&[vec![0.5]], &[0.0]).is_err());
        assert!(weighted_sum(&[vec![0.5], vec![0.5]], &[-1.0, 2.0]).is_err());
    }

    #[test]
    fn test_ensemble_predict_combines_members() {
        let ensemble = WeightedEnsemble::new(vec![
            (FixedClassifier::arc("a", vec![0.8, 0.2]), 0.5),
            (FixedClassifier::arc("b", vec![0.4, 0.6]), 0.5),
        ])
        .unwrap();
        assert_eq!(ensemble.len(), 2);

        let input = ImageTensor {
            shape: vec![1],
            data: vec![0.0],
        };
        assert_close(&ensemble.predict(&input).unwrap(), &[0.6, 0.4]);
    }

    #[test]
    fn test_empty_ensemble_is_rejected() {
        assert!(WeightedEnsemble::new(Vec::new()).is_err());
    }
}
