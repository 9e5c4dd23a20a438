use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info};

use crate::core::config::InferenceConfig;
use crate::modules::inference::annotate::annotate;
use crate::modules::inference::preprocess::classifier_input;
use crate::modules::inference::{
    ImageClassifier, InferenceError, InferenceOutcome, IssueLabel, OnnxClassifier,
    OnnxSegmenter, Segmenter, WeightedEnsemble,
};

/// Issue detection → classification → segmentation, with models held in memory
pub struct IssuePipeline {
    detector: WeightedEnsemble,
    classifier: WeightedEnsemble,
    garbage_segmenter: Arc<dyn Segmenter>,
    pothole_segmenter: Arc<dyn Segmenter>,
    issue_threshold: f32,
}

impl IssuePipeline {
    pub fn new(
        detector: WeightedEnsemble,
        classifier: WeightedEnsemble,
        garbage_segmenter: Arc<dyn Segmenter>,
        pothole_segmenter: Arc<dyn Segmenter>,
        issue_threshold: f32,
    ) -> Self {
        Self {
            detector,
            classifier,
            garbage_segmenter,
            pothole_segmenter,
            issue_threshold,
        }
    }

    /// Load every model named by `config`. Any missing file aborts loading.
    pub fn load(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let detector = load_ensemble(config.issue_members())?;
        info!("Issue detector loaded ({} model(s))", detector.len());

        let classifier = load_ensemble(config.class_members())?;
        info!("Issue classifier loaded ({} model(s))", classifier.len());

        let garbage_segmenter = Arc::new(OnnxSegmenter::load(
            &config.model_path(&config.garbage_segmentation_model),
            config.segment_score_threshold,
        )?);
        let pothole_segmenter = Arc::new(OnnxSegmenter::load(
            &config.model_path(&config.pothole_segmentation_model),
            config.segment_score_threshold,
        )?);

        Ok(Self::new(
            detector,
            classifier,
            garbage_segmenter,
            pothole_segmenter,
            config.issue_threshold,
        ))
    }

    /// Run the full pipeline on one decoded image
    pub fn analyze(&self, image: &DynamicImage) -> Result<InferenceOutcome, InferenceError> {
        let input = classifier_input(image);

        // Detectors emit P(NoIssue): training labels were Issues=0, NoIssue=1
        let no_issue = match self.detector.predict(&input)?.as_slice() {
            [p] => *p,
            other => {
                return Err(InferenceError::InvalidOutput(format!(
                    "issue detector returned {} values, expected 1",
                    other.len()
                )))
            }
        };
        let issue_probability = (1.0 - no_issue).clamp(0.0, 1.0);
        debug!("Issue probability: {:.4}", issue_probability);

        if issue_probability < self.issue_threshold {
            return Ok(InferenceOutcome::no_issue(issue_probability));
        }

        let probabilities = self.classifier.predict(&input)?;
        if probabilities.len() != IssueLabel::ALL.len() {
            return Err(InferenceError::InvalidOutput(format!(
                "classifier returned {} probabilities, expected {}",
                probabilities.len(),
                IssueLabel::ALL.len()
            )));
        }
        debug!(
            "Class probabilities: Garbage {:.4}, Potholes {:.4}",
            probabilities[0], probabilities[1]
        );

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        let label = IssueLabel::from_index(index).ok_or_else(|| {
            InferenceError::InvalidOutput(format!("no label for class index {}", index))
        })?;

        let rgb = image.to_rgb8();
        let detections = self.segmenter_for(label).segment(&rgb)?;
        debug!("{} segmentation produced {} instance(s)", label, detections.len());

        Ok(InferenceOutcome {
            label: Some(label),
            confidence,
            issue_probability,
            annotated: Some(annotate(rgb, &detections, label)),
        })
    }

    fn segmenter_for(&self, label: IssueLabel) -> &dyn Segmenter {
        match label {
            IssueLabel::Garbage => self.garbage_segmenter.as_ref(),
            IssueLabel::Potholes => self.pothole_segmenter.as_ref(),
        }
    }
}

fn load_ensemble(
    members: Vec<(std::path::PathBuf, f32)>,
) -> Result<WeightedEnsemble, InferenceError> {
    let loaded = members
        .into_iter()
        .map(|(path, weight)| {
            OnnxClassifier::load(&path)
                .map(|model| (Arc::new(model) as Arc<dyn ImageClassifier>, weight))
        })
        .collect::<Result<Vec<_>, _>>()?;
    WeightedEnsemble::new(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{sample_image, FixedClassifier, RecordingSegmenter};

    fn pipeline(
        no_issue: f32,
        class_a: Vec<f32>,
        class_b: Vec<f32>,
    ) -> (IssuePipeline, Arc<RecordingSegmenter>, Arc<RecordingSegmenter>) {
        let garbage = Arc::new(RecordingSegmenter::default());
        let potholes = Arc::new(RecordingSegmenter::default());
        let pipeline = IssuePipeline::new(
            WeightedEnsemble::single(FixedClassifier::arc("detector", vec![no_issue])),
            WeightedEnsemble::new(vec![
                (FixedClassifier::arc("a", class_a), 0.6),
                (FixedClassifier::arc("b", class_b), 0.4),
            ])
            .unwrap(),
            garbage.clone(),
            potholes.clone(),
            0.5,
        );
        (pipeline, garbage, potholes)
    }

    #[test]
    fn test_below_threshold_short_circuits() {
        let (pipeline, garbage, potholes) = pipeline(0.8, vec![0.9, 0.1], vec![0.9, 0.1]);

        let outcome = pipeline.analyze(&sample_image()).unwrap();

        assert_eq!(outcome.label, None);
        assert_eq!(outcome.label_text(), "No Issue");
        assert!((outcome.confidence - 0.8).abs() < 1e-6);
        assert!(outcome.annotated.is_none());
        assert_eq!(garbage.calls(), 0);
        assert_eq!(potholes.calls(), 0);
    }

    #[test]
    fn test_issue_is_classified_with_ensemble_and_segmented() {
        // ensemble: 0.6*[0.3,0.7] + 0.4*[0.6,0.4] = [0.42, 0.58]
        let (pipeline, garbage, potholes) = pipeline(0.1, vec![0.3, 0.7], vec![0.6, 0.4]);

        let outcome = pipeline.analyze(&sample_image()).unwrap();

        assert_eq!(outcome.label, Some(IssueLabel::Potholes));
        assert!((outcome.confidence - 0.58).abs() < 1e-6);
        assert!((outcome.issue_probability - 0.9).abs() < 1e-6);
        assert!(outcome.annotated.is_some());
        assert_eq!(garbage.calls(), 0);
        assert_eq!(potholes.calls(), 1);
    }

    #[test]
    fn test_garbage_uses_garbage_segmenter() {
        let (pipeline, garbage, potholes) = pipeline(0.2, vec![0.9, 0.1], vec![0.7, 0.3]);

        let outcome = pipeline.analyze(&sample_image()).unwrap();

        assert_eq!(outcome.label, Some(IssueLabel::Garbage));
        assert_eq!(garbage.calls(), 1);
        assert_eq!(potholes.calls(), 0);
    }

    #[test]
    fn test_threshold_boundary_proceeds_to_classification() {
        // issue probability exactly 0.5 is not below the threshold
        let (pipeline, garbage, _) = pipeline(0.5, vec![0.9, 0.1], vec![0.9, 0.1]);

        let outcome = pipeline.analyze(&sample_image()).unwrap();

        assert_eq!(outcome.label, Some(IssueLabel::Garbage));
        assert!((outcome.issue_probability - 0.5).abs() < 1e-6);
        assert_eq!(garbage.calls(), 1);
    }

    #[test]
    fn test_two_way_detector_output_is_rejected() {
        let pipeline = IssuePipeline::new(
            WeightedEnsemble::single(FixedClassifier::arc("detector", vec![0.3, 0.7])),
            WeightedEnsemble::single(FixedClassifier::arc("classifier", vec![0.5, 0.5])),
            Arc::new(RecordingSegmenter::default()),
            Arc::new(RecordingSegmenter::default()),
            0.5,
        );

        let err = pipeline.analyze(&sample_image()).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidOutput(_)));
    }

    #[test]
    fn test_wrong_class_count_is_an_error() {
        let (pipeline, _, _) = pipeline(0.0, vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]);
        let err = pipeline.analyze(&sample_image()).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidOutput(_)));
    }

    #[test]
    fn test_load_fails_for_missing_models() {
        let config = InferenceConfig {
            models_dir: std::path::PathBuf::from("/nonexistent-models"),
            issue_models: vec!["issue.onnx".into()],
            class_models: vec!["a.onnx".into()],
            garbage_segmentation_model: "g.onnx".into(),
            pothole_segmentation_model: "p.onnx".into(),
            issue_weights: vec![1.0],
            class_weights: vec![1.0],
            issue_threshold: 0.5,
            segment_score_threshold: 0.25,
        };
        assert!(matches!(
            IssuePipeline::load(&config),
            Err(InferenceError::ModelNotFound { .. })
        ));
    }
}
