use std::sync::Arc;

use crate::modules::inference::preprocess::decode;
use crate::modules::inference::{InferenceError, InferenceOutcome, IssuePipeline};

/// Async front for the pipeline. Decoding and model execution are CPU-bound
/// and run on the blocking thread pool.
#[derive(Clone)]
pub struct InferenceService {
    pipeline: Arc<IssuePipeline>,
}

impl InferenceService {
    pub fn new(pipeline: Arc<IssuePipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn analyze(&self, image_bytes: Vec<u8>) -> Result<InferenceOutcome, InferenceError> {
        let pipeline = Arc::clone(&self.pipeline);

        tokio::task::spawn_blocking(move || {
            let image = decode(&image_bytes)?;
            pipeline.analyze(&image)
        })
        .await
        .map_err(|e| InferenceError::Runtime(format!("spawn_blocking join error: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{png_bytes, stub_pipeline};

    #[tokio::test]
    async fn test_analyze_decodes_and_runs_pipeline() {
        let service = InferenceService::new(Arc::new(stub_pipeline(0.9, vec![0.2, 0.8])));
        let outcome = service.analyze(png_bytes()).await.unwrap();
        assert_eq!(outcome.label_text(), "No Issue");
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_images() {
        let service = InferenceService::new(Arc::new(stub_pipeline(0.1, vec![0.2, 0.8])));
        let err = service.analyze(b"plain text".to_vec()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }
}
