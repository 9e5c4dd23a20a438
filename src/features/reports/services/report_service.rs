use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{ReportItemDto, SubmissionResponseDto};
use crate::features::reports::models::{CreateIssueReport, GeoPoint};
use crate::features::reports::services::ReportRepository;
use crate::modules::inference::InferenceService;
use crate::modules::storage::ImageStore;

/// Runs submitted photos through the pipeline and records the outcome
pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    inference: InferenceService,
    image_store: Arc<ImageStore>,
}

impl ReportService {
    pub fn new(
        repo: Arc<dyn ReportRepository>,
        inference: InferenceService,
        image_store: Arc<ImageStore>,
    ) -> Self {
        Self {
            repo,
            inference,
            image_store,
        }
    }

    /// Analyze `image` and store one report row for it.
    ///
    /// "No Issue" verdicts are stored too, without a label or annotated image.
    pub async fn submit(
        &self,
        username: String,
        location: Option<GeoPoint>,
        image: Vec<u8>,
    ) -> Result<SubmissionResponseDto> {
        debug!("Analyzing {} byte image from {}", image.len(), username);
        let location = location
            .map(|point| point.to_json())
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("Invalid location: {}", e)))?;

        let mut outcome = self.inference.analyze(image).await?;

        let segmented_image = match outcome.annotated.take() {
            Some(annotated) => Some(self.image_store.put_png(annotated).await?),
            None => None,
        };

        let data = CreateIssueReport {
            issue_id: Uuid::now_v7(),
            username,
            location,
            confidence_score: f64::from(outcome.confidence),
            segmented_image,
            label: outcome.label.map(|label| label.as_str().to_string()),
        };
        let report = match self.repo.create(&data).await {
            Ok(report) => report,
            Err(e) => {
                // No row will reference the image
                if let Some(path) = &data.segmented_image {
                    self.image_store.remove(path).await;
                }
                return Err(e);
            }
        };

        info!(
            "Report {} classified as {} ({:.3})",
            report.id,
            outcome.label_text(),
            outcome.confidence
        );

        Ok(SubmissionResponseDto {
            report: ReportItemDto::from(report),
            label: outcome.label_text().to_string(),
            confidence: outcome.confidence,
            issue_probability: outcome.issue_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StorageConfig;
    use crate::shared::test_helpers::{
        png_bytes, stub_pipeline, FailingReportRepository, InMemoryReportRepository,
    };

    fn service_with_repo(
        repo: Arc<dyn ReportRepository>,
        no_issue: f32,
        class_probs: Vec<f32>,
    ) -> (ReportService, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("report-service-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = ImageStore::new(&StorageConfig {
            image_dir: dir.clone(),
            public_prefix: "/static/segmented".to_string(),
        });
        let service = ReportService::new(
            repo,
            InferenceService::new(Arc::new(stub_pipeline(no_issue, class_probs))),
            Arc::new(store),
        );
        (service, dir)
    }

    fn service(
        no_issue: f32,
        class_probs: Vec<f32>,
    ) -> (ReportService, Arc<InMemoryReportRepository>, std::path::PathBuf) {
        let repo = Arc::new(InMemoryReportRepository::default());
        let (service, dir) = service_with_repo(repo.clone(), no_issue, class_probs);
        (service, repo, dir)
    }

    #[tokio::test]
    async fn test_issue_submission_stores_label_and_image() {
        let (service, repo, dir) = service(0.1, vec![0.2, 0.8]);

        let response = service
            .submit(
                "alice".to_string(),
                Some(GeoPoint::new(12.5, 77.5)),
                png_bytes(),
            )
            .await
            .unwrap();

        assert_eq!(response.label, "Potholes");
        assert!((response.confidence - 0.8).abs() < 1e-6);
        assert_eq!(response.report.label.as_deref(), Some("Potholes"));
        assert_eq!(response.report.location, GeoPoint::new(12.5, 77.5));

        let url = response.report.segmented_image.unwrap();
        assert!(url.starts_with("/static/segmented/"));
        let file_name = url.rsplit('/').next().unwrap();
        assert!(dir.join(file_name).exists());

        assert_eq!(repo.list(None).await.unwrap().len(), 1);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_no_issue_submission_is_still_recorded() {
        let (service, repo, dir) = service(0.9, vec![0.5, 0.5]);

        let response = service
            .submit("bob".to_string(), None, png_bytes())
            .await
            .unwrap();

        assert_eq!(response.label, "No Issue");
        assert!(response.report.label.is_none());
        assert!(response.report.segmented_image.is_none());
        assert!((response.report.confidence_score - 0.9).abs() < 1e-6);
        assert_eq!(response.report.location, GeoPoint::default());

        let stored = repo.list(None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].location.is_none());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_undecodable_image_stores_nothing() {
        let (service, repo, dir) = service(0.1, vec![0.2, 0.8]);

        let err = service
            .submit("carol".to_string(), None, b"not an image".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Inference(_)));
        assert!(repo.list(None).await.unwrap().is_empty());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_image() {
        let (service, dir) =
            service_with_repo(Arc::new(FailingReportRepository), 0.1, vec![0.7, 0.3]);

        let err = service
            .submit("dave".to_string(), None, png_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(dir).ok();
    }
}
