use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::{GeoPoint, IssueReport, ReportStatus};
use crate::shared::constants::REPORT_DESCRIPTION;

/// A stored report as shown to dashboards and API clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportItemDto {
    pub id: i64,
    pub issue_id: Uuid,
    /// "Issue reported by {username}"
    pub title: String,
    pub description: String,
    pub reporter: String,
    /// Falls back to `{lat: 0, lng: 0}` when the stored value is unreadable
    pub location: GeoPoint,
    pub status: ReportStatus,
    pub is_resolved: bool,
    /// "Garbage" or "Potholes"; absent for "No Issue" submissions
    pub label: Option<String>,
    pub confidence_score: f64,
    /// Public path of the annotated image
    pub segmented_image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<IssueReport> for ReportItemDto {
    fn from(report: IssueReport) -> Self {
        let location = report.geo_point();
        let status = report.status();

        Self {
            id: report.id,
            issue_id: report.issue_id,
            title: format!("Issue reported by {}", report.username),
            description: REPORT_DESCRIPTION.to_string(),
            reporter: report.username,
            location,
            status,
            is_resolved: report.is_resolved,
            label: report.label,
            confidence_score: report.confidence_score,
            segmented_image: report.segmented_image,
            timestamp: report.created_at,
        }
    }
}

/// Submit report request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SubmitReportDto {
    /// Photo of the suspected issue (JPEG, PNG or WebP)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
    /// Name of the reporting citizen
    #[schema(example = "alice")]
    pub username: String,
    /// JSON object with `lat` and `lng`
    #[schema(example = r#"{"lat": 12.97, "lng": 77.59}"#)]
    pub location: Option<String>,
    /// Latitude, used when `location` is not given
    pub lat: Option<f64>,
    /// Longitude, used when `location` is not given
    pub lng: Option<f64>,
}

/// Text fields of a submission, collected from the multipart form
#[derive(Debug, Clone, Validate)]
pub struct SubmissionFieldsDto {
    #[validate(length(min = 1, max = 100, message = "username must be 1-100 characters"))]
    pub username: String,
    #[validate(nested)]
    pub location: Option<GeoPoint>,
}

/// Result of a submission: the stored report plus the model verdict
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponseDto {
    pub report: ReportItemDto,
    /// "Garbage", "Potholes" or "No Issue"
    pub label: String,
    /// Confidence of `label`
    pub confidence: f32,
    /// Probability that the photo shows any issue at all
    pub issue_probability: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(location: Option<&str>) -> IssueReport {
        IssueReport {
            id: 7,
            issue_id: Uuid::now_v7(),
            username: "alice".to_string(),
            location: location.map(str::to_string),
            confidence_score: 0.82,
            segmented_image: Some("/static/segmented/a.png".to_string()),
            is_resolved: false,
            label: Some("Potholes".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_from_report() {
        let item = ReportItemDto::from(report(Some(r#"{"lat": 12.5, "lng": 77.25}"#)));

        assert_eq!(item.id, 7);
        assert_eq!(item.title, "Issue reported by alice");
        assert_eq!(item.description, "AI detected issue");
        assert_eq!(item.reporter, "alice");
        assert_eq!(item.location, GeoPoint::new(12.5, 77.25));
        assert_eq!(item.status, ReportStatus::Unresolved);
        assert!(!item.is_resolved);
        assert_eq!(item.label.as_deref(), Some("Potholes"));
    }

    #[test]
    fn test_submission_fields_validation() {
        let ok = SubmissionFieldsDto {
            username: "alice".to_string(),
            location: Some(GeoPoint::new(1.0, 2.0)),
        };
        assert!(ok.validate().is_ok());

        let empty = SubmissionFieldsDto {
            username: String::new(),
            location: None,
        };
        assert!(empty.validate().is_err());

        let off_map = SubmissionFieldsDto {
            username: "bob".to_string(),
            location: Some(GeoPoint::new(120.0, 0.0)),
        };
        assert!(off_map.validate().is_err());
    }

    #[test]
    fn test_item_serializes_expected_keys() {
        let value = serde_json::to_value(ReportItemDto::from(report(None))).unwrap();

        assert_eq!(value["status"], "unresolved");
        assert_eq!(value["location"]["lat"], 0.0);
        assert_eq!(value["location"]["lng"], 0.0);
        assert!(value["timestamp"].is_string());
        assert!(value["issue_id"].is_string());
    }
}
