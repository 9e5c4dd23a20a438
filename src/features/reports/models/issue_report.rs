use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::reports::models::GeoPoint;

/// Resolution state as exposed over HTTP.
///
/// Persisted as the boolean `is_resolved`; this is its string spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Resolved,
    Unresolved,
}

impl ReportStatus {
    pub fn from_resolved(is_resolved: bool) -> Self {
        if is_resolved {
            ReportStatus::Resolved
        } else {
            ReportStatus::Unresolved
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ReportStatus::Resolved)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Database model for an issue report
#[derive(Debug, Clone, FromRow)]
pub struct IssueReport {
    pub id: i64,
    pub issue_id: Uuid,
    pub username: String,
    /// JSON text `{"lat": .., "lng": ..}`; older rows may hold anything
    pub location: Option<String>,
    pub confidence_score: f64,
    pub segmented_image: Option<String>,
    pub is_resolved: bool,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IssueReport {
    pub fn status(&self) -> ReportStatus {
        ReportStatus::from_resolved(self.is_resolved)
    }

    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint::parse_or_default(self.location.as_deref())
    }
}

/// Data for creating a new issue report
#[derive(Debug, Clone)]
pub struct CreateIssueReport {
    pub issue_id: Uuid,
    pub username: String,
    pub location: Option<String>,
    pub confidence_score: f64,
    pub segmented_image: Option<String>,
    pub label: Option<String>,
}
