use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core::error::AppError;
use crate::features::reports::dtos::ReportItemDto;
use crate::features::reports::models::ReportStatus;

/// Query params for listing reports
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ResolvedFilterQuery {
    /// "true" (any case) for resolved reports; any other value for unresolved
    pub resolved: Option<String>,
}

impl ResolvedFilterQuery {
    pub fn resolved(&self) -> Option<bool> {
        self.resolved
            .as_deref()
            .map(|value| value.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportListDto {
    pub count: usize,
    pub reports: Vec<ReportItemDto>,
}

/// Resolution change. Either key may be used; both must agree when given.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateReportDto {
    pub is_resolved: Option<bool>,
    pub status: Option<ReportStatus>,
}

impl UpdateReportDto {
    /// The requested resolution state, `None` when the body asks for nothing
    pub fn target_resolution(&self) -> Result<Option<bool>, AppError> {
        match (self.is_resolved, self.status.map(|s| s.is_resolved())) {
            (Some(flag), Some(from_status)) if flag != from_status => {
                Err(AppError::BadRequest(
                    "is_resolved and status disagree".to_string(),
                ))
            }
            (Some(flag), _) => Ok(Some(flag)),
            (None, from_status) => Ok(from_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_filter_is_case_insensitive() {
        let query = |v: Option<&str>| ResolvedFilterQuery {
            resolved: v.map(str::to_string),
        };

        assert_eq!(query(None).resolved(), None);
        assert_eq!(query(Some("true")).resolved(), Some(true));
        assert_eq!(query(Some("TRUE")).resolved(), Some(true));
        assert_eq!(query(Some("false")).resolved(), Some(false));
        assert_eq!(query(Some("yes")).resolved(), Some(false));
        assert_eq!(query(Some("")).resolved(), Some(false));
    }

    #[test]
    fn test_target_resolution() {
        let dto = |is_resolved, status| UpdateReportDto {
            is_resolved,
            status,
        };

        assert_eq!(dto(None, None).target_resolution().unwrap(), None);
        assert_eq!(dto(Some(true), None).target_resolution().unwrap(), Some(true));
        assert_eq!(
            dto(None, Some(ReportStatus::Unresolved))
                .target_resolution()
                .unwrap(),
            Some(false)
        );
        assert_eq!(
            dto(Some(true), Some(ReportStatus::Resolved))
                .target_resolution()
                .unwrap(),
            Some(true)
        );
        assert!(dto(Some(false), Some(ReportStatus::Resolved))
            .target_resolution()
            .is_err());
    }

    #[test]
    fn test_update_body_parsing() {
        let dto: UpdateReportDto = serde_json::from_str(r#"{"status": "resolved"}"#).unwrap();
        assert_eq!(dto.status, Some(ReportStatus::Resolved));

        let empty: UpdateReportDto = serde_json::from_str("{}").unwrap();
        assert!(empty.is_resolved.is_none() && empty.status.is_none());

        assert!(serde_json::from_str::<UpdateReportDto>(r#"{"status": "done"}"#).is_err());
    }
}
