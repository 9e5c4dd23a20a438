use std::sync::Arc;

use crate::core::error::Result;
use crate::features::admin::dtos::{ReportListDto, UpdateReportDto};
use crate::features::reports::dtos::ReportItemDto;
use crate::features::reports::ReportRepository;

/// Service for admin queries
pub struct AdminService {
    repo: Arc<dyn ReportRepository>,
}

impl AdminService {
    pub fn new(repo: Arc<dyn ReportRepository>) -> Self {
        Self { repo }
    }

    /// List reports newest first, optionally filtered by resolution state
    pub async fn list_reports(&self, resolved: Option<bool>) -> Result<ReportListDto> {
        let reports: Vec<ReportItemDto> = self
            .repo
            .list(resolved)
            .await?
            .into_iter()
            .map(ReportItemDto::from)
            .collect();

        Ok(ReportListDto {
            count: reports.len(),
            reports,
        })
    }

    /// Apply a resolution change. A body without keys only checks that the report exists.
    pub async fn update_report(&self, id: i64, dto: &UpdateReportDto) -> Result<()> {
        match dto.target_resolution()? {
            Some(is_resolved) => {
                self.repo.set_resolved(id, is_resolved).await?;
            }
            None => {
                self.repo.get_by_id(id).await?;
                tracing::debug!("Empty update for report {}", id);
            }
        }
        Ok(())
    }
}
