use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{CreateIssueReport, IssueReport};

const REPORT_COLUMNS: &str = r#"
    id, issue_id, username, location, confidence_score,
    segmented_image, is_resolved, label, created_at
"#;

/// Persistence for issue reports.
///
/// Rows are only ever inserted or have their resolution flag changed.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, data: &CreateIssueReport) -> Result<IssueReport>;

    /// All reports, newest first, optionally restricted to one resolution state
    async fn list(&self, is_resolved: Option<bool>) -> Result<Vec<IssueReport>>;

    async fn get_by_id(&self, id: i64) -> Result<IssueReport>;

    async fn set_resolved(&self, id: i64, is_resolved: bool) -> Result<IssueReport>;
}

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, data: &CreateIssueReport) -> Result<IssueReport> {
        let sql = format!(
            r#"
            INSERT INTO issue_reports
                (issue_id, username, location, confidence_score, segmented_image, label)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REPORT_COLUMNS}
            "#
        );

        let report = sqlx::query_as::<_, IssueReport>(&sql)
            .bind(data.issue_id)
            .bind(&data.username)
            .bind(&data.location)
            .bind(data.confidence_score)
            .bind(&data.segmented_image)
            .bind(&data.label)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create issue report: {:?}", e);
                AppError::Database(e)
            })?;

        tracing::info!(
            "Created issue report {} ({}) for {}",
            report.id,
            report.issue_id,
            report.username
        );
        Ok(report)
    }

    async fn list(&self, is_resolved: Option<bool>) -> Result<Vec<IssueReport>> {
        let sql = format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM issue_reports
            WHERE ($1::BOOLEAN IS NULL OR is_resolved = $1)
            ORDER BY created_at DESC, id DESC
            "#
        );

        sqlx::query_as::<_, IssueReport>(&sql)
            .bind(is_resolved)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list issue reports: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn get_by_id(&self, id: i64) -> Result<IssueReport> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM issue_reports WHERE id = $1");

        sqlx::query_as::<_, IssueReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get issue report: {:?}", e);
                AppError::Database(e)
            })?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }

    async fn set_resolved(&self, id: i64, is_resolved: bool) -> Result<IssueReport> {
        let sql = format!(
            r#"
            UPDATE issue_reports
            SET is_resolved = $2
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        );

        let report = sqlx::query_as::<_, IssueReport>(&sql)
            .bind(id)
            .bind(is_resolved)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update issue report: {:?}", e);
                AppError::Database(e)
            })?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        tracing::info!("Report {} marked {}", id, report.status());
        Ok(report)
    }
}
