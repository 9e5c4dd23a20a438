use utoipa::{Modify, OpenApi};

use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::modules::inference::IssueLabel;
use crate::shared::types::{ApiResponse, MessageResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Reports
        reports_handlers::submit_report,
        // Admin
        admin_handlers::list_reports,
        admin_handlers::update_report,
    ),
    components(
        schemas(
            ApiResponse<reports_dtos::SubmissionResponseDto>,
            MessageResponse,
            // Reports
            reports_dtos::ReportItemDto,
            reports_dtos::SubmitReportDto,
            reports_dtos::SubmissionResponseDto,
            reports_models::GeoPoint,
            reports_models::ReportStatus,
            IssueLabel,
            // Admin
            admin_dtos::ReportListDto,
            admin_dtos::UpdateReportDto,
        )
    ),
    tags(
        (name = "reports", description = "Photo submission and issue detection"),
        (name = "admin", description = "Report review and resolution"),
    )
)]
pub struct ApiDoc;

pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
