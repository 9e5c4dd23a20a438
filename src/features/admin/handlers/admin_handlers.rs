use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::admin::dtos::*;
use crate::features::admin::services::AdminService;
use crate::shared::constants::REPORT_UPDATED_MESSAGE;
use crate::shared::types::MessageResponse;

/// List issue reports
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(ResolvedFilterQuery),
    responses(
        (status = 200, description = "Reports, newest first", body = ReportListDto)
    ),
    tag = "admin"
)]
pub async fn list_reports(
    State(service): State<Arc<AdminService>>,
    Query(query): Query<ResolvedFilterQuery>,
) -> Result<Json<ReportListDto>> {
    let list = service.list_reports(query.resolved()).await?;
    Ok(Json(list))
}

/// Update the resolution state of a report
#[utoipa::path(
    patch,
    path = "/api/admin/reports/{id}",
    params(
        ("id" = i64, Path, description = "Report id")
    ),
    request_body = UpdateReportDto,
    responses(
        (status = 200, description = "Report updated", body = MessageResponse),
        (status = 400, description = "Invalid or conflicting fields"),
        (status = 404, description = "Report not found")
    ),
    tag = "admin"
)]
pub async fn update_report(
    State(service): State<Arc<AdminService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateReportDto>,
) -> Result<Json<MessageResponse>> {
    service.update_report(id, &dto).await?;
    Ok(Json(MessageResponse::new(REPORT_UPDATED_MESSAGE)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use super::*;
    use crate::features::admin::routes::routes;
    use crate::features::reports::ReportRepository;
    use crate::shared::test_helpers::{new_report, InMemoryReportRepository};

    async fn seeded() -> (TestServer, Arc<InMemoryReportRepository>) {
        let repo = Arc::new(InMemoryReportRepository::default());
        repo.create(&new_report("alice", Some("Garbage"))).await.unwrap();
        let second = repo.create(&new_report("bob", Some("Potholes"))).await.unwrap();
        repo.create(&new_report("carol", None)).await.unwrap();
        repo.set_resolved(second.id, true).await.unwrap();

        let app = Router::new().nest(
            "/api/admin",
            routes(Arc::new(AdminService::new(repo.clone()))),
        );
        (TestServer::new(app).unwrap(), repo)
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let (server, _) = seeded().await;

        let response = server.get("/api/admin/reports").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["count"], 3);
        let reporters: Vec<&str> = body["reports"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["reporter"].as_str().unwrap())
            .collect();
        assert_eq!(reporters, vec!["carol", "bob", "alice"]);
        assert_eq!(body["reports"][0]["title"], "Issue reported by carol");
        assert_eq!(body["reports"][0]["description"], "AI detected issue");
    }

    #[tokio::test]
    async fn test_list_filters_by_resolution() {
        let (server, _) = seeded().await;

        let resolved: Value = server
            .get("/api/admin/reports")
            .add_query_param("resolved", "True")
            .await
            .json();
        assert_eq!(resolved["count"], 1);
        assert_eq!(resolved["reports"][0]["reporter"], "bob");
        assert_eq!(resolved["reports"][0]["status"], "resolved");

        let unresolved: Value = server
            .get("/api/admin/reports")
            .add_query_param("resolved", "nope")
            .await
            .json();
        assert_eq!(unresolved["count"], 2);
        assert!(unresolved["reports"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["is_resolved"] == false));
    }

    #[tokio::test]
    async fn test_patch_persists_resolution() {
        let (server, repo) = seeded().await;

        let response = server
            .patch("/api/admin/reports/1")
            .json(&json!({"status": "resolved"}))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({"message": "Report updated successfully"})
        );
        assert!(repo.get_by_id(1).await.unwrap().is_resolved);

        server
            .patch("/api/admin/reports/1")
            .json(&json!({"is_resolved": false}))
            .await
            .assert_status_ok();
        assert!(!repo.get_by_id(1).await.unwrap().is_resolved);
    }

    #[tokio::test]
    async fn test_patch_empty_body_is_noop() {
        let (server, repo) = seeded().await;

        server
            .patch("/api/admin/reports/2")
            .json(&json!({}))
            .await
            .assert_status_ok();
        assert!(repo.get_by_id(2).await.unwrap().is_resolved);
    }

    #[tokio::test]
    async fn test_patch_unknown_id_is_not_found() {
        let (server, _) = seeded().await;

        server
            .patch("/api/admin/reports/999")
            .json(&json!({"is_resolved": true}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .patch("/api/admin/reports/999")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_rejects_conflicting_or_invalid_fields() {
        let (server, repo) = seeded().await;

        server
            .patch("/api/admin/reports/1")
            .json(&json!({"is_resolved": true, "status": "unresolved"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .patch("/api/admin/reports/1")
            .json(&json!({"status": "closed"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert!(!repo.get_by_id(1).await.unwrap().is_resolved);
    }
}
