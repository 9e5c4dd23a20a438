use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::reports::dtos::{
    SubmissionFieldsDto, SubmissionResponseDto, SubmitReportDto,
};
use crate::features::reports::models::GeoPoint;
use crate::features::reports::services::ReportService;
use crate::shared::constants::{is_image_type_allowed, ALLOWED_IMAGE_TYPES, MAX_IMAGE_SIZE};
use crate::shared::types::ApiResponse;

/// Submit a photo of a civic issue
///
/// Accepts multipart/form-data with:
/// - `image`: The photo (required)
/// - `username`: Reporter name (required)
/// - `location`: JSON `{"lat": .., "lng": ..}` (optional)
/// - `lat` / `lng`: Coordinates as separate fields, used when `location` is absent
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = SubmitReportDto,
        content_type = "multipart/form-data",
        description = "Photo with reporter name and optional coordinates",
    ),
    responses(
        (status = 201, description = "Report analyzed and stored", body = ApiResponse<SubmissionResponseDto>),
        (status = 400, description = "Missing fields, invalid coordinates or unreadable image"),
        (status = 500, description = "Image analysis failed")
    )
)]
pub async fn submit_report(
    State(service): State<Arc<ReportService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponseDto>>), AppError> {
    let mut image: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut username: Option<String> = None;
    let mut location_json: Option<String> = None;
    let mut lat: Option<String> = None;
    let mut lng: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read image bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;
                image = Some(data.to_vec());
            }
            "username" => username = Some(read_text(field, "username").await?),
            "location" => location_json = non_empty(read_text(field, "location").await?),
            "lat" => lat = non_empty(read_text(field, "lat").await?),
            "lng" => lng = non_empty(read_text(field, "lng").await?),
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image = image.ok_or_else(|| AppError::BadRequest("Image is required".to_string()))?;
    let username =
        username.ok_or_else(|| AppError::BadRequest("Username is required".to_string()))?;

    if image.len() > MAX_IMAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "Image too large. Maximum size is {} bytes ({} MB)",
            MAX_IMAGE_SIZE,
            MAX_IMAGE_SIZE / 1024 / 1024
        )));
    }

    // A missing content type is left to the decoder
    if let Some(ct) = content_type.as_deref() {
        if !is_image_type_allowed(ct) {
            return Err(AppError::BadRequest(format!(
                "Image type '{}' is not allowed. Allowed types: {}",
                ct,
                ALLOWED_IMAGE_TYPES.join(", ")
            )));
        }
    }

    let fields = SubmissionFieldsDto {
        username: username.trim().to_string(),
        location: parse_location(location_json.as_deref(), lat.as_deref(), lng.as_deref())?,
    };
    fields
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service
        .submit(fields.username, fields.location, image)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None)),
    ))
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `location` JSON wins over separate `lat`/`lng` fields
fn parse_location(
    location: Option<&str>,
    lat: Option<&str>,
    lng: Option<&str>,
) -> Result<Option<GeoPoint>, AppError> {
    if let Some(raw) = location {
        return serde_json::from_str::<GeoPoint>(raw)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("Invalid location: {}", e)));
    }

    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint::new(
            parse_coordinate(lat, "lat")?,
            parse_coordinate(lng, "lng")?,
        ))),
        _ => Err(AppError::BadRequest(
            "Both lat and lng are required".to_string(),
        )),
    }
}

fn parse_coordinate(raw: &str, name: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", name, raw)))
}
