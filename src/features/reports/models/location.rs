use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Geographic coordinates of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0, message = "lat must be between -90 and 90"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "lng must be between -180 and 180"))]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Decode the stored JSON text.
    ///
    /// Missing, malformed, or incomplete values degrade to `{0.0, 0.0}`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match serde_json::from_str::<GeoPoint>(raw) {
            Ok(point) if point.lat.is_finite() && point.lng.is_finite() => point,
            Ok(_) => Self::default(),
            Err(e) => {
                tracing::debug!("Unreadable location {:?}: {}", raw, e);
                Self::default()
            }
        }
    }

    /// JSON text as stored in `issue_reports.location`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
