/// Maximum accepted size of a submitted photo (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted for submitted photos
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

pub const REPORT_DESCRIPTION: &str = "AI detected issue";

pub const REPORT_UPDATED_MESSAGE: &str = "Report updated successfully";

pub fn is_image_type_allowed(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}
