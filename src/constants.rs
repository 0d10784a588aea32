//! Application constants and configuration

/// Classifier backend root. Predictions are POSTed here; the returned
/// image URLs are resolved against it.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Multipart field name the backend expects the file under.
pub const UPLOAD_FIELD: &str = "imagefile";

pub const APP_TITLE: &str = "Grad-CAM Classifier";
pub const DATA_DIR_NAME: &str = "Gradcam Classifier";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions offered by the file picker.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
