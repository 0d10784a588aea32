//! Utility functions

use crate::constants::DATA_DIR_NAME;
use std::path::{Path, PathBuf};

// Square viewBox — used for the sidebar logo and the window/taskbar icon
pub const LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 256 256"><defs><style>.c1{fill:none;stroke:#fff;stroke-width:14}.c2{fill:#2d2a3d}.c3{fill:#a78bfa}.c4{fill:#f87171}</style></defs><rect class="c2" x="24" y="24" width="208" height="208" rx="36"/><rect class="c1" x="24" y="24" width="208" height="208" rx="36"/><circle class="c3" cx="128" cy="128" r="64"/><circle class="c4" cx="128" cy="128" r="32"/></svg>"#;

/// Rasterize the logo SVG to a square RGBA image.
pub fn rasterize_logo(size: u32) -> (Vec<u8>, u32, u32) {
    let tree = resvg::usvg::Tree::from_str(LOGO_SVG, &resvg::usvg::Options::default()).unwrap();
    let scale = size as f32 / tree.size().width();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size).unwrap();
    resvg::render(
        &tree,
        resvg::usvg::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    (premul_to_straight(&pixmap), size, size)
}

fn premul_to_straight(pixmap: &resvg::tiny_skia::Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let a = p.alpha();
            if a == 0 {
                [0, 0, 0, 0]
            } else {
                let r = (p.red() as u16 * 255 / a as u16) as u8;
                let g = (p.green() as u16 * 255 / a as u16) as u8;
                let b = (p.blue() as u16 * 255 / a as u16) as u8;
                [r, g, b, a]
            }
        })
        .collect()
}

/// Get the app data directory path
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Resolve a server-returned URL against the server base. Absolute URLs are
/// passed through; relative ones (e.g. `/static/images/cat.png`) are joined.
pub fn join_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

/// Guess the MIME type of an image file from its extension.
pub fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Format bytes into human-readable string (B, KB, MB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_joins_relative_paths() {
        assert_eq!(
            join_url("http://127.0.0.1:3000", "/static/images/cat.png"),
            "http://127.0.0.1:3000/static/images/cat.png"
        );
        assert_eq!(
            join_url("http://127.0.0.1:3000/", "static/heatmap.jpg"),
            "http://127.0.0.1:3000/static/heatmap.jpg"
        );
    }

    #[test]
    fn join_url_passes_absolute_urls_through() {
        assert_eq!(
            join_url("http://127.0.0.1:3000", "https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn guess_mime_by_extension() {
        assert_eq!(guess_mime(Path::new("cat.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("dog.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
