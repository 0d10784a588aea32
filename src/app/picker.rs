//! File selection and preview decoding

use super::App;
use crate::constants::IMAGE_EXTENSIONS;
use crate::types::DecodedImage;
use eframe::egui;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode image bytes into straight RGBA for texture upload.
pub(crate) fn decode_image(bytes: &[u8]) -> Result<DecodedImage, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);
    Ok(DecodedImage {
        rgba: rgba.into_raw(),
        width,
        height,
    })
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

impl App {
    /// Open the native file dialog. A cancelled dialog changes nothing; a
    /// chosen file replaces the selection and kicks off a preview decode.
    pub fn pick_image(&mut self, ctx: &egui::Context) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .set_directory(&self.last_image_dir)
            .pick_file();

        let Some(path) = picked else {
            debug!("File dialog cancelled");
            return;
        };

        debug!(path = %path.display(), "Image selected");
        if let Some(dir) = path.parent() {
            self.last_image_dir = dir.to_path_buf();
        }
        self.selected_file = Some(path.clone());
        self.save_settings();
        self.start_preview_decode(ctx, path);
    }

    /// Read and decode the file off the UI thread, then store the preview.
    /// Overlapping decodes are allowed; each completion overwrites the slot.
    fn start_preview_decode(&mut self, ctx: &egui::Context, path: PathBuf) {
        self.session.lock().unwrap().decoding += 1;

        let session = self.session.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let name = file_name_of(&path);
            let result = match tokio::fs::read(&path).await {
                Ok(bytes) => decode_image(&bytes),
                Err(e) => Err(e.to_string()),
            };
            session.lock().unwrap().finish_preview(&name, result);
            ctx.request_repaint();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn decode_accepts_a_real_png() {
        // 2x1 PNG encoded in-process so the fixture can't rot
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 1));
        assert_eq!(decoded.rgba.len(), 8);
        assert_eq!(&decoded.rgba[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn file_name_of_strips_directories() {
        assert_eq!(file_name_of(Path::new("/tmp/photos/cat.png")), "cat.png");
    }
}
