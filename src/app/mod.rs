//! App module - contains the main application state and logic

mod picker;
mod predict;

pub(crate) use picker::file_name_of;

use crate::settings::Settings;
use crate::theme;
use crate::types::{ImageSlot, Session};
use crate::utils;
use eframe::egui;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    /// Shared with background tasks; see `types::Session`
    pub(crate) session: Arc<Mutex<Session>>,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) http: reqwest::Client,
    // Form state
    pub(crate) selected_file: Option<PathBuf>,
    pub(crate) last_image_dir: PathBuf,
    pub(crate) server_url_str: String,
    // Textures mirrored from the session's image slots
    pub(crate) logo_texture: Option<egui::TextureHandle>,
    pub(crate) preview_texture: Option<egui::TextureHandle>,
    pub(crate) preview_tex_rev: u64,
    pub(crate) uploaded_texture: Option<egui::TextureHandle>,
    pub(crate) uploaded_tex_rev: u64,
    pub(crate) gradcam_texture: Option<egui::TextureHandle>,
    pub(crate) gradcam_tex_rev: u64,
    // Toast notification
    pub(crate) toast_message: Option<String>,
    pub(crate) toast_start: Option<std::time::Instant>,
    pub(crate) shown_error_seq: u64,
    // Central panel rect for toast positioning
    pub(crate) central_panel_rect: Option<egui::Rect>,
    // Window state
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, data_dir: PathBuf) -> Self {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Add Phosphor icons font
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        // Apply theme from theme.rs
        theme::apply_visuals(&cc.egui_ctx);

        Self {
            session: Arc::new(Mutex::new(Session::default())),
            runtime: tokio::runtime::Runtime::new().unwrap(),
            http: reqwest::Client::new(),
            selected_file: None,
            last_image_dir: settings.last_image_dir_or_default(),
            server_url_str: settings.server_url,
            logo_texture: None,
            preview_texture: None,
            preview_tex_rev: 0,
            uploaded_texture: None,
            uploaded_tex_rev: 0,
            gradcam_texture: None,
            gradcam_tex_rev: 0,
            toast_message: None,
            toast_start: None,
            shown_error_seq: 0,
            central_panel_rect: None,
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
        }
    }

    pub fn save_settings(&self) {
        let settings = Settings {
            window_x: self.window_pos.map(|p| p.x),
            window_y: self.window_pos.map(|p| p.y),
            window_w: self.window_size.map(|s| s.x),
            window_h: self.window_size.map(|s| s.y),
            server_url: self.server_url_str.clone(),
            last_image_dir: Some(self.last_image_dir.to_string_lossy().to_string()),
        };
        settings.save(&self.data_dir);
    }

    /// Server base URL with surrounding whitespace and trailing slash trimmed
    pub fn server_url(&self) -> String {
        self.server_url_str.trim().trim_end_matches('/').to_string()
    }

    /// Rebuild a texture when its session slot has a newer revision
    pub(crate) fn refresh_texture(
        ctx: &egui::Context,
        slot: &ImageSlot,
        texture: &mut Option<egui::TextureHandle>,
        tex_rev: &mut u64,
        name: &str,
    ) {
        if slot.revision == *tex_rev {
            return;
        }
        *tex_rev = slot.revision;
        *texture = slot.image.as_ref().map(|img| {
            ctx.load_texture(
                format!("{}_{}", name, slot.revision),
                egui::ColorImage::from_rgba_unmultiplied([img.width, img.height], &img.rgba),
                egui::TextureOptions::LINEAR,
            )
        });
    }

    pub(crate) fn ensure_logo_texture(&mut self, ctx: &egui::Context) -> egui::TextureHandle {
        self.logo_texture
            .get_or_insert_with(|| {
                let (pixels, w, h) = utils::rasterize_logo(192);
                ctx.load_texture(
                    "logo",
                    egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &pixels),
                    egui::TextureOptions::LINEAR,
                )
            })
            .clone()
    }
}
