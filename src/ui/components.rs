//! Reusable UI components

use crate::theme;
use eframe::egui;

/// Dim uppercase section heading used in the sidebar and result cards
pub fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.add(
        egui::Label::new(
            egui::RichText::new(text)
                .size(theme::FONT_SECTION)
                .color(theme::TEXT_DIM),
        )
        .selectable(false),
    );
}

/// Draw a texture scaled down to fit the available width, preserving aspect
/// ratio. Images smaller than the available width render at native size.
pub fn fitted_image(ui: &mut egui::Ui, texture: &egui::TextureHandle) {
    let [w, h] = texture.size();
    let avail = ui.available_width();
    let scale = (avail / w as f32).min(1.0);
    let size = egui::vec2(w as f32 * scale, h as f32 * scale);
    ui.image(egui::load::SizedTexture::new(texture.id(), size));
}

/// Custom-painted button with a Phosphor icon. Returns true if clicked.
pub fn icon_button(ui: &mut egui::Ui, icon: &str, label: &str, base: egui::Color32) -> bool {
    let text = format!("{}  {}", icon, label);
    let text_width = ui.fonts(|f| {
        f.layout_no_wrap(
            text.clone(),
            egui::FontId::proportional(theme::FONT_SECTION),
            theme::TEXT_PRIMARY,
        )
        .rect
        .width()
    });
    let (rect, response) = ui.allocate_exact_size(
        egui::vec2(text_width + 24.0, theme::BUTTON_HEIGHT - 2.0),
        egui::Sense::click(),
    );
    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    let (fill, draw_rect) = theme::button_visual(&response, base, rect);
    ui.painter().rect_filled(draw_rect, theme::RADIUS_DEFAULT, fill);
    ui.painter().text(
        draw_rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(theme::FONT_SECTION),
        egui::Color32::WHITE,
    );
    response.clicked()
}

/// Thin progress bar for streaming image fetches
pub fn fetch_progress_bar(ui: &mut egui::Ui, downloaded: u64, total: u64) {
    let fraction = if total > 0 {
        downloaded as f32 / total as f32
    } else {
        0.0
    };
    let (rect, _) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), 6.0),
        egui::Sense::hover(),
    );
    let painter = ui.painter();
    painter.rect_filled(rect, 3.0, theme::BG_SURFACE);
    if fraction > 0.0 {
        let fill_rect = egui::Rect::from_min_size(
            rect.min,
            egui::vec2(rect.width() * fraction.clamp(0.0, 1.0), rect.height()),
        );
        painter.rect_filled(fill_rect, 3.0, theme::ACCENT);
    }
}
