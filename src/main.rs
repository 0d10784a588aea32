#![windows_subsystem = "windows"]
//! Grad-CAM Classifier - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod constants;
mod settings;
mod theme;
mod types;
mod ui;
mod utils;

use app::{file_name_of, App};
use constants::*;
use eframe::egui;
use tracing::info;
use ui::components::{fetch_progress_bar, fitted_image, icon_button, section_label};
use utils::format_bytes;

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "gradcam-classifier.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gradcam_classifier=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> eframe::Result<()> {
    let data_dir = utils::get_data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "Grad-CAM Classifier starting");

    let settings = settings::Settings::load(&data_dir);
    let win_pos = match (settings.window_x, settings.window_y) {
        (Some(x), Some(y)) => Some(egui::pos2(x, y)),
        _ => None,
    };
    let win_size = match (settings.window_w, settings.window_h) {
        (Some(w), Some(h)) => Some(egui::vec2(w, h)),
        _ => None,
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size(win_size.unwrap_or(egui::vec2(1100.0, 800.0)))
        .with_min_inner_size([860.0, 600.0])
        .with_title(APP_TITLE);

    // Window/taskbar icon rasterized from the embedded SVG logo
    {
        let (rgba, w, h) = utils::rasterize_logo(64);
        let icon = egui::IconData { rgba, width: w, height: h };
        viewport = viewport.with_icon(std::sync::Arc::new(icon));
    }

    let needs_center = win_pos.is_none();

    if let Some(pos) = win_pos {
        viewport = viewport.with_position(pos);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| {
            let mut app = App::new(cc, settings, data_dir);
            app.needs_center = needs_center;
            Ok(Box::new(app))
        }),
    )
}

// ============================================================================
// MAIN UPDATE LOOP & UI RENDERING
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window position/size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().outer_rect {
                self.window_pos = Some(rect.min);
            }
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        // Center window on first launch
        if self.needs_center {
            self.needs_center = false;
            if let Some(cmd) = egui::ViewportCommand::center_on_screen(ctx) {
                ctx.send_viewport_cmd(cmd);
            }
        }

        // Mirror background-task results into textures and pick up new errors
        self.poll_session(ctx);

        self.render_sidebar(ctx);
        self.render_central(ctx);
        self.render_toast(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        self.save_settings();
    }
}

// ============================================================================
// SESSION POLLING
// ============================================================================

impl App {
    /// Rebuild textures whose session slots changed since last frame and
    /// promote newly reported errors to a toast.
    fn poll_session(&mut self, ctx: &egui::Context) {
        let mut toast = None;
        {
            let s = self.session.lock().unwrap();
            Self::refresh_texture(
                ctx,
                &s.preview,
                &mut self.preview_texture,
                &mut self.preview_tex_rev,
                "preview",
            );
            Self::refresh_texture(
                ctx,
                &s.uploaded,
                &mut self.uploaded_texture,
                &mut self.uploaded_tex_rev,
                "uploaded",
            );
            Self::refresh_texture(
                ctx,
                &s.gradcam,
                &mut self.gradcam_texture,
                &mut self.gradcam_tex_rev,
                "gradcam",
            );
            if s.error_seq > self.shown_error_seq {
                self.shown_error_seq = s.error_seq;
                toast = s.last_error.clone();
            }
        }
        if let Some(msg) = toast {
            self.toast_message = Some(msg);
            self.toast_start = Some(std::time::Instant::now());
        }
    }
}

// ============================================================================
// SIDEBAR
// ============================================================================

impl App {
    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .exact_width(theme::SIDEBAR_WIDTH)
            .resizable(false)
            .show_separator_line(false)
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin { left: 16, right: 16, top: 0, bottom: 0 }),
            )
            .show(ctx, |ui| {
                // Header with logo, centered
                ui.add_space(21.0);
                ui.with_layout(egui::Layout::top_down(egui::Align::Center), |ui| {
                    let texture = self.ensure_logo_texture(ctx);
                    let logo_w = ui.available_width() * 0.33;
                    ui.image(egui::load::SizedTexture::new(
                        texture.id(),
                        egui::vec2(logo_w, logo_w),
                    ));
                    ui.add_space(4.0);
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new("GRAD-CAM CLASSIFIER")
                                .size(theme::FONT_SMALL)
                                .color(theme::TEXT_DIM),
                        )
                        .selectable(false),
                    );
                });
                ui.add_space(11.0);

                // — Server —
                theme::section_frame().show(ui, |ui| {
                    section_label(ui, "SERVER");
                    ui.add_space(theme::SPACING_SM);
                    let response = egui::Frame::new()
                        .fill(theme::BG_INPUT)
                        .stroke(egui::Stroke::new(1.0, theme::BORDER_SUBTLE))
                        .corner_radius(theme::RADIUS_DEFAULT)
                        .inner_margin(egui::Margin::symmetric(8, 6))
                        .show(ui, |ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut self.server_url_str)
                                    .hint_text(DEFAULT_SERVER_URL)
                                    .frame(false)
                                    .font(egui::FontId::proportional(theme::FONT_LABEL))
                                    .desired_width(ui.available_width()),
                            )
                        })
                        .inner;
                    if response.lost_focus() {
                        self.save_settings();
                    }
                    ui.add_space(theme::SPACING_SM);
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new("Predictions are POSTed to this address.")
                                .size(theme::FONT_SMALL)
                                .color(theme::TEXT_DIM),
                        )
                        .selectable(false),
                    );
                });

                ui.add_space(theme::SPACING_LG);

                // — History —
                let footer_height = 40.0;
                let history_height = ui.available_height() - footer_height;
                theme::section_frame().show(ui, |ui| {
                    section_label(ui, "HISTORY");
                    ui.add_space(theme::SPACING_SM);

                    let session = self.session.clone();
                    let s = session.lock().unwrap();
                    if s.history.is_empty() {
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new("No predictions yet")
                                    .size(theme::FONT_SECTION)
                                    .color(theme::TEXT_DIM),
                            )
                            .selectable(false),
                        );
                    } else {
                        egui::ScrollArea::vertical()
                            .max_height(history_height - 70.0)
                            .show(ui, |ui| {
                                for entry in s.history.iter().rev() {
                                    ui.horizontal(|ui| {
                                        ui.add(
                                            egui::Label::new(
                                                egui::RichText::new(
                                                    entry.at.format("%H:%M:%S").to_string(),
                                                )
                                                .size(theme::FONT_SMALL)
                                                .color(theme::TEXT_DIM),
                                            )
                                            .selectable(false),
                                        );
                                        ui.add(
                                            egui::Label::new(
                                                egui::RichText::new(
                                                    entry.label.as_deref().unwrap_or("—"),
                                                )
                                                .size(theme::FONT_SECTION)
                                                .color(theme::ACCENT_LIGHT),
                                            )
                                            .selectable(false)
                                            .truncate(),
                                        );
                                    });
                                    ui.add(
                                        egui::Label::new(
                                            egui::RichText::new(&entry.file_name)
                                                .size(theme::FONT_SMALL)
                                                .color(theme::TEXT_MUTED),
                                        )
                                        .selectable(false)
                                        .truncate(),
                                    );
                                    ui.add_space(theme::SPACING_SM);
                                }
                            });
                    }
                });

                // Footer: version + logs shortcut
                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    ui.add_space(theme::SPACING_MD);
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new(format!("v{}", APP_VERSION))
                                    .size(theme::FONT_SMALL)
                                    .color(theme::TEXT_DIM),
                            )
                            .selectable(false),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if icon_button(
                                ui,
                                egui_phosphor::regular::FILE_TEXT,
                                "Logs",
                                theme::BTN_DEFAULT,
                            ) {
                                let _ = open::that(self.data_dir.join("logs"));
                            }
                        });
                    });
                });
            });
    }
}

// ============================================================================
// CENTRAL PANEL (form + results)
// ============================================================================

impl App {
    fn render_central(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::symmetric(24, 20)),
            )
            .show(ctx, |ui| {
                // Store panel rect for toast positioning
                self.central_panel_rect = Some(ui.max_rect());

                ui.add(
                    egui::Label::new(
                        egui::RichText::new("Cat & Dog Classifier")
                            .size(theme::FONT_TITLE)
                            .color(theme::TEXT_PRIMARY)
                            .strong(),
                    )
                    .selectable(false),
                );
                ui.add_space(2.0);
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(
                            "Upload an image to classify whether it features a cat or a dog. \
                             The model also generates a Grad-CAM heatmap for visualization.",
                        )
                        .size(theme::FONT_LABEL)
                        .color(theme::TEXT_MUTED),
                    )
                    .selectable(false),
                );
                ui.add_space(theme::SPACING_XL);

                self.render_form(ui, ctx);
                ui.add_space(theme::SPACING_LG);

                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_results(ui);
                });
            });
    }

    fn render_form(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (decoding, in_flight) = {
            let s = self.session.lock().unwrap();
            (s.decoding, s.in_flight)
        };

        ui.horizontal(|ui| {
            if icon_button(
                ui,
                egui_phosphor::regular::FOLDER_OPEN,
                "Choose Image",
                theme::BTN_DEFAULT,
            ) {
                self.pick_image(ctx);
            }

            let file_label = self
                .selected_file
                .as_ref()
                .map(|p| {
                    let name = file_name_of(p);
                    match std::fs::metadata(p) {
                        Ok(meta) => format!("{}  ({})", name, format_bytes(meta.len())),
                        Err(_) => name,
                    }
                })
                .unwrap_or_else(|| "No file selected".to_string());
            let label_color = if self.selected_file.is_some() {
                theme::TEXT_SECONDARY
            } else {
                theme::TEXT_DIM
            };
            ui.add(
                egui::Label::new(
                    egui::RichText::new(file_label)
                        .size(theme::FONT_LABEL)
                        .color(label_color),
                )
                .selectable(false)
                .truncate(),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let can_submit = self.selected_file.is_some();
                let text = format!("{}  Predict Image", egui_phosphor::regular::SPARKLE);
                let button = if can_submit {
                    theme::button_accent(text)
                } else {
                    egui::Button::new(
                        egui::RichText::new(text).color(theme::BTN_DISABLED_TEXT),
                    )
                    .fill(theme::BTN_DISABLED)
                    .corner_radius(theme::RADIUS_DEFAULT)
                };
                if ui.add_enabled(can_submit, button).clicked() {
                    self.submit(ctx);
                }

                if in_flight > 0 || decoding > 0 {
                    ui.add(egui::Spinner::new().size(16.0).color(theme::ACCENT));
                    let status = if in_flight > 0 {
                        "Waiting for prediction…"
                    } else {
                        "Decoding image…"
                    };
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(status)
                                .size(theme::FONT_SECTION)
                                .color(theme::TEXT_DIM),
                        )
                        .selectable(false),
                    );
                    ui.ctx().request_repaint();
                }
            });
        });
    }

    /// Four independently guarded blocks in declaration order: preview,
    /// uploaded image, Grad-CAM heatmap, prediction text.
    fn render_results(&mut self, ui: &mut egui::Ui) {
        let (prediction, uploaded_progress, gradcam_progress) = {
            let s = self.session.lock().unwrap();
            (
                s.result.as_ref().and_then(|r| r.prediction.clone()),
                s.uploaded.progress,
                s.gradcam.progress,
            )
        };

        if let Some(texture) = self.preview_texture.clone() {
            theme::card_frame().show(ui, |ui| {
                section_label(ui, "IMAGE PREVIEW");
                ui.add_space(theme::SPACING_SM);
                fitted_image(ui, &texture);
            });
            ui.add_space(theme::SPACING_MD);
        }

        render_image_card(
            ui,
            "UPLOADED IMAGE",
            self.uploaded_texture.as_ref(),
            uploaded_progress,
        );
        render_image_card(
            ui,
            "GRAD-CAM VISUALIZATION",
            self.gradcam_texture.as_ref(),
            gradcam_progress,
        );

        // A reply without a prediction key renders no text block at all
        if let Some(prediction) = prediction {
            theme::card_frame().show(ui, |ui| {
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(prediction)
                            .size(theme::FONT_TITLE)
                            .color(theme::STATUS_SUCCESS)
                            .strong(),
                    )
                    .selectable(false),
                );
            });
        }
    }
}

/// Server-returned image block. Shown while its fetch streams in (progress
/// bar) and once its texture is ready; hidden entirely before that.
fn render_image_card(
    ui: &mut egui::Ui,
    heading: &str,
    texture: Option<&egui::TextureHandle>,
    progress: Option<(u64, u64)>,
) {
    if texture.is_none() && progress.is_none() {
        return;
    }
    theme::card_frame().show(ui, |ui| {
        section_label(ui, heading);
        ui.add_space(theme::SPACING_SM);
        if let Some((downloaded, total)) = progress {
            fetch_progress_bar(ui, downloaded, total);
            ui.add(
                egui::Label::new(
                    egui::RichText::new(if total > 0 {
                        format!("{} / {}", format_bytes(downloaded), format_bytes(total))
                    } else {
                        format_bytes(downloaded)
                    })
                    .size(theme::FONT_SMALL)
                    .color(theme::TEXT_DIM),
                )
                .selectable(false),
            );
        } else if let Some(texture) = texture {
            fitted_image(ui, texture);
        }
    });
    ui.add_space(theme::SPACING_MD);
}

// ============================================================================
// TOAST NOTIFICATION
// ============================================================================

impl App {
    /// Error toast (bottom-right of central panel, 3s visible then fade,
    /// pause on hover)
    fn render_toast(&mut self, ctx: &egui::Context) {
        let (Some(msg), Some(panel_rect)) = (self.toast_message.clone(), self.central_panel_rect)
        else {
            return;
        };

        let visible_duration = 3.0;
        let fade_duration = 0.5;
        let total_duration = visible_duration + fade_duration;
        let margin = 12.0;

        let toast_pos = egui::pos2(panel_rect.right() - margin, panel_rect.bottom() - margin);

        let response = egui::Area::new(egui::Id::new("error_toast"))
            .fixed_pos(toast_pos)
            .pivot(egui::Align2::RIGHT_BOTTOM)
            .show(ctx, |ui| {
                let elapsed = self
                    .toast_start
                    .map(|t| t.elapsed().as_secs_f32())
                    .unwrap_or(0.0);
                let alpha = if elapsed > visible_duration {
                    (total_duration - elapsed) / fade_duration
                } else {
                    1.0
                };

                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(
                        0x1a,
                        0x1a,
                        0x1e,
                        (230.0 * alpha) as u8,
                    ))
                    .stroke(egui::Stroke::new(
                        1.0,
                        egui::Color32::from_rgba_unmultiplied(
                            theme::STATUS_ERROR.r(),
                            theme::STATUS_ERROR.g(),
                            theme::STATUS_ERROR.b(),
                            (100.0 * alpha) as u8,
                        ),
                    ))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(16, 10))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&msg).color(
                            egui::Color32::from_rgba_unmultiplied(
                                255,
                                255,
                                255,
                                (255.0 * alpha) as u8,
                            ),
                        ));
                    });
            });

        // Pause timer while hovering
        if response.response.hovered() {
            self.toast_start = Some(std::time::Instant::now());
        }

        let elapsed = self
            .toast_start
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0);
        if elapsed >= total_duration {
            self.toast_message = None;
            self.toast_start = None;
        } else {
            ctx.request_repaint();
        }
    }
}
