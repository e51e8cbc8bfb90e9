//! 控制面板
//!
//! 固定在左上角的主面板：时间、窗口尺寸、图形后端、GUI 库信息，
//! 以及计数按钮、打开标准演示窗口的按钮和自定义窗口开关。

use egui::{Color32, RichText};
use tracing::info;

use crate::core::config::GuiLayoutConfig;
use crate::gui::context::FrameInfo;
use crate::gui::layout;
use crate::gui::state::GuiState;

use super::performance;

/// 分组标题颜色
pub const HEADER_COLOR: Color32 = Color32::from_rgb(255, 0, 255);

/// GUI 库名称
pub const GUI_LIBRARY: &str = "egui + egui-winit";

fn header(ui: &mut egui::Ui, text: &str) {
    ui.label(RichText::new(text).color(HEADER_COLOR));
}

/// 构建控制面板
pub fn show(ctx: &egui::Context, state: &mut GuiState, layout: &GuiLayoutConfig, info: &FrameInfo) {
    let rect = layout::controls_panel_rect(ctx.screen_rect().size(), layout);
    let style = ctx.style();
    let fill = style.visuals.window_fill.gamma_multiply(layout::background_alpha(layout));

    egui::Window::new("Controls")
        .fixed_rect(rect)
        .resizable(false)
        .collapsible(false)
        .frame(egui::Frame::window(&style).fill(fill))
        .show(ctx, |ui| {
            ui.add_space(1.0);
            header(ui, "Time");
            ui.label(info.time.as_str());

            ui.add_space(3.0);
            header(ui, "Application");
            ui.label(format!("Main window width: {}", info.framebuffer_size.0));
            ui.label(format!("Main window height: {}", info.framebuffer_size.1));
            performance::render(ui, state);

            ui.add_space(3.0);
            header(ui, "Graphics");
            ui.label(info.backend.as_str());

            ui.add_space(3.0);
            header(ui, "GUI");
            ui.label(GUI_LIBRARY);

            ui.add_space(10.0);
            ui.separator();
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Counter button").clicked() {
                    info!("counter button clicked");
                    if state.click_counter(layout.popup_threshold) {
                        info!("Easter egg opened");
                    }
                }
                ui.label(format!("counter = {}", state.counter));
            });

            ui.add_space(15.0);
            if !state.show_settings_window && ui.button("Open standard demo").clicked() {
                state.show_settings_window = true;
            }

            ui.checkbox(&mut state.show_custom_window, "show a custom window");
        });
}
