//! 自定义窗口
//!
//! 由控制面板的复选框打开，标题栏的关闭按钮和窗口内的 "Close" 按钮都会关闭它。

use egui::Color32;
use tracing::info;

use crate::core::config::GuiLayoutConfig;
use crate::gui::layout;
use crate::gui::state::GuiState;

use super::controls::HEADER_COLOR;

const SECONDARY_COLOR: Color32 = Color32::from_rgb(128, 128, 128);

/// 构建自定义窗口
pub fn show(ctx: &egui::Context, state: &mut GuiState, layout: &GuiLayoutConfig) {
    if !state.show_custom_window {
        return;
    }

    let mut open = true;
    let mut close_clicked = false;

    egui::Window::new("A custom window")
        .open(&mut open)
        .default_size(layout::custom_window_size(layout))
        .show(ctx, |ui| {
            ui.add_space(1.0);
            ui.colored_label(HEADER_COLOR, "Some label");
            ui.colored_label(SECONDARY_COLOR, "another label");
            ui.add_space(1.5);

            if ui.button("Close").clicked() {
                info!("close button clicked");
                close_clicked = true;
            }
        });

    if !open || close_clicked {
        state.show_custom_window = false;
    }
}
