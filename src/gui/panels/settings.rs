//! 标准演示窗口
//!
//! egui 自带的设置与检查界面，可调整样式、查看内存和布局调试信息。

use crate::gui::state::GuiState;

/// 构建标准演示窗口
pub fn show(ctx: &egui::Context, state: &mut GuiState) {
    if !state.show_settings_window {
        return;
    }

    egui::Window::new("Standard demo")
        .open(&mut state.show_settings_window)
        .vscroll(true)
        .default_width(420.0)
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Settings")
                .default_open(true)
                .show(ui, |ui| ctx.settings_ui(ui));
            egui::CollapsingHeader::new("Inspection").show(ui, |ui| ctx.inspection_ui(ui));
            egui::CollapsingHeader::new("Memory").show(ui, |ui| ctx.memory_ui(ui));
        });
}
