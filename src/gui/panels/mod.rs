//! GUI 面板模块
//!
//! 每帧按固定顺序构建：控制面板、自定义窗口、标准演示窗口，最后是彩蛋弹窗。

pub mod controls;
pub mod custom_window;
pub mod easter_egg;
pub mod performance;
pub mod settings;

use crate::core::config::GuiLayoutConfig;
use crate::gui::context::FrameInfo;
use crate::gui::state::GuiState;

/// 构建整棵控件树
pub fn show_all(ctx: &egui::Context, state: &mut GuiState, layout: &GuiLayoutConfig, info: &FrameInfo) {
    controls::show(ctx, state, layout, info);
    custom_window::show(ctx, state, layout);
    settings::show(ctx, state);
    easter_egg::show(ctx, state);
}
