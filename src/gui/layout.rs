//! 控件布局计算
//!
//! 所有尺寸都以 egui 的逻辑点为单位。

use egui::{pos2, vec2, Rect, Vec2};

use crate::core::config::GuiLayoutConfig;

/// 控制面板的位置和尺寸
///
/// 左上角固定在 `(margin, margin)`；宽度为屏幕宽度的三分之一，不小于 `min_panel_width`；
/// 高度为屏幕高度减去上下边距。
pub fn controls_panel_rect(screen: Vec2, layout: &GuiLayoutConfig) -> Rect {
    let width = (screen.x / 3.0).max(layout.min_panel_width);
    let height = (screen.y - 2.0 * layout.margin).max(0.0);
    Rect::from_min_size(pos2(layout.margin, layout.margin), vec2(width, height))
}

/// 自定义窗口的默认尺寸
pub fn custom_window_size(layout: &GuiLayoutConfig) -> Vec2 {
    vec2(layout.custom_window_size[0], layout.custom_window_size[1])
}

/// 面板背景不透明度，限制在 0..=1
pub fn background_alpha(layout: &GuiLayoutConfig) -> f32 {
    layout.background_alpha.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_is_a_third_of_wide_screens() {
        let layout = GuiLayoutConfig::default();
        let rect = controls_panel_rect(vec2(1200.0, 800.0), &layout);
        assert_eq!(rect.min, pos2(10.0, 10.0));
        assert_eq!(rect.width(), 400.0);
        assert_eq!(rect.height(), 780.0);
    }

    #[test]
    fn test_panel_width_is_clamped() {
        let layout = GuiLayoutConfig::default();
        let rect = controls_panel_rect(vec2(600.0, 400.0), &layout);
        assert_eq!(rect.width(), 300.0);
        assert_eq!(rect.height(), 380.0);
    }

    #[test]
    fn test_panel_height_never_negative() {
        let layout = GuiLayoutConfig::default();
        let rect = controls_panel_rect(vec2(900.0, 5.0), &layout);
        assert_eq!(rect.height(), 0.0);
    }

    #[test]
    fn test_layout_defaults() {
        let layout = GuiLayoutConfig::default();
        assert_eq!(custom_window_size(&layout), vec2(250.0, 150.0));
        assert_eq!(background_alpha(&layout), 0.7);
        assert_eq!(layout.popup_threshold, 9);
    }
}
