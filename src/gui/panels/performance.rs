//! 性能监控面板
//!
//! 显示 FPS、帧时间等性能指标。

use crate::gui::state::GuiState;

/// 60 FPS 对应的帧时间
const TARGET_FRAME_TIME_MS: f32 = 1000.0 / 60.0;

/// 帧时间达到 60 FPS 为绿色，否则为红色
fn frame_time_color(frame_time_ms: f32) -> egui::Color32 {
    if frame_time_ms <= TARGET_FRAME_TIME_MS {
        egui::Color32::GREEN
    } else {
        egui::Color32::RED
    }
}

fn fps_text(state: &GuiState) -> String {
    if state.frame_time_ms <= 0.0 {
        "FPS: -".to_string()
    } else {
        format!("FPS: {:.1} ({:.2} ms)", state.fps, state.frame_time_ms)
    }
}

/// 渲染性能面板
pub fn render(ui: &mut egui::Ui, state: &GuiState) {
    // 第一秒还没有统计数据
    if state.frame_time_ms <= 0.0 {
        ui.label(fps_text(state));
        return;
    }
    ui.colored_label(frame_time_color(state.frame_time_ms), fps_text(state));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_text_before_first_sample() {
        assert_eq!(fps_text(&GuiState::new()), "FPS: -");
    }

    #[test]
    fn test_fps_text_and_color() {
        let mut state = GuiState::new();
        state.update_performance(60.0, 16.0);
        assert_eq!(fps_text(&state), "FPS: 60.0 (16.00 ms)");
        assert_eq!(frame_time_color(16.0), egui::Color32::GREEN);
        assert_eq!(frame_time_color(25.0), egui::Color32::RED);
    }
}
