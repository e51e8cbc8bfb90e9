//! GUI 状态管理
//!
//! GuiState 保存所有 GUI 相关的状态数据，与具体的图形后端无关。
//! 只在帧循环中通过控件交互修改。

/// GUI 状态（与后端无关）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiState {
    // 窗口开关
    pub show_settings_window: bool,
    pub show_custom_window: bool,

    // 计数按钮
    pub counter: u32,
    pub easter_egg_open: bool,

    // 性能监控
    pub fps: f32,
    pub frame_time_ms: f32,
}

impl GuiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计数按钮被点击
    ///
    /// 计数加一；恰好达到 `popup_threshold` 时打开彩蛋弹窗并返回 `true`。
    pub fn click_counter(&mut self, popup_threshold: u32) -> bool {
        self.counter = self.counter.saturating_add(1);
        if self.counter == popup_threshold {
            self.easter_egg_open = true;
            return true;
        }
        false
    }

    /// 关闭彩蛋弹窗
    pub fn close_easter_egg(&mut self) {
        self.easter_egg_open = false;
    }

    /// 更新性能统计
    pub fn update_performance(&mut self, fps: f32, frame_time_ms: f32) {
        self.fps = fps;
        self.frame_time_ms = frame_time_ms;
    }
}
