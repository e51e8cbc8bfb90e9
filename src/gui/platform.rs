//! GUI 平台适配
//!
//! 基于 egui-winit：把窗口事件转换为 egui 输入，并把 egui 的平台输出
//! （光标形状、剪贴板、输入法）应用到窗口。

use egui::{PlatformOutput, RawInput, ViewportId};
use tracing::info;
use winit::event::WindowEvent;
use winit::window::Window;

/// egui-winit 平台适配器
pub struct GuiPlatform {
    state: egui_winit::State,
}

impl GuiPlatform {
    pub fn new(ctx: &egui::Context, window: &Window, dpi_scale: f32, max_texture_side: usize) -> Self {
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(dpi_scale),
            Some(max_texture_side),
        );
        info!("GUI platform adapter has been bound to the window");
        Self { state }
    }

    /// 处理窗口事件，返回事件是否被 GUI 消费
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// 取出自上一帧以来累积的输入
    pub fn take_input(&mut self, window: &Window) -> RawInput {
        self.state.take_egui_input(window)
    }

    /// 应用平台输出
    pub fn handle_output(&mut self, window: &Window, output: PlatformOutput) {
        self.state.handle_platform_output(window, output);
    }
}
