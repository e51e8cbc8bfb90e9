//! GUI 上下文
//!
//! GuiContext 持有 egui 上下文、GUI 状态和性能统计，每帧根据输入构建控件树并
//! 细分为三角形列表。绘制交给渲染后端，输入和平台输出交给 [`GuiPlatform`](super::GuiPlatform)。

use std::path::Path;
use std::time::Duration;

use egui::epaint::ClippedPrimitive;
use egui::{PlatformOutput, RawInput, TexturesDelta};
use tracing::{debug, info};

use crate::core::config::{GuiConfig, GuiLayoutConfig};

use super::metrics::PerformanceMetrics;
use super::panels;
use super::state::GuiState;
use super::style;

/// 控件树需要的每帧信息
#[derive(Debug, Clone, Default)]
pub struct FrameInfo {
    /// 帧缓冲区尺寸（物理像素）
    pub framebuffer_size: (u32, u32),
    /// 后端和设备描述
    pub backend: String,
    /// 当前本地时间
    pub time: String,
    /// 距上一帧的时间
    pub delta: Duration,
}

/// 一帧 GUI 的输出
pub struct GuiFrameOutput {
    pub primitives: Vec<ClippedPrimitive>,
    pub textures_delta: TexturesDelta,
    pub pixels_per_point: f32,
    pub platform_output: PlatformOutput,
}

/// GUI 上下文
pub struct GuiContext {
    ctx: egui::Context,
    state: GuiState,
    layout: GuiLayoutConfig,
    metrics: PerformanceMetrics,
}

impl GuiContext {
    /// 创建 egui 上下文，加载字体并应用样式
    ///
    /// 字体文件缺失时使用默认字体。
    pub fn new(config: &GuiConfig, font_path: &Path, dpi_scale: f32) -> Self {
        let ctx = egui::Context::default();
        style::install(&ctx, font_path, config.font_size);

        info!("GUI context has been created (DPI scale {:.2})", dpi_scale);

        Self {
            ctx,
            state: GuiState::new(),
            layout: config.layout.clone(),
            metrics: PerformanceMetrics::new(),
        }
    }

    /// egui 上下文
    pub fn egui(&self) -> &egui::Context {
        &self.ctx
    }

    pub fn state(&self) -> &GuiState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GuiState {
        &mut self.state
    }

    /// 构建一帧：运行控件树并细分
    pub fn run(&mut self, raw_input: RawInput, info: &FrameInfo) -> GuiFrameOutput {
        self.metrics.record_frame(info.delta);
        self.state
            .update_performance(self.metrics.fps(), self.metrics.frame_time_ms());

        let state = &mut self.state;
        let layout = &self.layout;
        let output = self
            .ctx
            .run(raw_input, |ctx| panels::show_all(ctx, state, layout, info));

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        if !output.textures_delta.is_empty() {
            debug!(
                "GUI textures: {} set, {} freed",
                output.textures_delta.set.len(),
                output.textures_delta.free.len()
            );
        }

        GuiFrameOutput {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
            platform_output: output.platform_output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::epaint::ClippedShape;
    use egui::{pos2, vec2, Event, Id, LayerId, Modifiers, Order, PointerButton, Pos2, Rect, Shape};

    use super::panels::controls::GUI_LIBRARY;

    fn gui() -> GuiContext {
        GuiContext::new(&GuiConfig::default(), Path::new("/nonexistent/font.ttf"), 1.0)
    }

    fn input() -> RawInput {
        RawInput {
            screen_rect: Some(Rect::from_min_size(pos2(0.0, 0.0), vec2(1200.0, 800.0))),
            ..Default::default()
        }
    }

    fn info() -> FrameInfo {
        FrameInfo {
            framebuffer_size: (1200, 800),
            backend: "OpenGL on test device (4.6)".to_string(),
            time: "01.01.2024 00:00:00.000 +0000".to_string(),
            delta: Duration::from_millis(16),
        }
    }

    #[test]
    fn test_first_frame_uploads_font_texture() {
        let mut gui = gui();
        let first = gui.run(input(), &info());
        assert!(!first.textures_delta.set.is_empty());
        assert_eq!(first.pixels_per_point, 1.0);

        // 新窗口在第一帧可能只做尺寸测量
        let second = gui.run(input(), &info());
        assert!(!second.primitives.is_empty());
    }

    #[test]
    fn test_frames_without_input_keep_state() {
        let mut gui = gui();
        gui.state_mut().show_custom_window = true;
        for _ in 0..3 {
            gui.run(input(), &info());
        }
        assert!(gui.state().show_custom_window);
        assert_eq!(gui.state().counter, 0);
        assert!(!gui.state().easter_egg_open);
    }

    #[test]
    fn test_optional_windows_render() {
        let mut gui = gui();
        gui.run(input(), &info());
        let baseline = gui.run(input(), &info()).primitives.len();

        let state = gui.state_mut();
        state.show_custom_window = true;
        state.show_settings_window = true;
        state.easter_egg_open = true;
        gui.run(input(), &info());
        let with_windows = gui.run(input(), &info()).primitives.len();

        assert!(with_windows > baseline);
        assert!(gui.state().show_settings_window);
        assert!(gui.state().easter_egg_open);
    }

    fn warm_up(gui: &mut GuiContext) {
        for _ in 0..2 {
            gui.run(input(), &info());
        }
    }

    /// 与 `GuiContext::run` 相同的控件树，返回细分前的图形
    fn layout_pass(gui: &mut GuiContext) -> Vec<ClippedShape> {
        let info = info();
        let state = &mut gui.state;
        let layout = &gui.layout;
        gui.ctx
            .run(input(), |ctx| panels::show_all(ctx, state, layout, &info))
            .shapes
    }

    fn text_rect(shape: &Shape, text: &str) -> Option<Rect> {
        match shape {
            Shape::Text(t) if t.galley.text() == text => Some(t.galley.rect.translate(t.pos.to_vec2())),
            Shape::Vec(shapes) => shapes.iter().find_map(|s| text_rect(s, text)),
            _ => None,
        }
    }

    fn find_text(gui: &mut GuiContext, text: &str) -> Option<Pos2> {
        layout_pass(gui)
            .iter()
            .find_map(|clipped| text_rect(&clipped.shape, text))
            .map(|rect| rect.center())
    }

    fn locate(gui: &mut GuiContext, text: &str) -> Pos2 {
        find_text(gui, text).unwrap_or_else(|| panic!("\"{}\" is not on screen", text))
    }

    fn pointer_button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    /// 按下和松开各占一帧
    fn click(gui: &mut GuiContext, pos: Pos2) {
        let press = RawInput {
            events: vec![Event::PointerMoved(pos), pointer_button(pos, true)],
            ..input()
        };
        gui.run(press, &info());

        let release = RawInput {
            events: vec![pointer_button(pos, false)],
            ..input()
        };
        gui.run(release, &info());
    }

    #[test]
    fn test_controls_show_library_line() {
        let mut gui = gui();
        warm_up(&mut gui);
        assert!(find_text(&mut gui, GUI_LIBRARY).is_some());
        assert!(find_text(&mut gui, "Counter button").is_some());
    }

    #[test]
    fn test_ninth_counter_click_opens_easter_egg() {
        let mut gui = gui();
        warm_up(&mut gui);
        let button = locate(&mut gui, "Counter button");

        for expected in 1..=8 {
            click(&mut gui, button);
            assert_eq!(gui.state().counter, expected);
            assert!(!gui.state().easter_egg_open);
        }

        click(&mut gui, button);
        assert_eq!(gui.state().counter, 9);
        assert!(gui.state().easter_egg_open);

        // 遮罩挡住了控制面板
        warm_up(&mut gui);
        click(&mut gui, button);
        assert_eq!(gui.state().counter, 9);
        assert!(gui.state().easter_egg_open);

        let orb = locate(&mut gui, "Buy Ultimate Orb");
        click(&mut gui, orb);
        assert!(!gui.state().easter_egg_open);

        // 关闭后继续计数，不会再次打开
        warm_up(&mut gui);
        click(&mut gui, button);
        assert_eq!(gui.state().counter, 10);
        assert!(!gui.state().easter_egg_open);
    }

    #[test]
    fn test_checkbox_follows_custom_window() {
        let mut gui = gui();
        warm_up(&mut gui);
        let checkbox = locate(&mut gui, "show a custom window");
        let window_layer = LayerId::new(Order::Middle, Id::new("A custom window"));
        assert!(find_text(&mut gui, "Some label").is_none());

        click(&mut gui, checkbox);
        assert!(gui.state().show_custom_window);
        assert!(gui.egui().memory(|m| m.layer_ids().any(|layer| layer == window_layer)));
        warm_up(&mut gui);
        assert!(find_text(&mut gui, "Some label").is_some());

        click(&mut gui, checkbox);
        assert!(!gui.state().show_custom_window);
        assert!(find_text(&mut gui, "Some label").is_none());

        click(&mut gui, checkbox);
        warm_up(&mut gui);
        let close = locate(&mut gui, "Close");
        click(&mut gui, close);
        assert!(!gui.state().show_custom_window);
        assert!(find_text(&mut gui, "Some label").is_none());
    }
}
