//! 帧循环驱动
//!
//! 每次迭代的固定顺序：
//!
//! ```text
//! 计时 → 推进场景 → 构建 GUI → begin_frame → 上传 GUI 纹理
//!      → draw_scene → paint_gui → end_frame → 释放 GUI 纹理
//! ```
//!
//! `begin_frame` 跳过本帧时（最小化、交换链待重建）GUI 照常构建，纹理照常上传和释放，
//! 只是不绘制也不呈现。输入在帧结束后由应用程序轮询。

use egui::{PlatformOutput, RawInput};
use tracing::trace;
use winit::event::WindowEvent;

use crate::core::clock::{self, FrameClock};
use crate::core::error::Result;
use crate::gui::{FrameInfo, GuiContext};
use crate::renderer::{FrameContext, FrameStatus, PresentStatus, RenderBackend, Scene};

/// 一帧的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub status: FrameStatus,
    /// 跳过的帧没有呈现结果
    pub present: Option<PresentStatus>,
    pub frame_index: u64,
}

/// 帧循环驱动
pub struct FrameDriver {
    clock: FrameClock,
    scene: Scene,
    backend_summary: String,
}

impl FrameDriver {
    pub fn new(scene: Scene, backend_summary: String) -> Self {
        Self {
            clock: FrameClock::new(),
            scene,
            backend_summary,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// 执行一帧
    ///
    /// `gui` 为 `None` 时（没有 GUI 的入口）只清屏和绘制几何体。
    /// 返回的平台输出需要交给 GUI 平台适配器。
    pub fn run_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        gui: Option<(&mut GuiContext, RawInput)>,
        framebuffer_size: (u32, u32),
        pixels_per_point: f32,
    ) -> Result<(FrameReport, Option<PlatformOutput>)> {
        let timing = self.clock.tick();
        self.scene.advance(timing.delta);
        let frame = FrameContext::new(framebuffer_size, pixels_per_point, timing);

        let gui_output = gui.map(|(gui, raw_input)| {
            let info = FrameInfo {
                framebuffer_size,
                backend: self.backend_summary.clone(),
                time: clock::current_time(),
                delta: timing.delta,
            };
            gui.run(raw_input, &info)
        });

        let status = backend.begin_frame(&frame, self.scene.clear_color())?;

        if let Some(output) = &gui_output {
            backend.update_gui_textures(&output.textures_delta)?;
        }

        let present = match status {
            FrameStatus::Ready => {
                backend.draw_scene(&self.scene.frame(frame.aspect_ratio()))?;
                if let Some(output) = &gui_output {
                    backend.paint_gui(&output.primitives, output.pixels_per_point)?;
                }
                Some(backend.end_frame()?)
            }
            FrameStatus::Skipped(reason) => {
                trace!("Frame {} skipped: {:?}", timing.frame_index, reason);
                None
            }
        };

        let platform_output = match gui_output {
            Some(output) => {
                backend.free_gui_textures(&output.textures_delta.free)?;
                Some(output.platform_output)
            }
            None => None,
        };

        Ok((
            FrameReport {
                status,
                present,
                frame_index: timing.frame_index,
            },
            platform_output,
        ))
    }
}

/// 把窗口事件转发给后端
///
/// 每个 `Resized` 事件调用一次 `resize`，返回是否转发了。
pub fn dispatch_window_event<B: RenderBackend>(backend: &mut B, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::Resized(size) => {
            tracing::debug!(width = size.width, height = size.height, "Window resized");
            backend.resize(size.width, size.height);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;

    use ash::vk;
    use egui::epaint::{ClippedPrimitive, TextureId};
    use egui::TexturesDelta;
    use winit::dpi::PhysicalSize;

    use super::*;
    use crate::core::config::{GraphicsBackend, GuiConfig};
    use crate::core::scene::{GeometryKind, SceneConfig};
    use crate::gfx::vulkan::renderer::{classify_present, rebuild_gate, RebuildGate};
    use crate::renderer::sync::SwapchainState;
    use crate::renderer::{BackendInfo, SceneFrame, SkipReason};

    /// 记录调用顺序的测试后端
    ///
    /// 交换链重建沿用 Vulkan 渲染器的判定，呈现结果按脚本给出。
    #[derive(Default)]
    struct MockBackend {
        calls: Vec<&'static str>,
        resizes: Vec<(u32, u32)>,
        present_results: VecDeque<std::result::Result<bool, vk::Result>>,
        state: SwapchainState,
        uploaded: usize,
        freed: usize,
    }

    impl RenderBackend for MockBackend {
        fn kind(&self) -> GraphicsBackend {
            GraphicsBackend::Vulkan
        }

        fn info(&self) -> BackendInfo {
            BackendInfo {
                api: "Mock".to_string(),
                device: "test".to_string(),
                version: "1.0".to_string(),
            }
        }

        fn max_texture_side(&self) -> usize {
            2048
        }

        fn init_gui(&mut self) -> Result<()> {
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn begin_frame(&mut self, frame: &FrameContext, _clear_color: [f32; 4]) -> Result<FrameStatus> {
            self.calls.push("begin_frame");
            if frame.is_minimized() {
                return Ok(FrameStatus::Skipped(SkipReason::Minimized));
            }
            let (width, height) = frame.framebuffer_size;
            match rebuild_gate(&self.state, width, height) {
                RebuildGate::Proceed => {}
                RebuildGate::Wait => return Ok(FrameStatus::Skipped(SkipReason::SwapchainOutOfDate)),
                RebuildGate::Rebuild => self.state.finish_rebuild(),
            }
            Ok(FrameStatus::Ready)
        }

        fn draw_scene(&mut self, _scene: &SceneFrame) -> Result<()> {
            self.calls.push("draw_scene");
            Ok(())
        }

        fn update_gui_textures(&mut self, delta: &TexturesDelta) -> Result<()> {
            self.calls.push("update_gui_textures");
            self.uploaded += delta.set.len();
            Ok(())
        }

        fn paint_gui(&mut self, _primitives: &[ClippedPrimitive], _pixels_per_point: f32) -> Result<()> {
            self.calls.push("paint_gui");
            Ok(())
        }

        fn end_frame(&mut self) -> Result<PresentStatus> {
            self.calls.push("end_frame");
            let outcome = classify_present(self.present_results.pop_front().unwrap_or(Ok(false)))?;
            if outcome.needs_rebuild() {
                self.state.mark_out_of_date();
            }
            Ok(outcome.status)
        }

        fn free_gui_textures(&mut self, ids: &[TextureId]) -> Result<()> {
            self.calls.push("free_gui_textures");
            self.freed += ids.len();
            Ok(())
        }

        fn wait_idle(&mut self) -> Result<()> {
            Ok(())
        }

        fn shutdown_gui(&mut self) {}

        fn shutdown(&mut self) {}
    }

    fn driver(geometry: GeometryKind) -> FrameDriver {
        let config = SceneConfig {
            geometry,
            ..SceneConfig::default()
        };
        FrameDriver::new(Scene::new(config), "Mock on test (1.0)".to_string())
    }

    fn gui() -> GuiContext {
        GuiContext::new(&GuiConfig::default(), Path::new("/nonexistent/font.ttf"), 1.0)
    }

    #[test]
    fn test_frame_order_with_gui() {
        let mut backend = MockBackend::default();
        let mut driver = driver(GeometryKind::Triangle);
        let mut gui = gui();

        let (report, output) = driver
            .run_frame(&mut backend, Some((&mut gui, RawInput::default())), (1200, 800), 1.0)
            .unwrap();

        assert_eq!(report.status, FrameStatus::Ready);
        assert_eq!(report.present, Some(PresentStatus::Presented));
        assert!(output.is_some());
        assert_eq!(
            backend.calls,
            vec![
                "begin_frame",
                "update_gui_textures",
                "draw_scene",
                "paint_gui",
                "end_frame",
                "free_gui_textures"
            ]
        );
        assert!(backend.uploaded > 0);
    }

    #[test]
    fn test_frame_without_gui() {
        let mut backend = MockBackend::default();
        let mut driver = driver(GeometryKind::Triangle);

        let (report, output) = driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();

        assert_eq!(report.present, Some(PresentStatus::Presented));
        assert!(output.is_none());
        assert_eq!(backend.calls, vec!["begin_frame", "draw_scene", "end_frame"]);
    }

    #[test]
    fn test_minimized_frame_still_builds_gui() {
        let mut backend = MockBackend::default();
        let mut driver = driver(GeometryKind::Cube);
        let mut gui = gui();

        let (report, output) = driver
            .run_frame(&mut backend, Some((&mut gui, RawInput::default())), (0, 0), 1.0)
            .unwrap();

        assert_eq!(report.status, FrameStatus::Skipped(SkipReason::Minimized));
        assert_eq!(report.present, None);
        assert!(output.is_some());
        assert_eq!(
            backend.calls,
            vec!["begin_frame", "update_gui_textures", "free_gui_textures"]
        );
    }

    #[test]
    fn test_outdated_present_rebuilds_on_next_frame() {
        let mut backend = MockBackend {
            present_results: VecDeque::from([Err(vk::Result::ERROR_OUT_OF_DATE_KHR)]),
            ..MockBackend::default()
        };
        let mut driver = driver(GeometryKind::None);

        let (first, _) = driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();
        assert_eq!(first.present, Some(PresentStatus::Outdated));
        assert!(backend.state.is_rebuild_pending());

        let (second, _) = driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();
        assert_eq!(second.status, FrameStatus::Ready);
        assert_eq!(second.present, Some(PresentStatus::Presented));
        assert_eq!(backend.state.rebuild_count(), 1);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    #[test]
    fn test_suboptimal_present_waits_for_visible_window() {
        let mut backend = MockBackend {
            present_results: VecDeque::from([Ok(true)]),
            ..MockBackend::default()
        };
        let mut driver = driver(GeometryKind::None);

        let (first, _) = driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();
        assert_eq!(first.present, Some(PresentStatus::Outdated));

        let (waiting, _) = driver.run_frame(&mut backend, None, (800, 0), 1.0).unwrap();
        assert_eq!(waiting.status, FrameStatus::Skipped(SkipReason::Minimized));
        assert!(backend.state.is_rebuild_pending());
        assert_eq!(backend.state.rebuild_count(), 0);

        let (resumed, _) = driver.run_frame(&mut backend, None, (1024, 768), 1.0).unwrap();
        assert_eq!(resumed.present, Some(PresentStatus::Presented));
        assert_eq!(backend.state.rebuild_count(), 1);
    }

    #[test]
    fn test_fatal_present_error_stops_the_frame() {
        let mut backend = MockBackend {
            present_results: VecDeque::from([Err(vk::Result::ERROR_DEVICE_LOST)]),
            ..MockBackend::default()
        };
        let mut driver = driver(GeometryKind::Triangle);

        assert!(driver.run_frame(&mut backend, None, (800, 600), 1.0).is_err());
    }

    #[test]
    fn test_each_resize_event_reaches_backend_once() {
        let mut backend = MockBackend::default();
        let events = [
            WindowEvent::Resized(PhysicalSize::new(1024, 768)),
            WindowEvent::Focused(true),
            WindowEvent::Resized(PhysicalSize::new(0, 0)),
            WindowEvent::Resized(PhysicalSize::new(1600, 900)),
        ];

        let forwarded = events
            .iter()
            .filter(|e| dispatch_window_event(&mut backend, e))
            .count();

        assert_eq!(forwarded, 3);
        assert_eq!(backend.resizes, vec![(1024, 768), (0, 0), (1600, 900)]);
    }

    #[test]
    fn test_cube_rotates_between_frames() {
        let mut backend = MockBackend::default();
        let mut driver = driver(GeometryKind::Cube);

        driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        driver.run_frame(&mut backend, None, (800, 600), 1.0).unwrap();

        assert!(driver.scene().angle() > 0.0);
    }
}
