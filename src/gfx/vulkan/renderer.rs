//! Vulkan 渲染器
//!
//! 每帧流程：
//!
//! ```text
//! begin_frame: 需要时重建交换链 → 获取图像 → 等待帧栅栏 → 录制命令，开始渲染通道（清屏）
//! paint_gui:   egui 绘制器录制 GUI 绘制命令
//! end_frame:   结束渲染通道 → 提交 → present → 信号量环前进
//! ```
//!
//! 获取或呈现返回 `ERROR_OUT_OF_DATE_KHR` 时只做标记，
//! 交换链在下一次帧缓冲区宽高都大于 0 的 `begin_frame` 中重建。

use ash::vk;
use egui::epaint::{ClippedPrimitive, TextureId};
use egui::TexturesDelta;
use tracing::{debug, info, warn};
use winit::window::Window;

use crate::core::config::{GraphicsBackend, GraphicsConfig};
use crate::core::error::{Result, SandboxError};
use crate::core::scene::GeometryKind;
use crate::gfx::backend::GraphicsContext;
use crate::renderer::backend_trait::RenderBackend;
use crate::renderer::frame::{
    BackendInfo, FrameContext, FrameStatus, PresentStatus, SceneFrame, SkipReason,
};
use crate::renderer::scene::Scene;
use crate::renderer::sync::{SemaphoreRing, SwapchainState};

use super::context::{vk_error, VulkanContext};
use super::painter::EguiPainter;
use super::swapchain::Swapchain;

/// 正在录制的一帧
#[derive(Debug, Clone, Copy)]
struct RecordingFrame {
    image_index: u32,
    semaphore_index: usize,
}

/// 获取交换链图像的超时（纳秒）
const ACQUIRE_TIMEOUT_NS: u64 = 1_000_000_000;

/// 等待重建的交换链在本帧的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildGate {
    /// 不需要重建
    Proceed,
    /// 帧缓冲区有一边为 0，继续等待
    Wait,
    /// 按当前尺寸重建
    Rebuild,
}

pub fn rebuild_gate(state: &SwapchainState, width: u32, height: u32) -> RebuildGate {
    if !state.is_rebuild_pending() {
        RebuildGate::Proceed
    } else if state.can_rebuild(width, height) {
        RebuildGate::Rebuild
    } else {
        RebuildGate::Wait
    }
}

/// `vkAcquireNextImageKHR` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// 图像已获取，本帧照常渲染；`rebuild` 为 true 时下一帧重建交换链
    Render { image_index: u32, rebuild: bool },
    /// 跳过本帧
    Skip { reason: SkipReason, rebuild: bool },
}

impl AcquireOutcome {
    pub fn needs_rebuild(&self) -> bool {
        match *self {
            AcquireOutcome::Render { rebuild, .. } | AcquireOutcome::Skip { rebuild, .. } => rebuild,
        }
    }
}

/// 把获取图像的返回值映射为本帧的处理方式，其他错误码是致命错误
pub fn classify_acquire(result: std::result::Result<(u32, bool), vk::Result>) -> Result<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Render {
            image_index,
            rebuild: suboptimal,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Skip {
            reason: SkipReason::SwapchainOutOfDate,
            rebuild: true,
        }),
        Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => Ok(AcquireOutcome::Skip {
            reason: SkipReason::Timeout,
            rebuild: false,
        }),
        Err(e) => Err(vk_error("vkAcquireNextImageKHR")(e)),
    }
}

/// `vkQueuePresentKHR` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentOutcome {
    pub status: PresentStatus,
    /// 图像已经交给呈现引擎，信号量环前进
    pub advance_ring: bool,
}

impl PresentOutcome {
    pub fn needs_rebuild(&self) -> bool {
        self.status == PresentStatus::Outdated
    }
}

/// 把呈现的返回值映射为呈现结果，OUT_OF_DATE 和 SUBOPTIMAL 都要求重建
pub fn classify_present(result: std::result::Result<bool, vk::Result>) -> Result<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome {
            status: PresentStatus::Presented,
            advance_ring: true,
        }),
        Ok(true) => Ok(PresentOutcome {
            status: PresentStatus::Outdated,
            advance_ring: true,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome {
            status: PresentStatus::Outdated,
            advance_ring: false,
        }),
        Err(e) => Err(vk_error("vkQueuePresentKHR")(e)),
    }
}

/// 清理阶段的失败只记录警告，返回是否失败
fn warn_on_error(action: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            warn!("Failed to {}: {}", action, e);
            true
        }
    }
}

/// 清屏颜色按 alpha 预乘
pub fn premultiplied_clear_color(color: [f32; 4]) -> [f32; 4] {
    let a = color[3];
    [color[0] * a, color[1] * a, color[2] * a, a]
}

/// Vulkan 渲染器
pub struct VulkanRenderer {
    ctx: Option<VulkanContext>,
    swapchain: Option<Swapchain>,
    painter: Option<EguiPainter>,
    state: SwapchainState,
    ring: SemaphoreRing,
    frame: Option<RecordingFrame>,
    max_texture_side: usize,
}

impl VulkanRenderer {
    /// 创建设备和交换链
    ///
    /// 窗口尺寸为 0 时交换链推迟到第一次可见的帧再创建。
    pub fn new(window: &Window, config: &GraphicsConfig, scene: &Scene) -> Result<Self> {
        let ctx = VulkanContext::new(window)?;

        let limits = unsafe { ctx.instance.get_physical_device_properties(ctx.physical_device) }.limits;
        let max_texture_side = limits.max_image_dimension2_d as usize;

        let size = window.inner_size();
        let swapchain = Swapchain::new(&ctx, size.width, size.height, config.vsync, config.min_image_count)?;

        let mut state = SwapchainState::new();
        if !swapchain.is_ready() {
            state.mark_out_of_date();
        }
        let ring = SemaphoreRing::new(swapchain.image_count());

        if scene.geometry() != GeometryKind::None {
            warn!(
                "The Vulkan backend does not draw scene geometry, the {:?} will not be shown",
                scene.geometry()
            );
        }

        Ok(Self {
            ctx: Some(ctx),
            swapchain: Some(swapchain),
            painter: None,
            state,
            ring,
            frame: None,
            max_texture_side,
        })
    }

    /// 已完成的交换链重建次数
    pub fn rebuild_count(&self) -> u64 {
        self.state.rebuild_count()
    }

    fn parts(&self) -> Result<(&VulkanContext, &Swapchain)> {
        match (self.ctx.as_ref(), self.swapchain.as_ref()) {
            (Some(ctx), Some(swapchain)) => Ok((ctx, swapchain)),
            _ => Err(SandboxError::Runtime("The Vulkan backend has been shut down".to_string())),
        }
    }

    fn rebuild_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        let (Some(ctx), Some(swapchain)) = (self.ctx.as_ref(), self.swapchain.as_mut()) else {
            return Err(SandboxError::Runtime("The Vulkan backend has been shut down".to_string()));
        };
        swapchain.create_or_resize(ctx, width, height)?;
        self.ring.reset(swapchain.image_count());
        self.state.finish_rebuild();
        debug!("Swapchain rebuilt ({} so far)", self.state.rebuild_count());
        Ok(())
    }
}

impl RenderBackend for VulkanRenderer {
    fn kind(&self) -> GraphicsBackend {
        GraphicsBackend::Vulkan
    }

    fn info(&self) -> BackendInfo {
        match &self.ctx {
            Some(ctx) => ctx.info(),
            None => BackendInfo {
                api: "Vulkan".to_string(),
                ..BackendInfo::default()
            },
        }
    }

    fn max_texture_side(&self) -> usize {
        self.max_texture_side
    }

    fn init_gui(&mut self) -> Result<()> {
        let (ctx, swapchain) = self.parts()?;
        let painter = EguiPainter::new(ctx, swapchain.render_pass)?;
        self.painter = Some(painter);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let current = self.swapchain.as_ref().map(|s| (s.extent.width, s.extent.height));
        if current != Some((width, height)) {
            self.state.mark_out_of_date();
        }
    }

    fn begin_frame(&mut self, frame: &FrameContext, clear_color: [f32; 4]) -> Result<FrameStatus> {
        if self.frame.is_some() {
            return Err(SandboxError::Runtime("begin_frame called twice without end_frame".to_string()));
        }
        if frame.is_minimized() {
            return Ok(FrameStatus::Skipped(SkipReason::Minimized));
        }

        let (width, height) = frame.framebuffer_size;
        match rebuild_gate(&self.state, width, height) {
            RebuildGate::Proceed => {}
            RebuildGate::Wait => return Ok(FrameStatus::Skipped(SkipReason::SwapchainOutOfDate)),
            RebuildGate::Rebuild => self.rebuild_swapchain(width, height)?,
        }

        let semaphore_index = self.ring.current();
        let (ctx, swapchain) = self.parts()?;
        if !swapchain.is_ready() {
            self.state.mark_out_of_date();
            return Ok(FrameStatus::Skipped(SkipReason::SwapchainOutOfDate));
        }

        let image_acquired = swapchain.semaphores[semaphore_index].image_acquired;
        let acquired = unsafe {
            swapchain
                .loader
                .acquire_next_image(swapchain.handle, ACQUIRE_TIMEOUT_NS, image_acquired, vk::Fence::null())
        };

        let outcome = classify_acquire(acquired)?;
        let image_index = match outcome {
            AcquireOutcome::Render { image_index, .. } => image_index,
            AcquireOutcome::Skip { reason, rebuild } => {
                if rebuild {
                    self.state.mark_out_of_date();
                }
                return Ok(FrameStatus::Skipped(reason));
            }
        };

        let device = &ctx.device;
        let slot = &swapchain.frames[image_index as usize];
        let extent = swapchain.extent;
        let render_pass = swapchain.render_pass;

        unsafe {
            device
                .wait_for_fences(&[slot.fence], true, u64::MAX)
                .map_err(vk_error("vkWaitForFences"))?;
            device
                .reset_fences(&[slot.fence])
                .map_err(vk_error("vkResetFences"))?;
            device
                .reset_command_pool(slot.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(vk_error("vkResetCommandPool"))?;

            let begin_info =
                vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(slot.command_buffer, &begin_info)
                .map_err(vk_error("vkBeginCommandBuffer"))?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: premultiplied_clear_color(clear_color),
                },
            }];
            let pass_info = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass)
                .framebuffer(slot.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(slot.command_buffer, &pass_info, vk::SubpassContents::INLINE);
        }

        // 图像已经获取，本帧照常渲染，下一帧再重建
        if outcome.needs_rebuild() {
            self.state.mark_out_of_date();
        }

        self.frame = Some(RecordingFrame {
            image_index,
            semaphore_index,
        });
        Ok(FrameStatus::Ready)
    }

    fn draw_scene(&mut self, _scene: &SceneFrame) -> Result<()> {
        Ok(())
    }

    fn update_gui_textures(&mut self, delta: &TexturesDelta) -> Result<()> {
        let Some(painter) = self.painter.as_mut() else {
            return Ok(());
        };
        for (id, image_delta) in &delta.set {
            painter.set_texture(*id, image_delta)?;
        }
        Ok(())
    }

    fn paint_gui(&mut self, primitives: &[ClippedPrimitive], pixels_per_point: f32) -> Result<()> {
        let (Some(frame), Some(swapchain), Some(painter)) =
            (self.frame, self.swapchain.as_ref(), self.painter.as_mut())
        else {
            return Ok(());
        };

        let slot = frame.image_index as usize;
        let cmd = swapchain.frames[slot].command_buffer;
        painter.paint(cmd, slot, swapchain.extent, primitives, pixels_per_point)
    }

    fn end_frame(&mut self) -> Result<PresentStatus> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| SandboxError::Runtime("end_frame called without begin_frame".to_string()))?;
        let (ctx, swapchain) = self.parts()?;
        let device = &ctx.device;

        let slot = &swapchain.frames[frame.image_index as usize];
        let semaphores = &swapchain.semaphores[frame.semaphore_index];

        unsafe {
            device.cmd_end_render_pass(slot.command_buffer);
            device
                .end_command_buffer(slot.command_buffer)
                .map_err(vk_error("vkEndCommandBuffer"))?;

            let wait_semaphores = [semaphores.image_acquired];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let command_buffers = [slot.command_buffer];
            let signal_semaphores = [semaphores.render_complete];
            let submit = vk::SubmitInfo::builder()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores)
                .build();
            device
                .queue_submit(ctx.queue, &[submit], slot.fence)
                .map_err(vk_error("vkQueueSubmit"))?;
        }

        let swapchains = [swapchain.handle];
        let image_indices = [frame.image_index];
        let present_wait = [semaphores.render_complete];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&present_wait)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = unsafe { swapchain.loader.queue_present(ctx.queue, &present_info) };
        let outcome = classify_present(presented)?;
        if outcome.advance_ring {
            self.ring.advance();
        }
        if outcome.needs_rebuild() {
            self.state.mark_out_of_date();
        }
        Ok(outcome.status)
    }

    fn free_gui_textures(&mut self, ids: &[TextureId]) -> Result<()> {
        if let Some(painter) = self.painter.as_mut() {
            for id in ids {
                painter.free_texture(*id);
            }
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        match self.ctx.as_ref() {
            Some(ctx) => ctx.wait_idle(),
            None => Ok(()),
        }
    }

    fn shutdown_gui(&mut self) {
        if let Some(mut painter) = self.painter.take() {
            if let Some(ctx) = self.ctx.as_ref() {
                warn_on_error("wait for the device before releasing the painter", ctx.wait_idle());
            }
            let textures = painter.texture_count();
            painter.destroy();
            info!("egui painter has been released ({} textures)", textures);
        }
    }

    fn shutdown(&mut self) {
        self.frame = None;
        self.shutdown_gui();

        let Some(mut ctx) = self.ctx.take() else {
            return;
        };
        warn_on_error("wait for the device before shutdown", ctx.wait_idle());
        if let Some(mut swapchain) = self.swapchain.take() {
            swapchain.destroy(&ctx.device);
            debug!("Swapchain has been destroyed");
        }
        ctx.destroy();
        info!("Vulkan backend has been shut down");
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GraphicsError;

    #[test]
    fn test_clear_color_is_premultiplied() {
        let color = premultiplied_clear_color([0.2, 0.4, 0.6, 0.5]);
        assert!((color[0] - 0.1).abs() < 1e-6);
        assert!((color[1] - 0.2).abs() < 1e-6);
        assert!((color[2] - 0.3).abs() < 1e-6);
        assert_eq!(color[3], 0.5);
    }

    fn api_call(err: SandboxError) -> (&'static str, String) {
        match err {
            SandboxError::Graphics(GraphicsError::ApiCall { call, code }) => (call, code),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_acquire_success_renders() {
        let outcome = classify_acquire(Ok((1, false))).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Render {
                image_index: 1,
                rebuild: false
            }
        );
        assert!(!outcome.needs_rebuild());
    }

    #[test]
    fn test_suboptimal_acquire_renders_then_rebuilds() {
        let outcome = classify_acquire(Ok((2, true))).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Render {
                image_index: 2,
                rebuild: true
            }
        );
        assert!(outcome.needs_rebuild());
    }

    #[test]
    fn test_out_of_date_acquire_skips_and_rebuilds() {
        let outcome = classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Skip {
                reason: SkipReason::SwapchainOutOfDate,
                rebuild: true
            }
        );
    }

    #[test]
    fn test_acquire_timeout_skips_without_rebuild() {
        for code in [vk::Result::TIMEOUT, vk::Result::NOT_READY] {
            let outcome = classify_acquire(Err(code)).unwrap();
            assert_eq!(
                outcome,
                AcquireOutcome::Skip {
                    reason: SkipReason::Timeout,
                    rebuild: false
                }
            );
        }
    }

    #[test]
    fn test_acquire_device_lost_is_fatal() {
        let err = classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)).unwrap_err();
        let (call, code) = api_call(err);
        assert_eq!(call, "vkAcquireNextImageKHR");
        assert!(code.contains("DEVICE_LOST"));
    }

    #[test]
    fn test_present_results() {
        let presented = classify_present(Ok(false)).unwrap();
        assert_eq!(presented.status, PresentStatus::Presented);
        assert!(presented.advance_ring);
        assert!(!presented.needs_rebuild());

        let suboptimal = classify_present(Ok(true)).unwrap();
        assert_eq!(suboptimal.status, PresentStatus::Outdated);
        assert!(suboptimal.advance_ring);
        assert!(suboptimal.needs_rebuild());

        let out_of_date = classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(out_of_date.status, PresentStatus::Outdated);
        assert!(!out_of_date.advance_ring);
        assert!(out_of_date.needs_rebuild());
    }

    #[test]
    fn test_present_surface_lost_is_fatal() {
        let err = classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).unwrap_err();
        let (call, _) = api_call(err);
        assert_eq!(call, "vkQueuePresentKHR");
    }

    #[test]
    fn test_rebuild_waits_while_minimized() {
        let mut state = SwapchainState::new();
        assert_eq!(rebuild_gate(&state, 800, 600), RebuildGate::Proceed);

        if classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap().needs_rebuild() {
            state.mark_out_of_date();
        }
        assert_eq!(rebuild_gate(&state, 0, 600), RebuildGate::Wait);
        assert_eq!(rebuild_gate(&state, 800, 0), RebuildGate::Wait);
        assert_eq!(rebuild_gate(&state, 800, 600), RebuildGate::Rebuild);

        state.finish_rebuild();
        assert_eq!(rebuild_gate(&state, 800, 600), RebuildGate::Proceed);
        assert_eq!(state.rebuild_count(), 1);
    }

    #[test]
    fn test_teardown_failure_is_reported() {
        assert!(!warn_on_error("wait for the device", Ok(())));
        let lost = classify_present(Err(vk::Result::ERROR_DEVICE_LOST)).map(|_| ());
        assert!(warn_on_error("wait for the device", lost));
    }

    #[test]
    fn test_opaque_clear_color_is_unchanged() {
        let color = [0.45, 0.55, 0.60, 1.0];
        assert_eq!(premultiplied_clear_color(color), color);
    }
}
