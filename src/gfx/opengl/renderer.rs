//! OpenGL 渲染器
//!
//! 每帧流程：
//!
//! ```text
//! begin_frame: 获取表面纹理 → 清屏 pass
//! draw_scene:  固定几何体 pass（可选）
//! paint_gui:   egui-wgpu 上传顶点 → GUI pass
//! end_frame:   提交命令 → present
//! ```
//!
//! 表面过期（Outdated/Lost）时立即重新配置并跳过本帧。

use std::sync::Arc;

use egui::epaint::{ClippedPrimitive, TextureId};
use egui::TexturesDelta;
use egui_wgpu::ScreenDescriptor;
use tracing::{info, warn};
use winit::window::Window;

use crate::core::config::{GraphicsBackend, GraphicsConfig};
use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::gfx::backend::GraphicsContext;
use crate::renderer::backend_trait::RenderBackend;
use crate::renderer::frame::{
    BackendInfo, FrameContext, FrameStatus, PresentStatus, SceneFrame, SkipReason,
};
use crate::renderer::scene::Scene;

use super::context::GlContext;
use super::scene::ScenePipeline;

/// 正在录制的一帧
struct ActiveFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    /// egui-wgpu 上传顶点时生成的额外命令
    gui_commands: Vec<wgpu::CommandBuffer>,
    size: (u32, u32),
}

/// OpenGL 渲染器
pub struct GlRenderer {
    gfx: Option<GlContext>,
    scene: Option<ScenePipeline>,
    gui: Option<egui_wgpu::Renderer>,
    frame: Option<ActiveFrame>,
    /// 表面为 suboptimal，present 之后重新配置
    reconfigure_pending: bool,
}

impl GlRenderer {
    /// 创建设备并为场景的固定几何体构建管线
    pub fn new(window: Arc<Window>, config: &GraphicsConfig, scene: &Scene) -> Result<Self> {
        let gfx = GlContext::new(window, config)?;

        let scene_pipeline = match scene.mesh() {
            Some(mesh) => Some(ScenePipeline::new(
                &gfx.device,
                gfx.surface_format(),
                &mesh,
                scene.geometry(),
            )?),
            None => None,
        };

        Ok(Self {
            gfx: Some(gfx),
            scene: scene_pipeline,
            gui: None,
            frame: None,
            reconfigure_pending: false,
        })
    }

    fn gfx(&self) -> Result<&GlContext> {
        self.gfx
            .as_ref()
            .ok_or_else(|| SandboxError::Runtime("The OpenGL backend has been shut down".to_string()))
    }

    fn gfx_mut(&mut self) -> Result<&mut GlContext> {
        self.gfx
            .as_mut()
            .ok_or_else(|| SandboxError::Runtime("The OpenGL backend has been shut down".to_string()))
    }
}

impl RenderBackend for GlRenderer {
    fn kind(&self) -> GraphicsBackend {
        GraphicsBackend::OpenGl
    }

    fn info(&self) -> BackendInfo {
        match &self.gfx {
            Some(gfx) => gfx.info(),
            None => BackendInfo {
                api: "OpenGL".to_string(),
                ..BackendInfo::default()
            },
        }
    }

    fn max_texture_side(&self) -> usize {
        self.gfx
            .as_ref()
            .map(|gfx| gfx.device.limits().max_texture_dimension_2d as usize)
            .unwrap_or(2048)
    }

    fn init_gui(&mut self) -> Result<()> {
        let gfx = self.gfx()?;
        let renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.surface_format(), None, 1);
        self.gui = Some(renderer);
        info!("egui renderer has been bound to the OpenGL backend");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gfx) = self.gfx.as_mut() {
            gfx.reconfigure_surface(width, height);
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
        let reconfigure = std::mem::take(&mut self.reconfigure_pending);
        let gfx = self.gfx_mut()?;
        if reconfigure || gfx.surface_size() != (width, height) {
            gfx.reconfigure_surface(width, height);
        }

        let surface_texture = match gfx.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                gfx.reconfigure_surface(width, height);
                return Ok(FrameStatus::Skipped(SkipReason::SwapchainOutOfDate));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out while acquiring the next surface texture");
                return Ok(FrameStatus::Skipped(SkipReason::Timeout));
            }
            Err(e) => {
                return Err(GraphicsError::SwapchainError(format!("Failed to acquire a surface texture: {}", e)).into());
            }
        };

        let suboptimal = surface_texture.suboptimal;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_color[0] as f64,
                            g: clear_color[1] as f64,
                            b: clear_color[2] as f64,
                            a: clear_color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.reconfigure_pending = suboptimal;
        self.frame = Some(ActiveFrame {
            surface_texture,
            view,
            encoder,
            gui_commands: Vec::new(),
            size: (width, height),
        });

        Ok(FrameStatus::Ready)
    }

    fn draw_scene(&mut self, scene: &SceneFrame) -> Result<()> {
        let (Some(gfx), Some(pipeline), Some(frame)) =
            (self.gfx.as_ref(), self.scene.as_mut(), self.frame.as_mut())
        else {
            return Ok(());
        };

        pipeline.draw(&gfx.device, &gfx.queue, &mut frame.encoder, &frame.view, frame.size, scene);
        Ok(())
    }

    fn update_gui_textures(&mut self, delta: &TexturesDelta) -> Result<()> {
        let (Some(gfx), Some(renderer)) = (self.gfx.as_ref(), self.gui.as_mut()) else {
            return Ok(());
        };

        for (id, image_delta) in &delta.set {
            renderer.update_texture(&gfx.device, &gfx.queue, *id, image_delta);
        }
        Ok(())
    }

    fn paint_gui(&mut self, primitives: &[ClippedPrimitive], pixels_per_point: f32) -> Result<()> {
        let (Some(gfx), Some(renderer), Some(frame)) =
            (self.gfx.as_ref(), self.gui.as_mut(), self.frame.as_mut())
        else {
            return Ok(());
        };

        let screen = ScreenDescriptor {
            size_in_pixels: [frame.size.0, frame.size.1],
            pixels_per_point,
        };

        let commands = renderer.update_buffers(&gfx.device, &gfx.queue, &mut frame.encoder, primitives, &screen);
        frame.gui_commands.extend(commands);

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        renderer.render(&mut pass, primitives, &screen);

        Ok(())
    }

    fn end_frame(&mut self) -> Result<PresentStatus> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| SandboxError::Runtime("end_frame called without begin_frame".to_string()))?;
        let gfx = self.gfx()?;

        let ActiveFrame { surface_texture, encoder, gui_commands, .. } = frame;
        gfx.queue
            .submit(gui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        surface_texture.present();

        if self.reconfigure_pending {
            Ok(PresentStatus::Outdated)
        } else {
            Ok(PresentStatus::Presented)
        }
    }

    fn free_gui_textures(&mut self, ids: &[TextureId]) -> Result<()> {
        if let Some(renderer) = self.gui.as_mut() {
            for id in ids {
                renderer.free_texture(id);
            }
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        if let Some(gfx) = self.gfx.as_ref() {
            let _ = gfx.device.poll(wgpu::Maintain::Wait);
        }
        Ok(())
    }

    fn shutdown_gui(&mut self) {
        if self.gui.take().is_some() {
            info!("egui renderer has been released");
        }
    }

    fn shutdown(&mut self) {
        self.frame = None;
        self.shutdown_gui();
        self.scene = None;
        if self.gfx.take().is_some() {
            info!("OpenGL backend has been shut down");
        }
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
