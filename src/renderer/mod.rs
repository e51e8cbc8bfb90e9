//! 渲染器模块
//!
//! 本模块提供了统一的渲染接口，封装了两个图形 API 的具体实现。
//! 应用程序通过这个模块与底层图形 API（OpenGL、Vulkan）交互，
//! 而不需要关心具体使用的是哪个图形 API。
//!
//! # 架构设计
//!
//! - `Renderer`：统一的渲染器，对外实现 [`RenderBackend`]
//! - `Backend`：内部枚举，封装两个图形后端
//! - 底层实现在 `gfx` 模块中，按 API 分类组织

use std::sync::Arc;

use egui::epaint::{ClippedPrimitive, TextureId};
use egui::TexturesDelta;
use tracing::info;
use winit::window::Window;

use crate::core::config::{GraphicsBackend, GraphicsConfig};
use crate::core::error::Result;
use crate::gfx::opengl::GlRenderer;
use crate::gfx::vulkan::VulkanRenderer;

// 通用渲染组件（与具体 API 无关）
pub mod backend_trait;
pub mod frame;
pub mod scene;
pub mod sync;

pub use backend_trait::RenderBackend;
pub use frame::{BackendInfo, FrameContext, FrameStatus, PresentStatus, SceneFrame, SkipReason};
pub use scene::Scene;

/// 图形后端枚举
///
/// 启动时根据配置选择一个后端，之后不再切换。
enum Backend {
    OpenGl(GlRenderer),
    Vulkan(VulkanRenderer),
}

/// 统一的渲染器
pub struct Renderer {
    backend: Backend,
}

impl Renderer {
    /// 按配置创建后端
    pub fn new(window: Arc<Window>, config: &GraphicsConfig, scene: &Scene) -> Result<Self> {
        let backend = match config.backend {
            GraphicsBackend::OpenGl => {
                info!("Initializing OpenGL Backend");
                Backend::OpenGl(GlRenderer::new(window, config, scene)?)
            }
            GraphicsBackend::Vulkan => {
                info!("Initializing Vulkan Backend");
                Backend::Vulkan(VulkanRenderer::new(&window, config, scene)?)
            }
        };

        let renderer = Self { backend };
        info!("Graphics backend: {}", renderer.info().summary());
        Ok(renderer)
    }
}

impl RenderBackend for Renderer {
    fn kind(&self) -> GraphicsBackend {
        match &self.backend {
            Backend::OpenGl(r) => r.kind(),
            Backend::Vulkan(r) => r.kind(),
        }
    }

    fn info(&self) -> BackendInfo {
        match &self.backend {
            Backend::OpenGl(r) => r.info(),
            Backend::Vulkan(r) => r.info(),
        }
    }

    fn max_texture_side(&self) -> usize {
        match &self.backend {
            Backend::OpenGl(r) => r.max_texture_side(),
            Backend::Vulkan(r) => r.max_texture_side(),
        }
    }

    fn init_gui(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.init_gui(),
            Backend::Vulkan(r) => r.init_gui(),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        match &mut self.backend {
            Backend::OpenGl(r) => r.resize(width, height),
            Backend::Vulkan(r) => r.resize(width, height),
        }
    }

    fn begin_frame(&mut self, frame: &FrameContext, clear_color: [f32; 4]) -> Result<FrameStatus> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.begin_frame(frame, clear_color),
            Backend::Vulkan(r) => r.begin_frame(frame, clear_color),
        }
    }

    fn draw_scene(&mut self, scene: &SceneFrame) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.draw_scene(scene),
            Backend::Vulkan(r) => r.draw_scene(scene),
        }
    }

    fn update_gui_textures(&mut self, delta: &TexturesDelta) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.update_gui_textures(delta),
            Backend::Vulkan(r) => r.update_gui_textures(delta),
        }
    }

    fn paint_gui(&mut self, primitives: &[ClippedPrimitive], pixels_per_point: f32) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.paint_gui(primitives, pixels_per_point),
            Backend::Vulkan(r) => r.paint_gui(primitives, pixels_per_point),
        }
    }

    fn end_frame(&mut self) -> Result<PresentStatus> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.end_frame(),
            Backend::Vulkan(r) => r.end_frame(),
        }
    }

    fn free_gui_textures(&mut self, ids: &[TextureId]) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.free_gui_textures(ids),
            Backend::Vulkan(r) => r.free_gui_textures(ids),
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::OpenGl(r) => r.wait_idle(),
            Backend::Vulkan(r) => r.wait_idle(),
        }
    }

    fn shutdown_gui(&mut self) {
        match &mut self.backend {
            Backend::OpenGl(r) => r.shutdown_gui(),
            Backend::Vulkan(r) => r.shutdown_gui(),
        }
    }

    fn shutdown(&mut self) {
        match &mut self.backend {
            Backend::OpenGl(r) => r.shutdown(),
            Backend::Vulkan(r) => r.shutdown(),
        }
    }
}
