//! 图形后端模块
//!
//! 本模块封装了两个图形 API 的底层实现：
//! - OpenGL：通过 wgpu 的 GL 后端，GUI 由 egui-wgpu 绘制
//! - Vulkan：直接使用 ash，GUI 由本模块的绘制器绘制
//!
//! 两个后端都实现了 `renderer::backend_trait::RenderBackend`，
//! 着色器统一以 WGSL 编写，由 `shader` 模块校验或翻译。

pub mod backend;
pub mod opengl;
pub mod shader;
pub mod vulkan;

pub use backend::GraphicsContext;
pub use opengl::GlRenderer;
pub use vulkan::VulkanRenderer;
