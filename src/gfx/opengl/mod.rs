//! OpenGL 后端
//!
//! 通过 wgpu 的 GL 后端实现光栅化路径：
//!
//! - `context`：实例、表面、适配器和设备
//! - `scene`：三角形 / 立方体管线
//! - `renderer`：实现 `RenderBackend`，GUI 使用 egui-wgpu 绘制

pub mod context;
pub mod renderer;
pub mod scene;

pub use context::GlContext;
pub use renderer::GlRenderer;
