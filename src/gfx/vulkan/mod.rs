//! Vulkan 后端
//!
//! 直接基于 ash 实现：
//! - `context`：实例、设备、队列、描述符池、窗口表面
//! - `swapchain`：交换链、帧槽、信号量和渲染通道
//! - `painter`：egui 的 Vulkan 绘制器
//! - `renderer`：实现 `RenderBackend` 的帧流程
//!
//! GUI 着色器以 WGSL 编写，启动时由 naga 翻译为 SPIR-V。

pub mod context;
pub mod painter;
pub mod renderer;
pub mod swapchain;

pub use context::VulkanContext;
pub use renderer::VulkanRenderer;
