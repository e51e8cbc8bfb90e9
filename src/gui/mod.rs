//! GUI 系统模块
//!
//! 基于 egui 实现的即时模式 GUI，两个图形后端共用：
//! - `context`：egui 上下文、控件树、细分
//! - `platform`：egui-winit 输入与平台输出
//! - `panels`：控制面板、自定义窗口、标准演示窗口、彩蛋弹窗
//!
//! GUI 的绘制由渲染后端完成（OpenGL 使用 egui-wgpu，Vulkan 使用自带的绘制器）。

pub mod context;
pub mod layout;
mod metrics;
pub mod panels;
mod platform;
mod state;
pub mod style;

pub use context::{FrameInfo, GuiContext, GuiFrameOutput};
pub use platform::GuiPlatform;
pub use state::GuiState;
