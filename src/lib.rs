//! gui_sandbox - 最小桌面沙盒
//!
//! 打开一个窗口，用 OpenGL（wgpu 的 GL 路径）或 Vulkan（ash）清屏，
//! 可选绘制一个三角形或旋转立方体，并在上面叠加 egui 控件。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（配置、场景、日志、错误处理、计时）
//! - `platform`: 窗口与输入泵（winit）
//! - `geometry`: 固定几何体（三角形、立方体）
//! - `renderer`: 统一渲染接口与帧状态
//! - `gfx`: 图形后端实现（OpenGL、Vulkan）
//! - `gui`: GUI 上下文、平台适配器和控件
//! - `app`: 启动、主循环和清理
//!
//! # 使用示例
//!
//! ```no_run
//! use gui_sandbox::app::{self, Variant};
//!
//! fn main() -> anyhow::Result<()> {
//!     app::run(Variant::Cube)
//! }
//! ```

pub mod app;
pub mod core;
pub mod geometry;
pub mod gfx;
pub mod gui;
pub mod platform;
pub mod renderer;
