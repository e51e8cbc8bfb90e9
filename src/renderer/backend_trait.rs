//! 统一的渲染后端接口
//!
//! OpenGL（wgpu GL）与 Vulkan（ash）两个后端都实现此 trait。
//! 帧循环只通过这里的方法驱动后端，因此可以用测试替身代替真实设备。
//!
//! # 每帧调用顺序
//!
//! ```text
//! begin_frame → update_gui_textures → draw_scene → paint_gui → end_frame → free_gui_textures
//! ```
//!
//! `begin_frame` 返回 [`FrameStatus::Skipped`] 时，跳过 `draw_scene`、`paint_gui`
//! 和 `end_frame`，但纹理的上传与释放照常进行，保证 GUI 纹理状态与 egui 一致。

use egui::epaint::{ClippedPrimitive, TextureId};
use egui::TexturesDelta;

use crate::core::config::GraphicsBackend;
use crate::core::error::Result;

use super::frame::{BackendInfo, FrameContext, FrameStatus, PresentStatus, SceneFrame};

/// 统一的渲染后端接口
pub trait RenderBackend {
    /// 后端类型
    fn kind(&self) -> GraphicsBackend;

    /// 设备信息
    fn info(&self) -> BackendInfo;

    /// GUI 纹理的最大边长
    fn max_texture_side(&self) -> usize;

    /// 绑定 GUI 渲染适配器，必须在后端创建完成之后调用
    fn init_gui(&mut self) -> Result<()>;

    /// 窗口尺寸变化
    ///
    /// 每个 `Resized` 事件调用一次，参数为新的帧缓冲区尺寸。
    fn resize(&mut self, width: u32, height: u32);

    /// 开始一帧：获取交换链图像并用 `clear_color` 清屏
    fn begin_frame(&mut self, frame: &FrameContext, clear_color: [f32; 4]) -> Result<FrameStatus>;

    /// 绘制固定几何体，没有几何体管线的后端什么也不做
    fn draw_scene(&mut self, scene: &SceneFrame) -> Result<()>;

    /// 上传本帧新增或更新的 GUI 纹理
    fn update_gui_textures(&mut self, delta: &TexturesDelta) -> Result<()>;

    /// 绘制 GUI 三角形列表
    fn paint_gui(&mut self, primitives: &[ClippedPrimitive], pixels_per_point: f32) -> Result<()>;

    /// 提交命令并呈现
    fn end_frame(&mut self) -> Result<PresentStatus>;

    /// 释放本帧结束后不再使用的 GUI 纹理
    fn free_gui_textures(&mut self, ids: &[TextureId]) -> Result<()>;

    /// 等待 GPU 空闲
    fn wait_idle(&mut self) -> Result<()>;

    /// 释放 GUI 渲染适配器，之后 `paint_gui` 不再绘制任何内容
    fn shutdown_gui(&mut self);

    /// 释放所有后端资源，重复调用是空操作
    fn shutdown(&mut self);
}
