//! 每帧数据
//!
//! 帧循环每次迭代重新计算 [`FrameContext`]，并把它交给渲染后端和 GUI。

use std::time::Duration;

use crate::core::clock::FrameTiming;
use crate::core::scene::GeometryKind;

/// 一次循环迭代的上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// 帧缓冲区尺寸（物理像素）
    pub framebuffer_size: (u32, u32),
    /// 每个逻辑点对应的物理像素数
    pub pixels_per_point: f32,
    /// 自启动以来的时间
    pub elapsed: Duration,
    /// 距上一帧的时间
    pub delta: Duration,
    /// 帧序号
    pub frame_index: u64,
}

impl FrameContext {
    pub fn new(framebuffer_size: (u32, u32), pixels_per_point: f32, timing: FrameTiming) -> Self {
        Self {
            framebuffer_size,
            pixels_per_point,
            elapsed: timing.elapsed,
            delta: timing.delta,
            frame_index: timing.frame_index,
        }
    }

    /// 窗口最小化时帧缓冲区为 0
    pub fn is_minimized(&self) -> bool {
        self.framebuffer_size.0 == 0 || self.framebuffer_size.1 == 0
    }

    /// 宽高比，最小化时为 1
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_minimized() {
            1.0
        } else {
            self.framebuffer_size.0 as f32 / self.framebuffer_size.1 as f32
        }
    }
}

/// `begin_frame` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// 已开始录制，可以绘制
    Ready,
    /// 本帧跳过渲染
    Skipped(SkipReason),
}

/// 跳过渲染的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 窗口最小化
    Minimized,
    /// 交换链需要重建
    SwapchainOutOfDate,
    /// 获取图像超时
    Timeout,
}

/// `end_frame` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// 已呈现
    Presented,
    /// 呈现时发现交换链过期，下一帧会重建
    Outdated,
}

/// 固定几何体的每帧参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFrame {
    pub geometry: GeometryKind,
    /// 列主序 MVP 矩阵；三角形为单位矩阵
    pub mvp: [[f32; 4]; 4],
}

/// 后端信息，用于日志和控制面板
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendInfo {
    /// 后端名称，例如 "OpenGL"
    pub api: String,
    /// 设备名称
    pub device: String,
    /// 驱动或 API 版本
    pub version: String,
}

impl BackendInfo {
    /// 控制面板中显示的一行文本
    pub fn summary(&self) -> String {
        format!("{} on {} ({})", self.api, self.device, self.version)
    }
}
