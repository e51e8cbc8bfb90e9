//! 图形设备上下文的统一接口
//!
//! 两个后端的设备上下文（`GlContext`、`VulkanContext`）都实现此 trait，
//! 用于启动日志和控制面板中的设备信息。

use crate::renderer::frame::BackendInfo;

/// 图形设备上下文
pub trait GraphicsContext {
    /// 后端名称（如 "OpenGL"、"Vulkan"）
    fn backend_name(&self) -> &str;

    /// 设备名称
    fn device_name(&self) -> String;

    /// 驱动或 API 版本
    fn api_version(&self) -> String;

    /// 汇总信息
    fn info(&self) -> BackendInfo {
        BackendInfo {
            api: self.backend_name().to_string(),
            device: self.device_name(),
            version: self.api_version(),
        }
    }
}
