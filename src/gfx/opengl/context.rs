//! OpenGL 设备管理
//!
//! 通过 wgpu 的 GL 后端（EGL/WGL）访问 OpenGL，负责：
//! - 创建只包含 GL 后端的 wgpu 实例
//! - 创建窗口表面
//! - 选择适配器并创建逻辑设备和命令队列
//! - 配置交换链（垂直同步时使用 Fifo）
//!
//! GL 函数指针的加载由 wgpu 的 GL HAL 在请求适配器时完成。

use std::sync::Arc;

use tracing::{debug, info};
use winit::window::Window;

use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::GraphicsContext;

/// OpenGL 设备上下文
pub struct GlContext {
    /// wgpu 实例（仅 GL 后端）
    pub instance: wgpu::Instance,
    /// 窗口表面，持有窗口的 `Arc`
    pub surface: wgpu::Surface<'static>,
    /// 图形适配器
    pub adapter: wgpu::Adapter,
    /// 逻辑设备
    pub device: wgpu::Device,
    /// 命令队列
    pub queue: wgpu::Queue,
    /// 表面配置
    pub surface_config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
}

impl GlContext {
    /// 创建 OpenGL 上下文
    ///
    /// 窗口尺寸为 0（最小化）时仍然可以创建，表面配置推迟到第一次非零的 `resize`。
    pub fn new(window: Arc<Window>, config: &GraphicsConfig) -> Result<Self> {
        info!("Initializing the OpenGL backend");

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        debug!("Creating surface");
        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| GraphicsError::Surface(format!("Failed to create surface: {}", e)))?;

        debug!("Requesting adapter");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            GraphicsError::AdapterUnavailable("No OpenGL adapter is compatible with the window".to_string())
        })?;

        let adapter_info = adapter.get_info();
        info!("OpenGL renderer: {}", adapter_info.name);
        info!("OpenGL driver: {} {}", adapter_info.driver, adapter_info.driver_info);

        debug!("Requesting device and queue");
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("OpenGL Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create device: {}", e)))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = select_surface_format(&surface_caps.formats).ok_or_else(|| {
            GraphicsError::Surface("The surface reports no supported formats".to_string())
        })?;
        debug!("Surface format: {:?}", surface_format);

        let present_mode = if config.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &surface_config);
        }

        info!("OpenGL backend initialized");

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_info,
        })
    }

    /// 重新配置表面，尺寸为 0 时忽略
    pub fn reconfigure_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// 表面当前尺寸
    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// 交换链格式
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }
}

impl GraphicsContext for GlContext {
    fn backend_name(&self) -> &str {
        "OpenGL"
    }

    fn device_name(&self) -> String {
        self.adapter_info.name.clone()
    }

    fn api_version(&self) -> String {
        if self.adapter_info.driver_info.is_empty() {
            self.adapter_info.driver.clone()
        } else {
            format!("{} {}", self.adapter_info.driver, self.adapter_info.driver_info)
        }
    }
}

/// 选择交换链格式
///
/// GUI 的顶点颜色是 gamma 空间的，优先选择非 sRGB 格式，
/// 这样清屏颜色和 GUI 颜色都按原样写入。
pub fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn test_prefers_linear_format() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(select_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(select_surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(select_surface_format(&[]), None);
    }
}
