//! 窗口与输入
//!
//! 基于 winit 的 `pump_events` 实现非阻塞的事件泵：每帧调用一次
//! [`WindowProvider::poll_events`]，取完当前排队的事件立即返回，
//! 这样主循环可以保持“渲染 → 轮询”的线性结构。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use crate::core::config::{GraphicsBackend, WindowConfig};
use crate::core::error::{Result, SandboxError};

/// 窗口提供者
///
/// 拥有事件循环和主窗口。窗口以 `Arc` 共享给 wgpu 表面和 GUI 平台适配器，
/// 但销毁顺序由应用程序控制：后端先于窗口释放。
pub struct WindowProvider {
    window: Option<Arc<Window>>,
    event_loop: Option<EventLoop<()>>,
    dpi_scale: f32,
    close_requested: bool,
}

impl WindowProvider {
    /// 创建事件循环和主窗口
    pub fn create(config: &WindowConfig, backend: GraphicsBackend) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| {
            error!("Couldn't initialize the event loop: {}", e);
            SandboxError::Window(format!("Couldn't initialize the event loop: {}", e))
        })?;
        info!("winit event loop has been initialized");

        let window = WindowBuilder::new()
            .with_title(format!("{} ({})", config.title, backend.name()))
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_position(LogicalPosition::new(config.position[0], config.position[1]))
            .with_resizable(config.resizable)
            .build(&event_loop)
            .map_err(|e| {
                error!("Couldn't create a window: {}", e);
                SandboxError::Window(format!("Couldn't create a window: {}", e))
            })?;

        let dpi_scale = config.dpi_scale.unwrap_or(window.scale_factor() as f32);
        info!("DPI scale factor: {}", dpi_scale);

        let min_size = scaled_min_size(config.min_size, dpi_scale);
        window.set_min_inner_size(Some(PhysicalSize::new(min_size[0], min_size[1])));

        let size = window.inner_size();
        info!("Window has been created: {}x{}", size.width, size.height);

        Ok(Self {
            window: Some(Arc::new(window)),
            event_loop: Some(event_loop),
            dpi_scale,
            close_requested: false,
        })
    }

    /// 主窗口
    pub fn window(&self) -> Result<&Arc<Window>> {
        self.window
            .as_ref()
            .ok_or_else(|| SandboxError::Window("The window has already been destroyed".to_string()))
    }

    /// 创建窗口时确定的 DPI 缩放系数
    pub fn dpi_scale(&self) -> f32 {
        self.dpi_scale
    }

    /// 当前帧缓冲区尺寸（物理像素），窗口已销毁时为 (0, 0)
    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    /// 是否收到了关闭请求
    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    /// 取出所有排队的事件，不阻塞
    ///
    /// 回调依次收到每个属于主窗口的事件，`Resized` 也是通过这里同步转发的。
    pub fn poll_events<F>(&mut self, mut on_event: F)
    where
        F: FnMut(&Window, &WindowEvent),
    {
        let (Some(window), Some(event_loop)) = (self.window.as_ref(), self.event_loop.as_mut()) else {
            self.close_requested = true;
            return;
        };

        let close_requested = &mut self.close_requested;
        let status = event_loop.pump_events(Some(Duration::ZERO), |event, _target| {
            if let Event::WindowEvent { window_id, event } = event {
                if window_id != window.id() {
                    return;
                }
                if matches!(event, WindowEvent::CloseRequested) {
                    *close_requested = true;
                }
                on_event(&**window, &event);
            }
        });

        if let PumpStatus::Exit(code) = status {
            info!("Event loop exited with code {}", code);
            self.close_requested = true;
        }
    }

    /// 销毁窗口，之后再调用是空操作
    pub fn destroy_window(&mut self) {
        if let Some(window) = self.window.take() {
            if Arc::strong_count(&window) > 1 {
                tracing::warn!("The window is still referenced elsewhere while being destroyed");
            }
            drop(window);
            info!("Window has been destroyed");
        }
    }

    /// 关闭事件循环（输入系统），必须在窗口销毁之后调用
    pub fn terminate(&mut self) {
        self.destroy_window();
        if self.event_loop.take().is_some() {
            info!("Event loop has been terminated");
        }
    }
}

impl Drop for WindowProvider {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// 最小窗口尺寸乘以 DPI 缩放系数
pub fn scaled_min_size(min_size: [u32; 2], dpi_scale: f32) -> [u32; 2] {
    [
        (min_size[0] as f32 * dpi_scale).round() as u32,
        (min_size[1] as f32 * dpi_scale).round() as u32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_size_scaling() {
        assert_eq!(scaled_min_size([900, 500], 1.0), [900, 500]);
        assert_eq!(scaled_min_size([900, 500], 1.5), [1350, 750]);
        assert_eq!(scaled_min_size([900, 500], 2.0), [1800, 1000]);
    }
}
