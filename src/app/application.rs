//! 应用程序
//!
//! Application 拥有窗口、渲染后端、GUI 上下文与平台适配器、场景和循环状态，
//! 负责按顺序启动、运行主循环，并在离开主循环后按相反顺序清理。
//!
//! # 清理顺序
//!
//! ```text
//! 等待 GPU 空闲 → GUI 渲染适配器 → GUI 平台适配器 → GUI 上下文
//!     → 后端资源 → 窗口 → 事件循环
//! ```

use tracing::{error, info, warn};

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::paths;
use crate::core::scene::SceneConfig;
use crate::gui::{GuiContext, GuiPlatform};
use crate::platform::WindowProvider;
use crate::renderer::{RenderBackend, Renderer, Scene};

use super::frame::{self, FrameDriver};
use super::lifecycle::{LoopState, StartupSequence, StartupStage};

/// 应用程序
pub struct Application {
    window: WindowProvider,
    renderer: Option<Renderer>,
    gui: Option<GuiContext>,
    platform: Option<GuiPlatform>,
    driver: FrameDriver,
    loop_state: LoopState,
    torn_down: bool,
}

impl Application {
    /// 按 窗口 → 后端 → GUI 的顺序启动
    ///
    /// 任何一步失败都返回错误，已经创建的部分随之释放。
    pub fn new(config: &Config, scene: SceneConfig, with_gui: bool) -> Result<Self> {
        let mut startup = StartupSequence::new();

        let window = WindowProvider::create(&config.window, config.graphics.backend)?;
        startup.complete(StartupStage::Window)?;

        let scene = Scene::new(scene);
        let mut renderer = Renderer::new(window.window()?.clone(), &config.graphics, &scene)?;
        startup.complete(StartupStage::Backend)?;

        let (gui, platform) = if with_gui {
            renderer.init_gui()?;
            let dpi_scale = window.dpi_scale();
            let font_path = paths::executable_dir().join(&config.gui.font_file);
            let gui = GuiContext::new(&config.gui, &font_path, dpi_scale);
            let platform = GuiPlatform::new(gui.egui(), window.window()?, dpi_scale, renderer.max_texture_side());
            startup.complete(StartupStage::Gui)?;
            (Some(gui), Some(platform))
        } else {
            (None, None)
        };

        let driver = FrameDriver::new(scene, renderer.info().summary());
        info!("Startup complete: {:?}", startup.completed());

        Ok(Self {
            window,
            renderer: Some(renderer),
            gui,
            platform,
            driver,
            loop_state: LoopState::Running,
            torn_down: false,
        })
    }

    /// 运行主循环直到窗口关闭
    ///
    /// 致命错误会停止循环，清理照常进行，然后返回该错误。
    pub fn run(&mut self) -> Result<()> {
        info!("Entering main loop");

        while self.loop_state.is_running() {
            if let Err(e) = self.step() {
                error!("Fatal error in the frame loop: {}", e);
                self.loop_state.stop();
                self.teardown();
                return Err(e);
            }
        }

        self.teardown();
        Ok(())
    }

    /// 一次循环迭代：渲染一帧，然后轮询输入
    fn step(&mut self) -> Result<()> {
        let Self {
            window,
            renderer,
            gui,
            platform,
            driver,
            loop_state,
            ..
        } = self;

        let Some(renderer) = renderer.as_mut() else {
            loop_state.stop();
            return Ok(());
        };

        let framebuffer_size = window.framebuffer_size();
        let pixels_per_point = window.dpi_scale();

        let raw_input = match (platform.as_mut(), window.window()) {
            (Some(platform), Ok(w)) => Some(platform.take_input(w)),
            _ => None,
        };
        let gui_frame = gui.as_mut().zip(raw_input);

        let (_report, platform_output) =
            driver.run_frame(&mut *renderer, gui_frame, framebuffer_size, pixels_per_point)?;

        if let (Some(output), Some(platform), Ok(w)) = (platform_output, platform.as_mut(), window.window()) {
            platform.handle_output(w, output);
        }

        window.poll_events(|w, event| {
            if let Some(platform) = platform.as_mut() {
                platform.on_window_event(w, event);
            }
            frame::dispatch_window_event(&mut *renderer, event);
        });

        loop_state.observe_close(window.should_close());
        Ok(())
    }

    /// 按启动的相反顺序释放资源，重复调用是空操作
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        if !self.loop_state.can_teardown() {
            warn!("Tearing down while the main loop is still running");
        }
        self.torn_down = true;
        info!("Shutting down");

        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.wait_idle() {
                error!("Failed to wait for the device: {}", e);
            }
            renderer.shutdown_gui();
        }

        if self.platform.take().is_some() {
            info!("GUI platform adapter has been released");
        }
        if self.gui.take().is_some() {
            info!("GUI context has been destroyed");
        }

        if let Some(mut renderer) = self.renderer.take() {
            renderer.shutdown();
        }

        self.window.destroy_window();
        self.window.terminate();
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.loop_state.stop();
        self.teardown();
    }
}
