//! 应用程序层
//!
//! 四个入口程序共用同一套启动、主循环和清理流程，只在后端、固定几何体和
//! 是否显示 GUI 上有区别，见 [`Variant`]。
//!
//! # 初始化流程
//!
//! 1. 打印 Start 横幅
//! 2. 加载引擎配置（config.toml），应用命令行参数并校验
//! 3. 初始化日志系统
//! 4. 加载场景配置（scene.toml）
//! 5. 创建窗口、渲染后端和 GUI
//! 6. 运行主循环，清理，打印 Quit 横幅

pub mod application;
pub mod frame;
pub mod lifecycle;

use anyhow::Context;
use tracing::info;

use crate::core::clock;
use crate::core::config::{Config, GraphicsBackend};
use crate::core::log;
use crate::core::scene::{GeometryKind, SceneConfig};

pub use application::Application;

/// 入口程序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// OpenGL，只有一个三角形
    Triangle,
    /// OpenGL，只有 GUI
    GuiPanel,
    /// OpenGL，旋转的立方体加 GUI
    Cube,
    /// 后端由配置决定，三角形加 GUI
    Sandbox,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Triangle => "triangle",
            Variant::GuiPanel => "gui_panel",
            Variant::Cube => "cube",
            Variant::Sandbox => "gui_sandbox",
        }
    }

    pub fn has_gui(&self) -> bool {
        !matches!(self, Variant::Triangle)
    }

    /// 教学入口固定使用 OpenGL，主入口保留配置中的选择
    pub fn apply_to_config(&self, config: &mut Config) {
        if *self != Variant::Sandbox {
            config.graphics.backend = GraphicsBackend::OpenGl;
        }
    }

    /// 教学入口固定几何体，主入口使用 scene.toml 中的选择
    pub fn apply_to_scene(&self, scene: &mut SceneConfig) {
        match self {
            Variant::Triangle => scene.geometry = GeometryKind::Triangle,
            Variant::GuiPanel => scene.geometry = GeometryKind::None,
            Variant::Cube => scene.geometry = GeometryKind::Cube,
            Variant::Sandbox => {}
        }
    }
}

/// 运行一个入口程序
///
/// 启动失败或主循环中的致命错误都以 `Err` 返回，调用方据此返回非零退出码。
pub fn run(variant: Variant) -> anyhow::Result<()> {
    clock::print_banner("Start");
    let result = run_variant(variant);
    clock::print_banner("Quit");
    result
}

fn run_variant(variant: Variant) -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args());
    variant.apply_to_config(&mut config);
    config.validate().context("Invalid configuration")?;

    // 2. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("Failed to initialize logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), variant = variant.name(), "Application starting");

    // 3. 加载场景配置
    let mut scene = SceneConfig::from_file_or_default("scene.toml");
    variant.apply_to_scene(&mut scene);
    scene.validate().context("Invalid scene configuration")?;

    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        geometry = ?scene.geometry,
        "Graphics configuration"
    );

    // 4. 启动并运行
    let mut app = Application::new(&config, scene, variant.has_gui()).context("Startup failed")?;
    app.run().context("The frame loop stopped with an error")?;

    info!("Clean shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutorial_variants_force_opengl() {
        for variant in [Variant::Triangle, Variant::GuiPanel, Variant::Cube] {
            let mut config = Config::default();
            config.graphics.backend = GraphicsBackend::Vulkan;
            variant.apply_to_config(&mut config);
            assert_eq!(config.graphics.backend, GraphicsBackend::OpenGl, "{}", variant.name());
        }

        let mut config = Config::default();
        config.graphics.backend = GraphicsBackend::Vulkan;
        Variant::Sandbox.apply_to_config(&mut config);
        assert_eq!(config.graphics.backend, GraphicsBackend::Vulkan);
    }

    #[test]
    fn test_variant_geometry_and_gui() {
        let cases = [
            (Variant::Triangle, GeometryKind::Triangle, false),
            (Variant::GuiPanel, GeometryKind::None, true),
            (Variant::Cube, GeometryKind::Cube, true),
        ];
        for (variant, geometry, gui) in cases {
            let mut scene = SceneConfig::default();
            variant.apply_to_scene(&mut scene);
            assert_eq!(scene.geometry, geometry);
            assert_eq!(variant.has_gui(), gui);
        }

        let mut scene = SceneConfig::default();
        scene.geometry = GeometryKind::Cube;
        Variant::Sandbox.apply_to_scene(&mut scene);
        assert_eq!(scene.geometry, GeometryKind::Cube);
    }
}
