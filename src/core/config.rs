//! 配置管理模块
//!
//! 提供沙盒程序配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1200
//! height = 800
//! title = "winit and egui"
//! resizable = true
//!
//! [graphics]
//! backend = "opengl"  # 或 "vulkan"
//! vsync = true
//! min_image_count = 2
//!
//! [gui]
//! font_file = "JetBrainsMono-ExtraLight.ttf"
//! font_size = 24.0
//!
//! [gui.layout]
//! popup_threshold = 9
//! min_panel_width = 300.0
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 沙盒配置
///
/// 包含了窗口、图形后端、GUI 和日志的所有配置项。
/// 缺失的字段使用默认值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// GUI 配置
    #[serde(default)]
    pub gui: GuiConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度（逻辑像素）
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度（逻辑像素）
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,

    /// 窗口初始位置
    #[serde(default = "default_position")]
    pub position: [i32; 2],

    /// 最小尺寸，创建窗口后乘以 DPI 缩放系数
    #[serde(default = "default_min_size")]
    pub min_size: [u32; 2],

    /// DPI 缩放系数覆盖值，未设置时从显示器查询
    #[serde(default)]
    pub dpi_scale: Option<f32>,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 交换链最少图像数
    #[serde(default = "default_min_image_count")]
    pub min_image_count: u32,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// 光栅化后端（wgpu 的 OpenGL 路径）
    OpenGl,
    /// 显式 Vulkan 后端（ash）
    Vulkan,
}

/// GUI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuiConfig {
    /// 字体文件名，相对于可执行文件所在目录
    #[serde(default = "default_font_file")]
    pub font_file: String,

    /// 字体大小（点）
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// 控件布局常量
    #[serde(default)]
    pub layout: GuiLayoutConfig,
}

/// GUI 布局常量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuiLayoutConfig {
    /// 计数器达到该值时弹出彩蛋窗口
    #[serde(default = "default_popup_threshold")]
    pub popup_threshold: u32,

    /// 控制面板最小宽度
    #[serde(default = "default_min_panel_width")]
    pub min_panel_width: f32,

    /// 控制面板到窗口边缘的距离
    #[serde(default = "default_margin")]
    pub margin: f32,

    /// 控制面板背景不透明度
    #[serde(default = "default_background_alpha")]
    pub background_alpha: f32,

    /// 自定义窗口的默认尺寸
    #[serde(default = "default_custom_window_size")]
    pub custom_window_size: [f32; 2],
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1200 }
fn default_height() -> u32 { 800 }
fn default_title() -> String { "winit and egui".to_string() }
fn default_resizable() -> bool { true }
fn default_position() -> [i32; 2] { [100, 100] }
fn default_min_size() -> [u32; 2] { [900, 500] }
fn default_backend() -> GraphicsBackend { GraphicsBackend::OpenGl }
fn default_vsync() -> bool { true }
fn default_min_image_count() -> u32 { 2 }
fn default_font_file() -> String { "JetBrainsMono-ExtraLight.ttf".to_string() }
fn default_font_size() -> f32 { 24.0 }
fn default_popup_threshold() -> u32 { 9 }
fn default_min_panel_width() -> f32 { 300.0 }
fn default_margin() -> f32 { 10.0 }
fn default_background_alpha() -> f32 { 0.7 }
fn default_custom_window_size() -> [f32; 2] { [250.0, 150.0] }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "gui_sandbox.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
            position: default_position(),
            min_size: default_min_size(),
            dpi_scale: None,
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            min_image_count: default_min_image_count(),
        }
    }
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            font_file: default_font_file(),
            font_size: default_font_size(),
            layout: GuiLayoutConfig::default(),
        }
    }
}

impl Default for GuiLayoutConfig {
    fn default() -> Self {
        Self {
            popup_threshold: default_popup_threshold(),
            min_panel_width: default_min_panel_width(),
            margin: default_margin(),
            background_alpha: default_background_alpha(),
            custom_window_size: default_custom_window_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--vulkan`: 使用 Vulkan 后端
    /// - `--opengl`: 使用 OpenGL 后端
    /// - `--width <value>`: 设置窗口宽度
    /// - `--height <value>`: 设置窗口高度
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--vulkan") {
            self.graphics.backend = GraphicsBackend::Vulkan;
        }

        if args.iter().any(|a| a == "--opengl") {
            self.graphics.backend = GraphicsBackend::OpenGl;
        }

        if let Some(width) = value_after(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = value_after(&args, "--height") {
            self.window.height = height;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid("window.width/height", "Window dimensions must be greater than 0"));
        }

        if let Some(scale) = self.window.dpi_scale {
            if !(scale > 0.0) {
                return Err(invalid("window.dpi_scale", "DPI scale must be positive"));
            }
        }

        if self.graphics.min_image_count < 2 {
            return Err(invalid("graphics.min_image_count", "At least 2 swapchain images are required"));
        }

        if !(self.gui.font_size > 0.0) {
            return Err(invalid("gui.font_size", "Font size must be positive"));
        }

        let layout = &self.gui.layout;
        if layout.popup_threshold == 0 {
            return Err(invalid("gui.layout.popup_threshold", "Threshold must be at least 1"));
        }

        if !(layout.min_panel_width > 0.0) || layout.margin < 0.0 {
            return Err(invalid("gui.layout", "Panel width must be positive and margin non-negative"));
        }

        if !(0.0..=1.0).contains(&layout.background_alpha) {
            return Err(invalid("gui.layout.background_alpha", "Alpha must be within [0, 1]"));
        }

        Ok(())
    }
}

fn value_after<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

fn invalid(field: &str, reason: &str) -> super::error::SandboxError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl GraphicsBackend {
    /// 检查是否为 Vulkan 后端
    pub fn is_vulkan(&self) -> bool {
        matches!(self, GraphicsBackend::Vulkan)
    }

    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::OpenGl => "OpenGL",
            GraphicsBackend::Vulkan => "Vulkan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1200);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.window.position, [100, 100]);
        assert_eq!(config.graphics.backend, GraphicsBackend::OpenGl);
        assert_eq!(config.gui.layout.popup_threshold, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gui.layout.background_alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.min_image_count = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "vulkan"

            [gui.layout]
            popup_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackend::Vulkan);
        assert_eq!(config.gui.layout.popup_threshold, 3);
        assert_eq!(config.gui.layout.min_panel_width, 300.0);
        assert_eq!(config.window.title, "winit and egui");
    }

    #[test]
    fn test_unparsable_toml_is_an_error() {
        assert!(Config::from_toml_str("[window\nwidth = ").is_err());
        assert!(Config::from_file("definitely/missing/config.toml").is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["gui_sandbox", "--vulkan", "--width", "640", "--height", "nope"]);

        assert!(config.graphics.backend.is_vulkan());
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 800);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join("gui_sandbox_config_roundtrip.toml");
        let mut config = Config::default();
        config.gui.font_size = 18.0;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.gui.font_size, 18.0);
        let _ = std::fs::remove_file(&path);
    }
}
