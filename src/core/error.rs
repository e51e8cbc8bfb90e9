//! 错误处理模块
//!
//! 定义了沙盒程序中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - 启动失败（窗口、图形后端、GUI 初始化）：直接以失败状态退出进程
//! - 后端瞬时状态（交换链过期）：由后端内部处理，不会出现在这里
//! - 着色器编译/链接失败：视为致命错误
//! - 不可恢复的后端错误：沿正常的销毁流程向上传播

use std::fmt;

/// 统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, SandboxError>;

/// 沙盒程序的错误类型
#[derive(Debug)]
pub enum SandboxError {
    /// 配置错误
    Config(ConfigError),

    /// 窗口或事件循环错误
    Window(String),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// GUI 初始化错误
    Gui(String),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 初始化顺序错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 没有可用的适配器或物理设备
    AdapterUnavailable(String),

    /// 设备创建失败
    DeviceCreation(String),

    /// 窗口表面错误
    Surface(String),

    /// 交换链错误
    SwapchainError(String),

    /// 着色器编译或链接失败，附带后端给出的诊断文本
    ShaderCompilation { stage: String, log: String },

    /// 资源创建失败
    ResourceCreation(String),

    /// 图形 API 调用返回了错误码
    ApiCall { call: &'static str, code: String },
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Config(e) => write!(f, "Configuration error: {}", e),
            SandboxError::Window(msg) => write!(f, "Window error: {}", msg),
            SandboxError::Graphics(e) => write!(f, "Graphics error: {}", e),
            SandboxError::Gui(msg) => write!(f, "GUI error: {}", msg),
            SandboxError::Io(e) => write!(f, "IO error: {}", e),
            SandboxError::Log(msg) => write!(f, "Log error: {}", msg),
            SandboxError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            SandboxError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::AdapterUnavailable(msg) => write!(f, "No usable GPU: {}", msg),
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::Surface(msg) => write!(f, "Surface error: {}", msg),
            GraphicsError::SwapchainError(msg) => write!(f, "Swapchain error: {}", msg),
            GraphicsError::ShaderCompilation { stage, log } => {
                write!(f, "Shader compilation failed ({}):\n{}", stage, log)
            }
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::ApiCall { call, code } => write!(f, "{} returned {}", call, code),
        }
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SandboxError::Io(e) => Some(e),
            SandboxError::Config(e) => Some(e),
            SandboxError::Graphics(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        SandboxError::Io(err)
    }
}

impl From<ConfigError> for SandboxError {
    fn from(err: ConfigError) -> Self {
        SandboxError::Config(err)
    }
}

impl From<GraphicsError> for SandboxError {
    fn from(err: GraphicsError) -> Self {
        SandboxError::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_error_carries_diagnostics() {
        let err: SandboxError = GraphicsError::ShaderCompilation {
            stage: "vertex".to_string(),
            log: "error: expected ';'".to_string(),
        }
        .into();

        let text = err.to_string();
        assert!(text.starts_with("Graphics error: Shader compilation failed (vertex)"));
        assert!(text.contains("expected ';'"));
    }

    #[test]
    fn test_api_call_error_display() {
        let err = GraphicsError::ApiCall { call: "vkCreateDevice", code: "ERROR_DEVICE_LOST".to_string() };
        assert_eq!(err.to_string(), "vkCreateDevice returned ERROR_DEVICE_LOST");
    }

    #[test]
    fn test_error_source_chain() {
        let err: SandboxError = ConfigError::FileNotFound("config.toml".to_string()).into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
