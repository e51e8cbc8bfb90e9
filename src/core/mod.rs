//! 核心功能模块
//!
//! 本模块提供沙盒程序的基础功能，与具体的图形 API 无关。
//!
//! # 模块组织
//!
//! - `config`：配置管理，支持从 TOML 文件加载并用命令行参数覆盖
//! - `scene`：场景配置（清屏颜色、固定几何体、相机）
//! - `error`：错误处理，定义统一的错误类型
//! - `log`：日志系统，输出 `[LEVEL] message` 格式的日志
//! - `clock`：时间戳与帧计时
//! - `paths`：可执行文件目录推导
//! - `math`：矩阵辅助函数

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod math;
pub mod paths;
pub mod scene;

// 重新导出常用类型，方便使用
pub use config::{Config, GraphicsBackend};
pub use error::{GraphicsError, Result, SandboxError};
pub use scene::{GeometryKind, SceneConfig};
