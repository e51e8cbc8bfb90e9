//! 平台层
//!
//! 窗口创建与输入事件泵。

pub mod window;

pub use window::WindowProvider;
