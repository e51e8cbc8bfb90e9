//! gui_sandbox - 主入口
//!
//! 后端由配置文件或命令行参数选择，场景几何体由 scene.toml 决定。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 使用 Vulkan（命令行覆盖）
//! cargo run -- --vulkan
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  应用程序入口
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │     App     │  启动 / 主循环 / 清理
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Renderer   │  统一渲染接口 + GUI
//! └──────┬──────┘
//!        │
//!   ┌────┴────┐
//!   │         │
//! ┌─▼────┐ ┌──▼───┐
//! │OpenGL│ │Vulkan│  具体后端实现
//! └──────┘ └──────┘
//! ```

use std::process::ExitCode;

use gui_sandbox::app::{self, Variant};

fn main() -> ExitCode {
    match app::run(Variant::Sandbox) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
