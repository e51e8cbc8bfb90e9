//! triangle
//!
//! OpenGL，只清屏并绘制一个三角形，没有 GUI。

use std::process::ExitCode;

use gui_sandbox::app::{self, Variant};

fn main() -> ExitCode {
    match app::run(Variant::Triangle) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
