//! cube
//!
//! OpenGL，旋转的立方体加 GUI 控件。

use std::process::ExitCode;

use gui_sandbox::app::{self, Variant};

fn main() -> ExitCode {
    match app::run(Variant::Cube) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
