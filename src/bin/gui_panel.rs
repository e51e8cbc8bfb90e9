//! gui_panel
//!
//! OpenGL，只显示 GUI 控件。

use std::process::ExitCode;

use gui_sandbox::app::{self, Variant};

fn main() -> ExitCode {
    match app::run(Variant::GuiPanel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
