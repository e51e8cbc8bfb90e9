//! 彩蛋弹窗
//!
//! 计数达到阈值时打开的模态弹窗。打开期间前景层有一层遮罩，
//! 吞掉对其他控件的点击，只有弹窗本身可以交互。

use egui::{Align2, Color32, Id, LayerId, Order, Sense};
use tracing::info;

use crate::gui::state::GuiState;

const BACKDROP_ID: &str = "easter_egg_backdrop";
const POPUP_ID: &str = "easter_egg_popup";

/// 构建彩蛋弹窗
pub fn show(ctx: &egui::Context, state: &mut GuiState) {
    if !state.easter_egg_open {
        return;
    }

    let screen = ctx.screen_rect();

    egui::Area::new(Id::new(BACKDROP_ID))
        .order(Order::Foreground)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            ui.allocate_rect(screen, Sense::click_and_drag());
            ui.painter().rect_filled(screen, 0.0, Color32::from_black_alpha(96));
        });

    let popup_id = Id::new(POPUP_ID);
    egui::Area::new(popup_id)
        .order(Order::Foreground)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.strong("Easter egg");
                ui.separator();
                ui.label("Ho-ho, you found me!");
                if ui.button("Buy Ultimate Orb").clicked() {
                    info!("Easter egg closed");
                    state.close_easter_egg();
                }
            });
        });

    // 弹窗必须位于遮罩之上
    ctx.move_to_top(LayerId::new(Order::Foreground, popup_id));
}
