//! GUI 样式与字体

use std::path::Path;

use egui::{FontData, FontDefinitions, FontFamily, FontId, Rounding, TextStyle};
use tracing::{info, warn};

/// 自定义字体在字体表中的名字
const CUSTOM_FONT: &str = "sandbox-font";

/// 读取字体文件，失败时记录警告并返回 `None`
pub fn read_font(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => {
            warn!("Font file {} is empty, using the default font", path.display());
            None
        }
        Err(e) => {
            warn!("Failed to load font {}: {}, using the default font", path.display(), e);
            None
        }
    }
}

/// 把字体放到比例字体和等宽字体的首位
pub fn font_definitions(font: Option<Vec<u8>>) -> FontDefinitions {
    let mut fonts = FontDefinitions::default();
    if let Some(bytes) = font {
        fonts
            .font_data
            .insert(CUSTOM_FONT.to_owned(), FontData::from_owned(bytes));
        for family in [FontFamily::Proportional, FontFamily::Monospace] {
            fonts
                .families
                .entry(family)
                .or_default()
                .insert(0, CUSTOM_FONT.to_owned());
        }
    }
    fonts
}

/// 应用深色主题和字号
///
/// 字号以逻辑点为单位，高 DPI 由 `pixels_per_point` 放大。
pub fn apply_style(ctx: &egui::Context, font_size: f32) {
    let mut style = (*ctx.style()).clone();

    style.visuals = egui::Visuals::dark();
    style.visuals.window_rounding = Rounding::same(6.0);
    style.visuals.menu_rounding = Rounding::same(4.0);
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    style.spacing.window_margin = egui::Margin::same(10.0);

    style.text_styles = [
        (TextStyle::Small, FontId::proportional(font_size * 0.75)),
        (TextStyle::Body, FontId::proportional(font_size)),
        (TextStyle::Button, FontId::proportional(font_size)),
        (TextStyle::Heading, FontId::proportional(font_size * 1.25)),
        (TextStyle::Monospace, FontId::monospace(font_size)),
    ]
    .into();

    ctx.set_style(style);
}

/// 加载字体并应用样式
pub fn install(ctx: &egui::Context, font_path: &Path, font_size: f32) -> bool {
    let font = read_font(font_path);
    let loaded = font.is_some();
    if loaded {
        info!("Loaded font {} ({} pt)", font_path.display(), font_size);
    }
    ctx.set_fonts(font_definitions(font));
    apply_style(ctx, font_size);
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_keeps_defaults() {
        let ctx = egui::Context::default();
        let loaded = install(&ctx, Path::new("/nonexistent/JetBrainsMono-ExtraLight.ttf"), 24.0);
        assert!(!loaded);

        let defaults = FontDefinitions::default();
        assert_eq!(font_definitions(None).font_data.len(), defaults.font_data.len());
    }

    #[test]
    fn test_custom_font_goes_first() {
        let fonts = font_definitions(Some(vec![0u8; 16]));
        assert!(fonts.font_data.contains_key(CUSTOM_FONT));
        assert_eq!(fonts.families[&FontFamily::Proportional][0], CUSTOM_FONT);
        assert_eq!(fonts.families[&FontFamily::Monospace][0], CUSTOM_FONT);
    }

    #[test]
    fn test_style_uses_font_size() {
        let ctx = egui::Context::default();
        apply_style(&ctx, 24.0);
        let style = ctx.style();
        assert_eq!(style.text_styles[&TextStyle::Body].size, 24.0);
        assert!(style.visuals.dark_mode);
    }
}
