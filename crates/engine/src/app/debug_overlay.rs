use super::rendering::{Color, Surface};
use super::Vec2;

pub(crate) const OVERLAY_FONT: &str = "12px monospace";
const LEFT: f32 = 10.0;
const LINE_HEIGHT: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct OverlayData {
    pub fps: u32,
    pub object_count: usize,
    pub pointer: Vec2,
}

pub(crate) fn overlay_lines(data: &OverlayData) -> [String; 3] {
    [
        format!("FPS: {}", data.fps),
        format!("Objects: {}", data.object_count),
        format!(
            "Mouse: ({}, {})",
            data.pointer.x.round() as i32,
            data.pointer.y.round() as i32
        ),
    ]
}

pub(crate) fn draw_overlay(surface: &mut dyn Surface, data: &OverlayData) {
    surface.save();
    surface.set_fill_style(Color::WHITE);
    surface.set_font(OVERLAY_FONT);
    for (index, line) in overlay_lines(data).iter().enumerate() {
        surface.fill_text(line, LEFT, LINE_HEIGHT * (index as f32 + 1.0));
    }
    surface.restore();
}
