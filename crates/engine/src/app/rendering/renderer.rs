use tracing::warn;

use crate::app::Vec2;

use super::font::{font_pixel_size, glyph_for, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::{Affine2, Color, Surface};

const DEFAULT_BACKGROUND: Color = Color::rgb(20, 22, 28);
const DEFAULT_FONT_PX: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
struct DrawState {
    transform: Affine2,
    fill: Color,
    font_px: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine2::IDENTITY,
            fill: Color::BLACK,
            font_px: DEFAULT_FONT_PX,
        }
    }
}

/// Software RGBA surface. Rows are tightly packed, four bytes per pixel,
/// which is the layout a `pixels` frame expects.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    background: Color,
    state: DrawState,
    stack: Vec<DrawState>,
    warned_unbalanced_restore: bool,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let mut surface = Self {
            width,
            height,
            frame: vec![0; width as usize * height as usize * 4],
            background: DEFAULT_BACKGROUND,
            state: DrawState::default(),
            stack: Vec::new(),
            warned_unbalanced_restore: false,
        };
        surface.fill_background();
        surface
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self.fill_background();
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(rgba)
    }

    /// Copies the current frame into a buffer of identical layout.
    pub fn copy_into(&self, target: &mut [u8]) {
        if target.len() != self.frame.len() {
            warn!(
                expected = self.frame.len(),
                actual = target.len(),
                "pixel_surface_copy_size_mismatch"
            );
            return;
        }
        target.copy_from_slice(&self.frame);
    }

    fn fill_background(&mut self) {
        let rgba = self.background.to_rgba();
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    /// Rasterizes a local-space rectangle through the current transform,
    /// sampling pixel centres.
    fn paint_rect(&mut self, x: f32, y: f32, width: f32, height: f32, mode: PaintMode) {
        if self.width == 0 || self.height == 0 || width == 0.0 || height == 0.0 {
            return;
        }
        let transform = self.state.transform;
        let Some(inverse) = transform.inverse() else {
            return;
        };
        let (left, right) = ordered(x, x + width);
        let (top, bottom) = ordered(y, y + height);

        let corners = [
            transform.apply(Vec2::new(left, top)),
            transform.apply(Vec2::new(right, top)),
            transform.apply(Vec2::new(right, bottom)),
            transform.apply(Vec2::new(left, bottom)),
        ];
        let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            return;
        }

        let start_x = (min_x.floor().max(0.0)) as u32;
        let start_y = (min_y.floor().max(0.0)) as u32;
        let end_x = (max_x.ceil().min(self.width as f32)).max(0.0) as u32;
        let end_y = (max_y.ceil().min(self.height as f32)).max(0.0) as u32;

        for py in start_y..end_y {
            for px in start_x..end_x {
                let local = inverse.apply(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
                let inside =
                    local.x >= left && local.x < right && local.y >= top && local.y < bottom;
                if !inside {
                    continue;
                }
                match mode {
                    PaintMode::Fill(color) => self.blend_pixel(px, py, color),
                    PaintMode::Clear => self.write_pixel(px, py, self.background.to_rgba()),
                }
            }
        }
    }

    fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        match color.a {
            0 => {}
            255 => self.write_pixel(x, y, color.to_rgba()),
            alpha => {
                let Some(existing) = self.pixel(x, y) else {
                    return;
                };
                let src = [color.r, color.g, color.b];
                let alpha = alpha as u32;
                let mut out = [0u8; 4];
                for channel in 0..3 {
                    let blended =
                        (src[channel] as u32 * alpha + existing[channel] as u32 * (255 - alpha))
                            / 255;
                    out[channel] = blended as u8;
                }
                out[3] = existing[3].max(color.a);
                self.write_pixel(x, y, out);
            }
        }
    }

    fn write_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let Some(pixel_offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
        else {
            return;
        };
        let Some(byte_offset) = pixel_offset.checked_mul(4) else {
            return;
        };
        let Some(end) = byte_offset.checked_add(4) else {
            return;
        };
        if end > self.frame.len() {
            return;
        }
        self.frame[byte_offset..end].copy_from_slice(&rgba);
    }
}

#[derive(Debug, Clone, Copy)]
enum PaintMode {
    Fill(Color),
    Clear,
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Surface for PixelSurface {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.paint_rect(x, y, width, height, PaintMode::Clear);
    }

    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => {
                if !self.warned_unbalanced_restore {
                    self.warned_unbalanced_restore = true;
                    warn!("pixel_surface_restore_without_save");
                }
            }
        }
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.state.transform.translate(x, y);
    }

    fn rotate(&mut self, radians: f32) {
        self.state.transform.rotate(radians);
    }

    fn scale(&mut self, x: f32, y: f32) {
        self.state.transform.scale(x, y);
    }

    fn set_fill_style(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let color = self.state.fill;
        self.paint_rect(x, y, width, height, PaintMode::Fill(color));
    }

    fn set_font(&mut self, font: &str) {
        match font_pixel_size(font) {
            Some(size) => self.state.font_px = size,
            None => warn!(font, "pixel_surface_font_size_unrecognized"),
        }
    }

    /// Text is anchored at its left baseline and drawn axis-aligned at the
    /// transformed anchor; rotation and scale do not apply to glyphs.
    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let anchor = self.state.transform.apply(Vec2::new(x, y));
        let pixel_scale = ((self.state.font_px / (GLYPH_HEIGHT + 1) as f32).round() as i32).max(1);
        let advance = (GLYPH_WIDTH + 1) * pixel_scale;
        let top = anchor.y.round() as i32 - GLYPH_HEIGHT * pixel_scale;
        let mut left = anchor.x.round() as i32;
        let color = self.state.fill;

        for ch in text.chars() {
            let glyph = glyph_for(ch);
            for (row_index, row_bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let block_x = left + col * pixel_scale;
                    let block_y = top + row_index as i32 * pixel_scale;
                    for sy in 0..pixel_scale {
                        for sx in 0..pixel_scale {
                            let px = block_x + sx;
                            let py = block_y + sy;
                            if px < 0 || py < 0 || px >= self.width as i32 || py >= self.height as i32
                            {
                                continue;
                            }
                            self.blend_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
            left += advance;
        }
    }
}
