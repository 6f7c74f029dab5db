mod color;
mod font;
mod recording;
mod renderer;
mod transform;

pub use color::{Color, ParseColorError};
pub use recording::{RecordingSurface, SurfaceCall};
pub use renderer::PixelSurface;
pub use transform::Affine2;

/// 2D painting capability the engine draws through.
///
/// State (`transform`, fill style, font) is stacked by `save` and popped by
/// `restore`. Every transform call post-multiplies the current transform.
pub trait Surface {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn rotate(&mut self, radians: f32);
    fn scale(&mut self, x: f32, y: f32);
    fn set_fill_style(&mut self, color: Color);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn set_font(&mut self, font: &str);
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
}
