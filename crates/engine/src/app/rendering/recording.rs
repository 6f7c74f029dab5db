use super::{Color, Surface};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    ClearRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Save,
    Restore,
    Translate {
        x: f32,
        y: f32,
    },
    Rotate {
        radians: f32,
    },
    Scale {
        x: f32,
        y: f32,
    },
    SetFillStyle(Color),
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    SetFont(String),
    FillText {
        text: String,
        x: f32,
        y: f32,
    },
}

/// Surface that draws nothing and remembers every call, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.calls.push(SurfaceCall::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn save(&mut self) {
        self.calls.push(SurfaceCall::Save);
    }

    fn restore(&mut self) {
        self.calls.push(SurfaceCall::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.calls.push(SurfaceCall::Translate { x, y });
    }

    fn rotate(&mut self, radians: f32) {
        self.calls.push(SurfaceCall::Rotate { radians });
    }

    fn scale(&mut self, x: f32, y: f32) {
        self.calls.push(SurfaceCall::Scale { x, y });
    }

    fn set_fill_style(&mut self, color: Color) {
        self.calls.push(SurfaceCall::SetFillStyle(color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.calls.push(SurfaceCall::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn set_font(&mut self, font: &str) {
        self.calls.push(SurfaceCall::SetFont(font.to_string()));
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.calls.push(SurfaceCall::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }
}
