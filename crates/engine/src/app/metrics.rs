use std::time::Duration;

/// Loop metrics published once per completed FPS window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: u32,
    pub frame_time_ms: f32,
    pub object_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsSample {
    pub fps: u32,
    pub frame_time_ms: f32,
}

/// Frame counter over rolling one-second windows. Time past the window
/// boundary carries into the next window.
///
/// Deltas are summed as `Duration`s. Fractional frame rates land a few
/// nanoseconds short of the boundary after rounding, so a window closes once
/// it is within `WINDOW_SLACK` of a full second.
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    window: Duration,
    frame_time_sum: Duration,
    fps: u32,
}

impl FpsCounter {
    pub const WINDOW: Duration = Duration::from_secs(1);
    pub const WINDOW_SLACK: Duration = Duration::from_micros(1);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, delta: Duration) -> Option<FpsSample> {
        self.frames = self.frames.saturating_add(1);
        self.window = self.window.saturating_add(delta);
        self.frame_time_sum = self.frame_time_sum.saturating_add(delta);
        if self.window + Self::WINDOW_SLACK < Self::WINDOW {
            return None;
        }

        let sample = FpsSample {
            fps: self.frames,
            frame_time_ms: (self.frame_time_sum.as_secs_f64() * 1000.0 / self.frames as f64)
                as f32,
        };
        self.fps = self.frames;
        self.frames = 0;
        self.frame_time_sum = Duration::ZERO;
        self.window = self.window.saturating_sub(Self::WINDOW);
        Some(sample)
    }

    /// Frame count of the last completed window; zero before the first one.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
