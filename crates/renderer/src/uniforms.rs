use bytemuck::{Pod, Zeroable};
use chrono::{Datelike, Local, Timelike};
use viewport::Size;

use crate::runtime::TimeSample;

/// ShaderToy mouse convention for "no button pressed yet".
pub const IDLE_MOUSE: [f32; 4] = [0.0, 0.0, -1.0, -1.0];

/// Uniform block handed to the externally compiled shader each frame.
///
/// The layout follows std140 so the bytes can be uploaded verbatim; the
/// shader's `iResolution` is the effect's own surface size, never the size of
/// the viewport it ends up scaled into.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadertoyUniforms {
    pub i_resolution: [f32; 4],
    pub i_time: f32,
    pub i_time_delta: f32,
    pub i_frame: i32,
    pub i_sample_rate: f32,
    pub i_mouse: [f32; 4],
    pub i_date: [f32; 4],
}

unsafe impl Zeroable for ShadertoyUniforms {}
unsafe impl Pod for ShadertoyUniforms {}

impl Default for ShadertoyUniforms {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl ShadertoyUniforms {
    pub fn new(resolution: Size) -> Self {
        let mut uniforms = Self {
            i_resolution: [resolution.width as f32, resolution.height as f32, 0.0, 0.0],
            i_time: 0.0,
            i_time_delta: 0.0,
            i_frame: 0,
            i_sample_rate: 44100.0,
            i_mouse: IDLE_MOUSE,
            i_date: [0.0; 4],
        };
        uniforms.refresh_date();
        uniforms
    }

    pub fn set_resolution(&mut self, resolution: Size) {
        self.i_resolution[0] = resolution.width as f32;
        self.i_resolution[1] = resolution.height as f32;
    }

    /// Writes the next time sample, deriving `iTimeDelta` from the previous
    /// `iTime` (never negative).
    pub fn update_time(&mut self, sample: TimeSample) {
        let delta = if sample.frame_index == 0 {
            0.0
        } else {
            (sample.seconds - self.i_time).max(0.0)
        };
        self.i_time = sample.seconds;
        self.i_time_delta = delta;
        self.i_frame = sample.frame_index.min(i32::MAX as u64) as i32;
        self.i_resolution[3] = self.i_time;
        self.refresh_date();
    }

    /// Returns the block to its freshly constructed state, keeping nothing
    /// from previous frames.
    pub fn reset(&mut self) {
        *self = Self::new(Size::ZERO);
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    fn refresh_date(&mut self) {
        let local_now = Local::now();
        let seconds_since_midnight = local_now.num_seconds_from_midnight() as f32
            + local_now.nanosecond() as f32 / 1_000_000_000.0;
        self.i_date = [
            local_now.year() as f32,
            local_now.month() as f32,
            local_now.day() as f32,
            seconds_since_midnight,
        ];
    }
}
