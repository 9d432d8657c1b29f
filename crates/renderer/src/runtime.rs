use std::time::{Duration, Instant};

/// Step used by the fixed-step clock when no refresh rate is configured.
pub const DEFAULT_STEP: Duration = Duration::from_nanos(16_666_667);

/// How an effect's time uniform advances between painted frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClockMode {
    /// Follow the system monotonic clock.
    #[default]
    Realtime,
    /// Advance by a fixed step per painted frame regardless of wall time.
    FixedStep {
        /// Frames per second the step is derived from.
        fps: f32,
    },
    /// Always report the same timestamp (still frames).
    Still {
        /// Timestamp to evaluate the shader at (seconds).
        time: f32,
    },
}

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that advances a constant step every time it is sampled.
///
/// The first sample reports `0.0`; each later sample adds one step. Wall-clock
/// gaps (a stopped effect, a slow frame) never show up in the shader's time.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepTimeSource {
    step: Duration,
    elapsed: Duration,
    frame: u64,
}

impl FixedStepTimeSource {
    /// Builds a source stepping `1 / fps` seconds per frame. Rates with no
    /// usable step (non-positive, non-finite, too small or too large) fall
    /// back to 60 FPS.
    pub fn from_fps(fps: f32) -> Self {
        let step = if fps.is_finite() && fps > 0.0 {
            Duration::try_from_secs_f32(1.0 / fps)
                .ok()
                .filter(|step| !step.is_zero())
        } else {
            None
        };
        Self::new(step.unwrap_or(DEFAULT_STEP))
    }

    pub fn new(step: Duration) -> Self {
        Self {
            step,
            elapsed: Duration::ZERO,
            frame: 0,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

impl Default for FixedStepTimeSource {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}

impl TimeSource for FixedStepTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.elapsed.as_secs_f32(), self.frame);
        self.elapsed = self.elapsed.saturating_add(self.step);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    /// Constructs a fixed time source that always returns the provided time.
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested clock mode.
pub fn time_source_for_clock(mode: ClockMode) -> BoxedTimeSource {
    match mode {
        ClockMode::Realtime => Box::new(SystemTimeSource::new()),
        ClockMode::FixedStep { fps } => Box::new(FixedStepTimeSource::from_fps(fps)),
        ClockMode::Still { time } => Box::new(FixedTimeSource::new(time)),
    }
}
