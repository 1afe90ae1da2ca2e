//! Frame and fixed-step timing
//!
//! The [`FrameClock`] drives both per-frame deltas and the fixed-step
//! accumulator used for deterministic logic updates. Time can be measured from
//! the wall clock or advanced manually for headless and test runs.

use std::time::Instant;

/// Default fixed-step period in seconds
pub const DEFAULT_FIXED_STEP: f32 = 0.05;

/// Frame timing source with a fixed-step accumulator
///
/// A frame is bracketed by advancing the clock (either [`FrameClock::measure`]
/// against the wall clock or [`FrameClock::advance`] with an explicit delta)
/// and [`FrameClock::frame_end`]. Between the two, [`FrameClock::fixed_due`] /
/// [`FrameClock::fixed_tick`] schedule zero or more fixed-step updates.
#[derive(Debug)]
pub struct FrameClock {
    last_instant: Option<Instant>,
    total: f64,
    delta: f32,
    frame: u64,
    next_fixed: f64,
    fixed_step: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock with the default fixed-step period
    #[must_use]
    pub fn new() -> Self {
        Self::with_fixed_step(DEFAULT_FIXED_STEP)
    }

    /// Create a clock with a custom fixed-step period in seconds
    #[must_use]
    pub fn with_fixed_step(fixed_step: f32) -> Self {
        let fixed_step = f64::from(fixed_step.max(f32::EPSILON));
        Self {
            last_instant: None,
            total: 0.0,
            delta: 0.0,
            frame: 0,
            next_fixed: fixed_step,
            fixed_step,
        }
    }

    /// Measure the wall-clock time since the previous call in seconds
    ///
    /// The first call returns 0.0. This only samples the clock; pass the
    /// result to [`FrameClock::advance`] to move time forward.
    pub fn measure(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last_instant
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_instant = Some(now);
        dt
    }

    /// Advance the clock by an explicit delta in seconds
    pub fn advance(&mut self, dt: f32) {
        self.delta = dt.max(0.0);
        self.total += f64::from(self.delta);
    }

    /// True while a fixed-step update is owed for the current total time
    #[must_use]
    pub fn fixed_due(&self) -> bool {
        self.total > self.next_fixed
    }

    /// Consume one owed fixed-step update
    pub fn fixed_tick(&mut self) {
        self.next_fixed += self.fixed_step;
    }

    /// Close out the current frame
    pub fn frame_end(&mut self) {
        self.frame += 1;
    }

    /// Time since the last advance in seconds
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        self.delta
    }

    /// Total advanced time in seconds
    #[must_use]
    pub fn total_time(&self) -> f64 {
        self.total
    }

    /// Fixed-step period in seconds
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn fixed_step(&self) -> f32 {
        self.fixed_step as f32
    }

    /// Number of completed frames
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Instantaneous frames per second from the last delta
    #[must_use]
    pub fn current_fps(&self) -> f32 {
        if self.delta > 0.0 {
            1.0 / self.delta
        } else {
            0.0
        }
    }

    /// Average frames per second over the clock's lifetime
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn average_fps(&self) -> f32 {
        if self.total > 0.0 {
            (self.frame as f64 / self.total) as f32
        } else {
            0.0
        }
    }
}
