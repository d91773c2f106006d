//! Fixed-rate simulation clock.
//!
//! Frames advance the simulation by a fixed `1 / frame_rate` seconds,
//! split into a fixed number of equal sub-steps. The rate is an explicit
//! setting rather than something read from the video, so every run with the
//! same settings advances identically.
//!
//! # Example
//!
//! ```
//! use particle_mask::time::SimClock;
//!
//! let mut clock = SimClock::new(30.0, 5);
//! for _ in 0..clock.sub_steps() {
//!     clock.tick();
//! }
//! assert_eq!(clock.substep_count(), 5);
//! assert!((clock.elapsed() - 1.0 / 30.0).abs() < 1e-6);
//! ```

/// Default frames per second assumed for the input sequence.
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Default number of sub-steps per frame.
pub const DEFAULT_SUB_STEPS: u32 = 5;

/// Simulation time tracking with a fixed frame rate and sub-step count.
#[derive(Clone, Debug, PartialEq)]
pub struct SimClock {
    /// Simulation seconds elapsed.
    elapsed: f32,
    /// Frames per second.
    frame_rate: f32,
    /// Sub-steps per frame.
    sub_steps: u32,
    /// Total sub-steps taken.
    substep_count: u64,
}

impl SimClock {
    /// Create a clock at time zero. `sub_steps` is raised to at least 1.
    pub fn new(frame_rate: f32, sub_steps: u32) -> Self {
        Self {
            elapsed: 0.0,
            frame_rate,
            sub_steps: sub_steps.max(1),
            substep_count: 0,
        }
    }

    /// Seconds per frame.
    #[inline]
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_rate
    }

    /// Seconds per sub-step.
    #[inline]
    pub fn sub_dt(&self) -> f32 {
        self.frame_dt() / self.sub_steps as f32
    }

    /// Sub-steps per frame.
    #[inline]
    pub fn sub_steps(&self) -> u32 {
        self.sub_steps
    }

    /// Frames per second.
    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Simulation seconds elapsed.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Sub-steps taken so far.
    #[inline]
    pub fn substep_count(&self) -> u64 {
        self.substep_count
    }

    /// Seconds at the given frame index, used for time-based modulation.
    #[inline]
    pub fn frame_time(&self, frame_index: usize) -> f32 {
        frame_index as f32 / self.frame_rate
    }

    /// Advance by one sub-step. Returns the new elapsed time.
    pub fn tick(&mut self) -> f32 {
        self.elapsed += self.sub_dt();
        self.substep_count += 1;
        self.elapsed
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE, DEFAULT_SUB_STEPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = SimClock::default();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.substep_count(), 0);
        assert_eq!(clock.sub_steps(), 5);
        assert!((clock.sub_dt() - 1.0 / 150.0).abs() < 1e-8);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = SimClock::new(24.0, 3);
        let mut last = clock.elapsed();
        for _ in 0..100 {
            let now = clock.tick();
            assert!(now > last);
            last = now;
        }
        assert!((clock.elapsed() - 100.0 / 72.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_sub_steps_clamped() {
        let clock = SimClock::new(30.0, 0);
        assert_eq!(clock.sub_steps(), 1);
    }

    #[test]
    fn test_frame_time() {
        let clock = SimClock::new(30.0, 5);
        assert!((clock.frame_time(15) - 0.5).abs() < 1e-6);
    }
}
