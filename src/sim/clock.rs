//! Fixed timestep accumulator for frame drivers
//!
//! Turns variable wall-clock frame times into a whole number of fixed steps.
//! The step count per frame is capped to avoid a spiral of death; backlog
//! beyond the cap is dropped.

use crate::settings::SimSettings;

#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_dt: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl FrameClock {
    pub fn new(fixed_dt: f32, max_substeps: u32) -> Self {
        Self {
            fixed_dt,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    pub fn from_settings(settings: &SimSettings) -> Self {
        Self::new(settings.fixed_dt, settings.max_substeps)
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Time carried to the next frame, always below one step after `advance`
    pub fn backlog(&self) -> f32 {
        self.accumulator
    }

    /// Add `elapsed` seconds and return how many fixed steps to run now
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        if self.accumulator >= self.fixed_dt {
            log::debug!(
                "frame clock dropping {:.4}s of backlog after {steps} steps",
                self.accumulator
            );
            self.accumulator %= self.fixed_dt;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_partial_frames() {
        let mut clock = FrameClock::new(0.25, 8);
        assert_eq!(clock.advance(0.1), 0);
        assert_eq!(clock.advance(0.1), 0);
        assert_eq!(clock.advance(0.1), 1);
        assert!((clock.backlog() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_caps_substeps_and_drops_backlog() {
        let mut clock = FrameClock::new(0.25, 2);
        assert_eq!(clock.advance(2.1), 2);
        assert!(clock.backlog() < clock.fixed_dt());
    }

    #[test]
    fn test_ignores_bad_elapsed() {
        let mut clock = FrameClock::from_settings(&SimSettings::default());
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.backlog(), 0.0);
    }
}
