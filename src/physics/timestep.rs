//! Fixed-timestep sub-step scheduling
//!
//! Frame deltas of any length are accumulated and converted into a whole number
//! of fixed sub-steps. Leftover time carries over to the next frame.

use super::settings::PhysicsSettings;

/// Accumulator turning variable frame deltas into fixed sub-steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubStepper {
    fixed_timestep: f32,
    max_frame_delta: f32,
    accumulator: f32,
}

impl SubStepper {
    #[must_use]
    pub fn new(fixed_timestep: f32, max_frame_delta: f32) -> Self {
        Self {
            fixed_timestep,
            max_frame_delta,
            accumulator: 0.0,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &PhysicsSettings) -> Self {
        Self::new(settings.fixed_timestep, settings.max_frame_delta)
    }

    /// Feed one frame delta and return how many sub-steps to run.
    ///
    /// Deltas above the frame cap are clamped, and an accumulator already holding
    /// more than one sub-step (after a timestep change) is discarded.
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        let delta_time = delta_time.clamp(0.0, self.max_frame_delta);

        if self.accumulator > self.fixed_timestep {
            self.accumulator = 0.0;
        }
        self.accumulator += delta_time;

        if self.accumulator < self.fixed_timestep {
            return 0;
        }

        let steps = (self.accumulator / self.fixed_timestep).floor();
        self.accumulator = (self.accumulator - steps * self.fixed_timestep).max(0.0);
        steps as u32
    }

    /// Change the sub-step length, keeping the accumulated time
    pub fn set_fixed_timestep(&mut self, fixed_timestep: f32) {
        self.fixed_timestep = fixed_timestep;
    }

    pub fn set_max_frame_delta(&mut self, max_frame_delta: f32) {
        self.max_frame_delta = max_frame_delta;
    }

    #[must_use]
    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep
    }

    /// Time carried over to the next frame
    #[must_use]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for SubStepper {
    fn default() -> Self {
        Self::from_settings(&PhysicsSettings::default())
    }
}
