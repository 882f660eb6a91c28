//! Fixed-step timing utilities

/// Most steps a single [`FixedTimestep::advance`] will report. A longer
/// backlog is dropped.
pub const MAX_STEPS_PER_ADVANCE: u32 = 1000;

/// Fixed-timestep accumulator decoupling simulation steps from frame time.
///
/// Every call to [`FixedTimestep::advance`] banks the elapsed frame time and
/// reports how many whole steps are now due. Leftover time stays banked for the
/// next frame, so a slow frame runs several steps and a fast frame may run none.
/// A step length that is not positive and finite never steps.
#[derive(Clone, Debug)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    total_steps: u64,
}

impl FixedTimestep {
    /// Create an accumulator from a rate in steps per second
    pub fn from_rate(rate: f32) -> Self {
        Self::new(1.0 / rate)
    }

    /// Create an accumulator with an explicit step length in seconds
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    /// Step length in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Whether this accumulator can ever produce a step
    pub fn is_enabled(&self) -> bool {
        self.step.is_finite() && self.step > 0.0
    }

    /// Time banked but not yet consumed by a step
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Total steps taken since creation
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Bank `dt` seconds and return the number of steps now due, at most
    /// [`MAX_STEPS_PER_ADVANCE`].
    ///
    /// The caller must run exactly that many steps, in order.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !self.is_enabled() {
            return 0;
        }
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }

        let due = (self.accumulator / self.step).floor();
        let steps = if due > MAX_STEPS_PER_ADVANCE as f32 {
            log::warn!(
                "dropping {:.0} physics steps of backlog ({:.2}s)",
                due - MAX_STEPS_PER_ADVANCE as f32,
                self.accumulator
            );
            self.accumulator = 0.0;
            MAX_STEPS_PER_ADVANCE
        } else {
            let steps = due as u32;
            self.accumulator = (self.accumulator - steps as f32 * self.step).max(0.0);
            steps
        };

        self.total_steps += steps as u64;
        steps
    }

    /// Drop any banked time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::from_rate(200.0)
    }
}
