use std::time::Duration;

/// Wall-clock to fixed-step adapter. Real frame time feeds an accumulator
/// that is drained in whole steps; at most `max_steps` run per frame and any
/// time beyond that is dropped rather than caught up.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    step: Duration,
    accumulator: Duration,
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32, max_steps: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            step: Duration::from_nanos(1_000_000_000 / u64::from(tick_rate)),
            accumulator: Duration::ZERO,
            max_steps: max_steps.max(1),
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn step_ms(&self) -> f64 {
        self.step.as_secs_f64() * 1000.0
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta;
    }

    /// Number of steps to run this frame, consuming their time.
    pub fn drain(&mut self) -> u32 {
        let available = (self.accumulator.as_nanos() / self.step.as_nanos()) as u64;

        if available > u64::from(self.max_steps) {
            log::debug!(
                "dropping {} fixed steps after a long frame",
                available - u64::from(self.max_steps)
            );
            self.accumulator = Duration::ZERO;
            return self.max_steps;
        }

        let steps = available as u32;
        self.accumulator -= self.step * steps;
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60, 5);

        ts.accumulate(ts.step() * 2);
        assert_eq!(ts.drain(), 2);
        assert_eq!(ts.drain(), 0);

        ts.accumulate(ts.step() / 2);
        assert_eq!(ts.drain(), 0);
        ts.accumulate(ts.step() / 2);
        assert_eq!(ts.drain(), 1);
    }

    #[test]
    fn long_frames_are_capped_and_dropped() {
        let mut ts = FixedTimestep::new(60, 5);

        ts.accumulate(Duration::from_secs(2));
        assert_eq!(ts.drain(), 5);
        assert_eq!(ts.drain(), 0);
    }
}
