use glam::Vec2;

use crate::config::InterpolationConfig;
use crate::net::{PlayerState, PoseMessage};

/// One authoritative observation of an entity, stamped with host time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRecord {
    pub time_ms: f64,
    pub position: Vec2,
    /// Pixels per fixed step.
    pub velocity: Vec2,
    pub on_ground: bool,
}

impl EntityRecord {
    pub fn from_pose(pose: &PoseMessage) -> Self {
        Self {
            time_ms: pose.host_time_ms,
            position: Vec2::from(pose.position),
            velocity: Vec2::from(pose.velocity),
            on_ground: pose.on_ground,
        }
    }

    pub fn from_state(time_ms: f64, state: &PlayerState) -> Self {
        Self {
            time_ms,
            position: Vec2::from(state.position),
            velocity: Vec2::from(state.velocity),
            on_ground: state.on_ground,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Render time is at or before the oldest record.
    Clamped,
    Interpolated,
    Extrapolated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
    pub mode: SampleMode,
}

/// The previous and current records of one remote entity.
#[derive(Debug, Clone)]
pub struct PoseBuffer {
    config: InterpolationConfig,
    step_ms: f64,
    previous: Option<EntityRecord>,
    current: Option<EntityRecord>,
}

impl PoseBuffer {
    pub fn new(config: InterpolationConfig, step_ms: f64) -> Self {
        Self {
            config,
            step_ms,
            previous: None,
            current: None,
        }
    }

    /// Buffers `record` if it is newer than everything held. Late or
    /// duplicate arrivals are discarded and never applied out of order. A
    /// record too far from the current one to be reached by movement starts
    /// a fresh history, so a respawn seen only through poses is not blended.
    pub fn push(&mut self, record: EntityRecord) -> bool {
        if let Some(current) = self.current {
            if record.time_ms <= current.time_ms {
                return false;
            }
            let jump = record.position.distance(current.position);
            if jump > self.config.teleport_distance {
                log::debug!("entity jumped {jump:.0}px, not interpolating across it");
                self.reset_to(record);
                return true;
            }
        }
        self.previous = self.current.replace(record);
        true
    }

    /// Forgets history so the next sample shows `record` as is. Used for
    /// discontinuities such as a respawn, which must never be smoothed.
    pub fn reset_to(&mut self, record: EntityRecord) {
        self.previous = None;
        self.current = Some(record);
    }

    pub fn latest(&self) -> Option<&EntityRecord> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn sample(&self, render_time_ms: f64) -> Option<Sample> {
        let current = self.current?;

        let Some(previous) = self.previous else {
            if render_time_ms <= current.time_ms {
                return Some(held(&current, SampleMode::Clamped));
            }
            return Some(self.extrapolate(&current, render_time_ms));
        };

        if render_time_ms <= previous.time_ms {
            return Some(held(&previous, SampleMode::Clamped));
        }
        if render_time_ms < current.time_ms {
            let span = current.time_ms - previous.time_ms;
            let t = ((render_time_ms - previous.time_ms) / span) as f32;
            return Some(Sample {
                position: previous.position.lerp(current.position, t),
                velocity: previous.velocity.lerp(current.velocity, t),
                on_ground: if t < 0.5 {
                    previous.on_ground
                } else {
                    current.on_ground
                },
                mode: SampleMode::Interpolated,
            });
        }
        Some(self.extrapolate(&current, render_time_ms))
    }

    fn extrapolate(&self, record: &EntityRecord, render_time_ms: f64) -> Sample {
        let ahead_ms = (render_time_ms - record.time_ms).clamp(0.0, self.config.extrapolation_limit_ms);
        let steps = (ahead_ms / self.step_ms) as f32;
        Sample {
            position: record.position + record.velocity * steps,
            velocity: record.velocity,
            on_ground: record.on_ground,
            mode: SampleMode::Extrapolated,
        }
    }
}

fn held(record: &EntityRecord, mode: SampleMode) -> Sample {
    Sample {
        position: record.position,
        velocity: record.velocity,
        on_ground: record.on_ground,
        mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time_ms: f64, x: f32, vx: f32) -> EntityRecord {
        EntityRecord {
            time_ms,
            position: Vec2::new(x, 100.0),
            velocity: Vec2::new(vx, 0.0),
            on_ground: true,
        }
    }

    fn buffer() -> PoseBuffer {
        PoseBuffer::new(InterpolationConfig::default(), 10.0)
    }

    #[test]
    fn empty_buffer_has_no_sample() {
        assert!(buffer().sample(0.0).is_none());
    }

    #[test]
    fn between_records_is_linear() {
        let mut buf = buffer();
        buf.push(record(100.0, 0.0, 1.0));
        buf.push(record(200.0, 50.0, 1.0));

        let sample = buf.sample(150.0).unwrap();
        assert_eq!(sample.mode, SampleMode::Interpolated);
        assert_eq!(sample.position, Vec2::new(25.0, 100.0));

        let sample = buf.sample(120.0).unwrap();
        assert!((sample.position.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn before_oldest_clamps() {
        let mut buf = buffer();
        buf.push(record(100.0, 0.0, 1.0));
        buf.push(record(200.0, 50.0, 1.0));

        let sample = buf.sample(20.0).unwrap();
        assert_eq!(sample.mode, SampleMode::Clamped);
        assert_eq!(sample.position.x, 0.0);
    }

    #[test]
    fn after_newest_extrapolates_for_a_bounded_time() {
        let mut buf = buffer();
        buf.push(record(100.0, 0.0, 1.0));
        buf.push(record(200.0, 50.0, 2.0));

        let near = buf.sample(250.0).unwrap();
        assert_eq!(near.mode, SampleMode::Extrapolated);
        assert_eq!(near.position.x, 60.0);

        let far = buf.sample(10_000.0).unwrap();
        assert_eq!(far.position.x, 50.0 + 2.0 * 15.0);
    }

    #[test]
    fn stale_and_duplicate_records_are_dropped() {
        let mut buf = buffer();
        assert!(buf.push(record(200.0, 50.0, 0.0)));
        assert!(!buf.push(record(100.0, 0.0, 0.0)));
        assert!(!buf.push(record(200.0, 99.0, 0.0)));
        assert_eq!(buf.latest().unwrap().position.x, 50.0);

        assert!(buf.push(record(300.0, 60.0, 0.0)));
        assert_eq!(buf.sample(250.0).unwrap().position.x, 55.0);
    }

    #[test]
    fn teleport_between_records_is_not_blended() {
        let mut buf = buffer();
        buf.push(record(1000.0, 600.0, 0.0));
        buf.push(record(1016.0, 600.0, 0.0));
        assert!(buf.push(record(1033.0, 26.0, 0.0)));

        for render_time in [1000.0, 1025.0, 1033.0] {
            assert_eq!(buf.sample(render_time).unwrap().position.x, 26.0);
        }
    }

    #[test]
    fn reset_skips_the_blend() {
        let mut buf = buffer();
        buf.push(record(100.0, 500.0, 0.0));
        buf.push(record(200.0, 510.0, 0.0));
        buf.reset_to(record(210.0, 30.0, 0.0));

        let sample = buf.sample(150.0).unwrap();
        assert_eq!(sample.position.x, 30.0);
    }
}
