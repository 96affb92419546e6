use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Movement model, in pixels per fixed step. Tuned together with the level
/// generator: a standing jump rises about three tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub move_acceleration: f32,
    pub max_horizontal_speed: f32,
    pub jump_impulse: f32,
    pub gravity: f32,
    pub ground_friction: f32,
    pub body_width: f32,
    pub body_height: f32,
    pub step_up_height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            move_acceleration: 0.6,
            max_horizontal_speed: 3.2,
            jump_impulse: 10.0,
            gravity: 0.7,
            ground_friction: 0.85,
            body_width: 16.0,
            body_height: 20.0,
            step_up_height: 6.0,
        }
    }
}

impl PhysicsConfig {
    pub fn body_size(&self) -> Vec2 {
        Vec2::new(self.body_width, self.body_height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub max_hit_points: u8,
    pub invulnerability_ticks: u16,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            max_hit_points: 3,
            invulnerability_ticks: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_rate: u32,
    /// A snapshot goes out every this many ticks.
    pub snapshot_interval_ticks: u32,
    pub send_poses: bool,
    pub max_catch_up_steps: u32,
    pub input_stale_ms: f64,
    pub input_keepalive_ms: f64,
    pub ping_interval_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            snapshot_interval_ticks: 3,
            send_poses: true,
            max_catch_up_steps: 5,
            input_stale_ms: 500.0,
            input_keepalive_ms: 100.0,
            ping_interval_ms: 250.0,
        }
    }
}

impl TimingConfig {
    pub fn step_ms(&self) -> f64 {
        1000.0 / self.tick_rate.max(1) as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Divergence in pixels above which the prediction snaps.
    pub snap_distance: f32,
    /// Fraction of the remaining gap closed per tick below the snap distance.
    pub blend_factor: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            snap_distance: 48.0,
            blend_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub extrapolation_limit_ms: f64,
    /// Consecutive records further apart than this are a teleport (a
    /// respawn) and replace the history instead of being blended into.
    pub teleport_distance: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            extrapolation_limit_ms: 150.0,
            teleport_distance: 96.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub offset_smoothing: f64,
    pub gap_smoothing: f64,
    pub jitter_smoothing: f64,
    pub delay_smoothing: f64,
    pub min_render_delay_ms: f64,
    pub max_render_delay_ms: f64,
    pub initial_render_delay_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            offset_smoothing: 0.1,
            gap_smoothing: 0.1,
            jitter_smoothing: 0.1,
            delay_smoothing: 0.05,
            min_render_delay_ms: 50.0,
            max_render_delay_ms: 250.0,
            initial_render_delay_ms: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub physics: PhysicsConfig,
    pub hazards: HazardConfig,
    pub timing: TimingConfig,
    pub reconcile: ReconcileConfig,
    pub interpolation: InterpolationConfig,
    pub clock: ClockConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: MatchConfig = toml::from_str(
            r#"
            [timing]
            tick_rate = 30

            [reconcile]
            snap_distance = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.timing.tick_rate, 30);
        assert_eq!(config.timing.snapshot_interval_ticks, 3);
        assert_eq!(config.reconcile.snap_distance, 10.0);
        assert_eq!(config.physics.gravity, 0.7);
        assert_eq!(config.interpolation.teleport_distance, 96.0);
    }
}
