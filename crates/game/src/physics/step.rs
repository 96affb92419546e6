use crate::config::MatchConfig;
use crate::level::Level;
use crate::player::{Input, Player};

use super::hazard::{HazardKind, evaluate_hazards};
use super::integrator::integrate;

/// Whether a step may apply hazard hits. Only the authoritative simulation
/// knows the real outcome of a hazard, so predictors run with `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardPhase {
    Enabled,
    Disabled,
}

/// One fixed step for one player: movement and collision, then (optionally)
/// the hazard phase at `tick`.
pub fn step_player(
    player: &mut Player,
    input: Input,
    level: &Level,
    tick: u32,
    config: &MatchConfig,
    phase: HazardPhase,
) -> Option<HazardKind> {
    integrate(player, input, level, &config.physics);

    match phase {
        HazardPhase::Enabled => {
            evaluate_hazards(player, level, tick, &config.physics, &config.hazards)
        }
        HazardPhase::Disabled => None,
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::level::generate;
    use crate::player::Role;

    #[test]
    fn disabled_phase_never_respawns() {
        let level = generate("abc123");
        let config = MatchConfig::default();
        let start = Vec2::new(700.0, level.height());

        let mut predicted = Player::new(Role::P2, "guest", start, 3);
        let mut authoritative = predicted.clone();

        step_player(&mut predicted, Input::NEUTRAL, &level, 0, &config, HazardPhase::Disabled);
        let hit = step_player(
            &mut authoritative,
            Input::NEUTRAL,
            &level,
            0,
            &config,
            HazardPhase::Enabled,
        );

        assert_eq!(predicted.hit_points, 3);
        assert_eq!(hit, Some(HazardKind::Void));
        assert_eq!(authoritative.hit_points, 2);
    }
}
