use crate::config::MatchConfig;
use crate::level::Level;
use crate::physics::{HazardPhase, step_player};
use crate::player::{Input, InputEdge, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Within the snap distance; a fraction of the gap was closed.
    Blended,
    /// Too far apart; the authoritative position was taken outright.
    Snapped,
    /// Authoritative hit points dropped; moved straight to the respawn.
    Respawned,
}

/// The guest's copy of its own player. Stepped locally for responsiveness,
/// with hazards off, and pulled toward authoritative state as it arrives.
#[derive(Debug, Clone)]
pub struct ClientPredictor {
    player: Player,
    edge: InputEdge,
    corrections: u32,
}

impl ClientPredictor {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            edge: InputEdge::new(),
            corrections: 0,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn snap_count(&self) -> u32 {
        self.corrections
    }

    pub fn predict(&mut self, input: Input, level: &Level, tick: u32, config: &MatchConfig) {
        let input = self.edge.apply(input);
        step_player(&mut self.player, input, level, tick, config, HazardPhase::Disabled);
    }

    /// One tick of reconciliation toward `authoritative`.
    pub fn reconcile(&mut self, authoritative: &Player, config: &MatchConfig) -> Correction {
        if authoritative.hit_points < self.player.hit_points {
            self.player.adopt(authoritative);
            self.corrections += 1;
            log::debug!("{:?} respawned by host", self.player.role);
            return Correction::Respawned;
        }

        let gap = authoritative.position - self.player.position;
        if gap.length() > config.reconcile.snap_distance {
            self.player.adopt(authoritative);
            self.corrections += 1;
            log::debug!("{:?} prediction snapped ({:.1} px off)", self.player.role, gap.length());
            return Correction::Snapped;
        }

        self.player.position += gap * config.reconcile.blend_factor;
        self.player.velocity = authoritative.velocity;
        self.player.on_ground = authoritative.on_ground;
        self.player.hit_points = authoritative.hit_points;
        self.player.invulnerable_ticks = authoritative.invulnerable_ticks;
        Correction::Blended
    }

    /// Replaces the prediction wholesale, e.g. at match start.
    pub fn reset(&mut self, player: Player) {
        self.player = player;
        self.edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::level::generate;
    use crate::player::Role;

    fn predictor_at(position: Vec2) -> ClientPredictor {
        ClientPredictor::new(Player::new(Role::P2, "guest", position, 3))
    }

    #[test]
    fn small_divergence_blends_and_adopts_unpredictable_fields() {
        let config = MatchConfig::default();
        let mut predictor = predictor_at(Vec2::new(100.0, 100.0));
        let mut authoritative = Player::new(Role::P2, "guest", Vec2::new(110.0, 100.0), 3);
        authoritative.velocity = Vec2::new(2.0, 0.0);
        authoritative.on_ground = true;
        authoritative.invulnerable_ticks = 4;

        let correction = predictor.reconcile(&authoritative, &config);

        assert_eq!(correction, Correction::Blended);
        assert_eq!(predictor.player().position, Vec2::new(102.0, 100.0));
        assert_eq!(predictor.player().velocity, authoritative.velocity);
        assert!(predictor.player().on_ground);
        assert_eq!(predictor.player().invulnerable_ticks, 4);
    }

    #[test]
    fn large_divergence_snaps_exactly() {
        let config = MatchConfig::default();
        let mut predictor = predictor_at(Vec2::new(100.0, 100.0));
        let authoritative = Player::new(Role::P2, "guest", Vec2::new(100.0, 100.0 + 48.5), 3);

        assert_eq!(predictor.reconcile(&authoritative, &config), Correction::Snapped);
        assert_eq!(predictor.player().position, authoritative.position);
    }

    #[test]
    fn lost_hit_point_moves_to_respawn_immediately() {
        let config = MatchConfig::default();
        let level = generate("abc123");
        let spawn = level.spawn_position(Role::P2, config.physics.body_size());
        let mut predictor = predictor_at(spawn + Vec2::new(20.0, 0.0));

        let mut authoritative = Player::new(Role::P2, "guest", spawn, 2);
        authoritative.invulnerable_ticks = 90;

        assert_eq!(predictor.reconcile(&authoritative, &config), Correction::Respawned);
        assert_eq!(predictor.player().position, spawn);
        assert_eq!(predictor.player().hit_points, 2);
    }

    #[test]
    fn prediction_never_applies_hazards() {
        let config = MatchConfig::default();
        let level = generate("abc123");
        let mut predictor = predictor_at(Vec2::new(700.0, level.height()));

        for tick in 0..10 {
            predictor.predict(Input::NEUTRAL, &level, tick, &config);
        }
        assert_eq!(predictor.player().hit_points, 3);
    }

    #[test]
    fn prediction_matches_host_integration() {
        let config = MatchConfig::default();
        let level = generate("abc123");
        let spawn = level.spawn_position(Role::P2, config.physics.body_size());
        let mut predictor = predictor_at(spawn);
        let mut reference = Player::new(Role::P2, "guest", spawn, 3);
        let right = Input::from_flags(false, true, false);

        for tick in 0..20 {
            predictor.predict(right, &level, tick, &config);
            step_player(&mut reference, right, &level, tick, &config, HazardPhase::Enabled);
        }
        assert_eq!(predictor.player(), &reference);
    }
}
