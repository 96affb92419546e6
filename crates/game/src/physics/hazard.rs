use crate::config::{HazardConfig, PhysicsConfig};
use crate::level::Level;
use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardKind {
    Void,
    Spikes,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Loss,
}

/// Returns the hazard `player` is touching at `tick`, if any. Falling into
/// the void always counts; spikes and enemies are ignored while the player is
/// invulnerable.
pub fn detect_hazard(
    player: &Player,
    level: &Level,
    tick: u32,
    physics: &PhysicsConfig,
) -> Option<HazardKind> {
    let bounds = player.bounds(physics.body_size());

    if bounds.bottom() >= level.height() {
        return Some(HazardKind::Void);
    }
    if player.is_invulnerable() {
        return None;
    }
    if level.spikes().iter().any(|spike| bounds.intersects(spike)) {
        return Some(HazardKind::Spikes);
    }
    if level
        .patrols()
        .iter()
        .any(|patrol| bounds.intersects(&patrol.bounds_at(tick)))
    {
        return Some(HazardKind::Enemy);
    }
    None
}

/// Applies a hazard hit: one hit point lost (never below zero), back to the
/// shared spawn point at rest, invulnerable for a fixed window.
pub fn apply_hit(player: &mut Player, level: &Level, physics: &PhysicsConfig, hazards: &HazardConfig) {
    player.hit_points = player.hit_points.saturating_sub(1);
    player.position = level.spawn_position(player.role, physics.body_size());
    player.velocity = glam::Vec2::ZERO;
    player.on_ground = false;
    player.invulnerable_ticks = hazards.invulnerability_ticks.max(1);
}

/// The hazard phase of one host tick. Counts down invulnerability, then
/// applies at most one hit.
pub fn evaluate_hazards(
    player: &mut Player,
    level: &Level,
    tick: u32,
    physics: &PhysicsConfig,
    hazards: &HazardConfig,
) -> Option<HazardKind> {
    player.invulnerable_ticks = player.invulnerable_ticks.saturating_sub(1);

    let hazard = detect_hazard(player, level, tick, physics)?;
    apply_hit(player, level, physics, hazards);
    log::debug!(
        "{:?} hit {:?}, {} hit points left",
        player.role,
        hazard,
        player.hit_points
    );
    Some(hazard)
}

/// Loss as soon as either player is out of hit points; win only when both
/// players overlap the goal in the same evaluated tick.
pub fn match_outcome(players: [&Player; 2], level: &Level, physics: &PhysicsConfig) -> Option<Outcome> {
    if players.iter().any(|p| !p.is_alive()) {
        return Some(Outcome::Loss);
    }

    let goal = level.goal();
    let size = physics.body_size();
    if players.iter().all(|p| p.bounds(size).intersects(&goal)) {
        return Some(Outcome::Win);
    }
    None
}
