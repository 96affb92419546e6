use glam::Vec2;

use crate::config::PhysicsConfig;
use crate::level::{Level, Rect};
use crate::player::{Input, Player};

/// Advances `player` by exactly one fixed step against the static geometry
/// of `level`. Hazards are not evaluated here; see [`super::evaluate_hazards`].
///
/// Jump is applied whenever it is asserted on the ground, so callers pass
/// edge-detected input.
pub fn integrate(player: &mut Player, input: Input, level: &Level, config: &PhysicsConfig) {
    if input.left() {
        player.velocity.x -= config.move_acceleration;
    }
    if input.right() {
        player.velocity.x += config.move_acceleration;
    }
    player.velocity.x = player
        .velocity
        .x
        .clamp(-config.max_horizontal_speed, config.max_horizontal_speed);

    if input.jump() && player.on_ground {
        player.velocity.y = -config.jump_impulse;
        player.on_ground = false;
    }

    player.velocity.y += config.gravity;

    let previous = player.position;
    player.position += player.velocity;

    resolve_collisions(player, previous, level.platforms(), config);
    clamp_to_bounds(player, level, config);

    if player.on_ground {
        player.velocity.x *= config.ground_friction;
    }
}

/// Pushes `player` out of every collider it overlaps after moving from
/// `previous`. Vertical contacts are resolved first with the body held at its
/// previous x, then horizontal contacts at the new x. A body that overlaps
/// nothing is left where it is.
pub fn resolve_collisions(
    player: &mut Player,
    previous: Vec2,
    colliders: &[Rect],
    config: &PhysicsConfig,
) {
    let size = config.body_size();
    let target_x = player.position.x;
    let moving_up = player.position.y < previous.y;

    player.on_ground = false;
    player.position.x = previous.x;

    for collider in colliders {
        if !player.bounds(size).intersects(collider) {
            continue;
        }

        if moving_up {
            player.position.y = collider.bottom();
            player.velocity.y = player.velocity.y.max(0.0);
        } else {
            player.position.y = collider.top() - size.y;
            player.velocity.y = 0.0;
            player.on_ground = true;
        }
    }

    player.position.x = target_x;
    let dx = target_x - previous.x;

    for collider in colliders {
        let bounds = player.bounds(size);
        if !bounds.intersects(collider) {
            continue;
        }

        if player.on_ground {
            let rise = bounds.bottom() - collider.top();
            if rise > 0.0 && rise <= config.step_up_height {
                let lifted = Vec2::new(player.position.x, collider.top() - size.y);
                let lifted_bounds = Rect::at(lifted, size);
                if !colliders.iter().any(|c| lifted_bounds.intersects(c)) {
                    player.position = lifted;
                    continue;
                }
            }
        }

        player.position.x = if dx > 0.0 {
            collider.left() - size.x
        } else if dx < 0.0 {
            collider.right()
        } else if bounds.center().x < collider.center().x {
            collider.left() - size.x
        } else {
            collider.right()
        };
        player.velocity.x = 0.0;
    }
}

fn clamp_to_bounds(player: &mut Player, level: &Level, config: &PhysicsConfig) {
    let size = config.body_size();
    let max_x = level.width() - size.x;
    let max_y = level.height() - size.y;

    if player.position.x < 0.0 || player.position.x > max_x {
        player.position.x = player.position.x.clamp(0.0, max_x);
        player.velocity.x = 0.0;
    }
    if player.position.y > max_y {
        player.position.y = max_y;
        player.velocity.y = 0.0;
    }
    player.position.y = player.position.y.max(-level.height());
}
