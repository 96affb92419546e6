use glam::Vec2;

use crate::player::Role;

use super::random::SeededRng;
use super::rect::Rect;

pub const TILE_SIZE: f32 = 24.0;
pub const WORLD_TILES_W: i32 = 64;
pub const WORLD_TILES_H: i32 = 16;

const FLOOR_ROW: i32 = WORLD_TILES_H - 2;
/// Columns at each end that stay solid floor with no hazards.
const CORRIDOR_TILES: i32 = 10;
/// Highest and lowest rows a chain platform may occupy. Row 12 sits two
/// tiles above the floor, which a standing jump can reach; the chain always
/// begins there.
const PLATFORM_ROW_MIN: i32 = 6;
const PLATFORM_ROW_MAX: i32 = 12;
const PLATFORM_MAX_STEP_ROWS: i32 = 2;
const PIT_CHANCE: f64 = 0.12;
const SPIKE_CHANCE: f64 = 0.08;
const PATROL_CHANCE: f64 = 0.5;
const MAX_PATROLS: usize = 3;
const PATROL_SIZE: f32 = 16.0;
const PATROL_SPEED: f32 = 1.0;
const SPIKE_HEIGHT: f32 = 8.0;

/// An enemy walking back and forth along a floor segment. Its position is a
/// pure function of the simulation tick, so both peers derive it locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patrol {
    pub lane: Rect,
    pub size: Vec2,
    pub speed: f32,
    pub phase: f32,
}

impl Patrol {
    pub fn position_at(&self, tick: u32) -> Vec2 {
        let travel = f64::from(self.lane.w - self.size.x);
        let y = self.lane.bottom() - self.size.y;
        if travel <= 0.0 {
            return Vec2::new(self.lane.x, y);
        }

        let distance =
            (f64::from(self.phase) + f64::from(self.speed) * f64::from(tick)) % (2.0 * travel);
        let offset = if distance < travel {
            distance
        } else {
            2.0 * travel - distance
        };
        Vec2::new(self.lane.x + offset as f32, y)
    }

    pub fn bounds_at(&self, tick: u32) -> Rect {
        Rect::at(self.position_at(tick), self.size)
    }
}

/// Immutable match geometry. Built once from the shared seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    seed: String,
    platforms: Vec<Rect>,
    spikes: Vec<Rect>,
    patrols: Vec<Patrol>,
    spawn: Rect,
    goal: Rect,
    width: f32,
    height: f32,
}

impl Level {
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Every static collider: floor segments followed by the platform chain.
    pub fn platforms(&self) -> &[Rect] {
        &self.platforms
    }

    pub fn spikes(&self) -> &[Rect] {
        &self.spikes
    }

    pub fn patrols(&self) -> &[Patrol] {
        &self.patrols
    }

    pub fn spawn(&self) -> Rect {
        self.spawn
    }

    pub fn goal(&self) -> Rect {
        self.goal
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Resting position for a body of `size` inside the spawn region. The two
    /// roles stand apart so they never start overlapping.
    pub fn spawn_position(&self, role: Role, size: Vec2) -> Vec2 {
        let x = match role {
            Role::P1 => self.spawn.x + 2.0,
            Role::P2 => self.spawn.right() - size.x - 2.0,
        };
        Vec2::new(x, self.spawn.bottom() - size.y)
    }
}

/// Builds the level for `seed`. Pure: the same seed yields identical
/// geometry on every peer and at every call.
pub fn generate(seed: &str) -> Level {
    let mut rng = SeededRng::from_seed_str(seed);

    let solid = generate_floor_columns(&mut rng);
    let floor_segments = merge_floor_segments(&solid);
    let chain = generate_platform_chain(&mut rng);
    let spikes = generate_spikes(&mut rng, &solid);
    let patrols = generate_patrols(&mut rng, &floor_segments, &spikes);

    let mut platforms = floor_segments;
    platforms.extend(chain);

    let corridor_y = (FLOOR_ROW - 2) as f32 * TILE_SIZE;
    let spawn = Rect::new(TILE_SIZE, corridor_y, 2.0 * TILE_SIZE, 2.0 * TILE_SIZE);
    let goal = Rect::new(
        (WORLD_TILES_W - 4) as f32 * TILE_SIZE,
        corridor_y,
        2.0 * TILE_SIZE,
        2.0 * TILE_SIZE,
    );

    log::debug!(
        "generated level for seed {:?}: {} colliders, {} spikes, {} patrols",
        seed,
        platforms.len(),
        spikes.len(),
        patrols.len()
    );

    Level {
        seed: seed.to_owned(),
        platforms,
        spikes,
        patrols,
        spawn,
        goal,
        width: WORLD_TILES_W as f32 * TILE_SIZE,
        height: WORLD_TILES_H as f32 * TILE_SIZE,
    }
}

fn generate_floor_columns(rng: &mut SeededRng) -> Vec<bool> {
    let mut solid = vec![true; WORLD_TILES_W as usize];
    let last_pit_start = WORLD_TILES_W - CORRIDOR_TILES - 2;

    let mut x = CORRIDOR_TILES;
    while x <= last_pit_start {
        if rng.chance(PIT_CHANCE) {
            let width = rng.range_inclusive(1, 2);
            for column in x..x + width {
                solid[column as usize] = false;
            }
            // Leave at least four tiles of floor before the next pit.
            x += width + 4;
        } else {
            x += 1;
        }
    }

    solid
}

fn merge_floor_segments(solid: &[bool]) -> Vec<Rect> {
    let floor_y = FLOOR_ROW as f32 * TILE_SIZE;
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;

    for (column, &is_solid) in solid.iter().chain(std::iter::once(&false)).enumerate() {
        match (is_solid, start) {
            (true, None) => start = Some(column),
            (false, Some(from)) => {
                segments.push(Rect::new(
                    from as f32 * TILE_SIZE,
                    floor_y,
                    (column - from) as f32 * TILE_SIZE,
                    2.0 * TILE_SIZE,
                ));
                start = None;
            }
            _ => {}
        }
    }

    segments
}

fn generate_platform_chain(rng: &mut SeededRng) -> Vec<Rect> {
    let mut platforms = Vec::new();
    let mut x = 6;
    let mut row = PLATFORM_ROW_MAX;

    while x < WORLD_TILES_W - 8 {
        let width = rng.range_inclusive(2, 4);
        // The first platform is entered from the floor, so it stays on the
        // lowest row; the walk starts from there.
        if !platforms.is_empty() {
            let step = rng.range_inclusive(-PLATFORM_MAX_STEP_ROWS, PLATFORM_MAX_STEP_ROWS);
            row = (row + step).clamp(PLATFORM_ROW_MIN, PLATFORM_ROW_MAX);
        }

        platforms.push(Rect::new(
            x as f32 * TILE_SIZE,
            row as f32 * TILE_SIZE,
            width as f32 * TILE_SIZE,
            TILE_SIZE,
        ));

        x += width + rng.range_inclusive(1, 3);
    }

    platforms
}

fn generate_spikes(rng: &mut SeededRng, solid: &[bool]) -> Vec<Rect> {
    let floor_top = FLOOR_ROW as f32 * TILE_SIZE;
    let mut spikes = Vec::new();

    let mut x = CORRIDOR_TILES + 2;
    while x < WORLD_TILES_W - CORRIDOR_TILES - 2 {
        let column = x as usize;
        let supported = solid[column - 1] && solid[column] && solid[column + 1];
        if supported && rng.chance(SPIKE_CHANCE) {
            spikes.push(Rect::new(
                x as f32 * TILE_SIZE,
                floor_top - SPIKE_HEIGHT,
                TILE_SIZE,
                SPIKE_HEIGHT,
            ));
            x += 5;
        } else {
            x += 1;
        }
    }

    spikes
}

fn generate_patrols(rng: &mut SeededRng, floor: &[Rect], spikes: &[Rect]) -> Vec<Patrol> {
    let min_x = CORRIDOR_TILES as f32 * TILE_SIZE;
    let max_x = (WORLD_TILES_W - CORRIDOR_TILES) as f32 * TILE_SIZE;
    let mut patrols = Vec::new();

    for segment in floor {
        if patrols.len() >= MAX_PATROLS {
            break;
        }

        let left = segment.left().max(min_x);
        let right = segment.right().min(max_x);
        if right - left < 5.0 * TILE_SIZE {
            continue;
        }
        if !rng.chance(PATROL_CHANCE) {
            continue;
        }

        let lane = Rect::new(left, segment.top() - TILE_SIZE, right - left, TILE_SIZE);
        if spikes.iter().any(|spike| spike.intersects(&lane)) {
            continue;
        }

        let phase = rng.next_f64() as f32 * (lane.w - PATROL_SIZE);
        patrols.push(Patrol {
            lane,
            size: Vec2::splat(PATROL_SIZE),
            speed: PATROL_SPEED,
            phase,
        });
    }

    patrols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_level() {
        for seed in ["abc123", "fallback", "", "ZX9QKP"] {
            assert_eq!(generate(seed), generate(seed));
        }
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(generate("abc123").platforms(), generate("abc124").platforms());
    }

    #[test]
    fn chain_vertical_steps_are_jumpable() {
        for seed in ["abc123", "s1", "s2", "s3", "long seed with spaces"] {
            let level = generate(seed);
            let chain: Vec<&Rect> = level
                .platforms()
                .iter()
                .filter(|p| p.top() < FLOOR_ROW as f32 * TILE_SIZE)
                .collect();
            assert!(!chain.is_empty());
            let floor_top = FLOOR_ROW as f32 * TILE_SIZE;
            assert!(floor_top - chain[0].top() <= PLATFORM_MAX_STEP_ROWS as f32 * TILE_SIZE);
            for pair in chain.windows(2) {
                let dy = (pair[1].top() - pair[0].top()).abs();
                assert!(dy <= PLATFORM_MAX_STEP_ROWS as f32 * TILE_SIZE);
            }
        }
    }

    #[test]
    fn first_platform_is_within_a_standing_jump() {
        let physics = crate::config::PhysicsConfig::default();
        let mut rise = 0.0;
        let mut velocity = physics.jump_impulse;
        while velocity > 0.0 {
            velocity -= physics.gravity;
            rise += velocity.max(0.0);
        }

        let floor_top = FLOOR_ROW as f32 * TILE_SIZE;
        for index in 0..500 {
            let level = generate(&format!("seed-{index}"));
            let first = level
                .platforms()
                .iter()
                .find(|p| p.top() < floor_top)
                .copied()
                .unwrap();
            assert!(floor_top - first.top() < rise, "seed-{index}: {}", floor_top - first.top());
        }
    }

    #[test]
    fn corridors_are_solid_and_safe() {
        let level = generate("abc123");
        let corridor_end = CORRIDOR_TILES as f32 * TILE_SIZE;
        let first_floor = level.platforms()[0];
        assert_eq!(first_floor.left(), 0.0);
        assert!(first_floor.right() >= corridor_end);

        let last_floor = level
            .platforms()
            .iter()
            .filter(|p| p.top() == FLOOR_ROW as f32 * TILE_SIZE)
            .last()
            .copied()
            .unwrap();
        assert_eq!(last_floor.right(), level.width());

        for spike in level.spikes() {
            assert!(spike.left() >= corridor_end);
            assert!(spike.right() <= level.width() - corridor_end);
        }
    }

    #[test]
    fn spawn_and_goal_are_far_apart() {
        let level = generate("abc123");
        let separation = level.goal().left() - level.spawn().right();
        assert!(separation > level.width() * 0.8);
    }

    #[test]
    fn patrol_stays_in_lane() {
        let patrol = Patrol {
            lane: Rect::new(100.0, 300.0, 120.0, 24.0),
            size: Vec2::splat(16.0),
            speed: 1.0,
            phase: 30.0,
        };
        for tick in 0..1000 {
            let bounds = patrol.bounds_at(tick);
            assert!(bounds.left() >= patrol.lane.left());
            assert!(bounds.right() <= patrol.lane.right() + 0.001);
        }
        assert_eq!(patrol.position_at(0).x, 130.0);
        assert_eq!(patrol.position_at(10).x, 140.0);
    }
}
