mod generator;
mod random;
mod rect;

pub use generator::{Level, Patrol, TILE_SIZE, WORLD_TILES_H, WORLD_TILES_W, generate};
pub use random::{SeededRng, hash_seed};
pub use rect::Rect;
