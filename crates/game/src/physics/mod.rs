mod hazard;
mod integrator;
mod step;

pub use hazard::{HazardKind, Outcome, apply_hit, detect_hazard, evaluate_hazards, match_outcome};
pub use integrator::{integrate, resolve_collisions};
pub use step::{HazardPhase, step_player};
