mod host;
mod tick;

pub use host::{HostSimulation, MatchPhase, TickReport};
pub use tick::FixedTimestep;
