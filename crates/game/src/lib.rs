pub mod client;
pub mod config;
pub mod level;
pub mod lobby;
pub mod net;
pub mod physics;
pub mod player;
pub mod session;
pub mod simulation;

pub use client::{ClientPredictor, ClockEstimator, Correction, EntityRecord, PoseBuffer, Sample};
pub use config::MatchConfig;
pub use level::{Level, Patrol, Rect, generate};
pub use lobby::{LobbyDirectory, LobbyMeta, LobbyStatus, MemoryDirectory, normalize_code};
pub use net::{
    BroadcastChannel, BusEndpoint, Envelope, LoopbackBus, Message, NetworkStats,
    PacketLossSimulation, StateSnapshot, lobby_topic,
};
pub use physics::{HazardKind, HazardPhase, Outcome};
pub use player::{Buttons, Input, Player, Role};
pub use session::{FrameView, GuestSession, HostSession, Session};
pub use simulation::{FixedTimestep, HostSimulation, MatchPhase};
