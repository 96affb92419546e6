mod input_channel;
mod protocol;
mod simulator;
mod transport;

pub use input_channel::{InputLatch, InputPublisher};
pub use protocol::{
    ArchivedEnvelope, Envelope, Header, InputMessage, Message, PROTOCOL_MAGIC, PROTOCOL_VERSION,
    PacketError, PlayerState, PoseMessage, StateSnapshot, lobby_topic, sequence_greater_than,
};
pub use simulator::{NetworkStats, PacketLossSimulation};
pub use transport::{BroadcastChannel, BusEndpoint, LoopbackBus, TransportError};
