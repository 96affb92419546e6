use glam::Vec2;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::player::{Buttons, Color, Input, Player, Role};

pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x54_44_4d_31;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

/// Broadcast topic shared by both peers of a lobby.
pub fn lobby_topic(code: &str) -> String {
    format!("lobby:{code}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct Header {
    pub magic: u32,
    pub version: u32,
}

impl Header {
    pub fn new() -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerState {
    pub role: u8,
    pub color: u8,
    pub name: String,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub on_ground: bool,
    pub hit_points: u8,
    pub invulnerable_ticks: u16,
}

impl From<&Player> for PlayerState {
    fn from(player: &Player) -> Self {
        Self {
            role: player.role as u8,
            color: player.color as u8,
            name: player.name.clone(),
            position: player.position.into(),
            velocity: player.velocity.into(),
            on_ground: player.on_ground,
            hit_points: player.hit_points,
            invulnerable_ticks: player.invulnerable_ticks,
        }
    }
}

impl PlayerState {
    /// `None` when the role byte is not a known role.
    pub fn to_player(&self) -> Option<Player> {
        let role = Role::try_from(self.role).ok()?;
        Some(Player {
            role,
            color: Color::from(self.color),
            name: self.name.clone(),
            position: Vec2::from(self.position),
            velocity: Vec2::from(self.velocity),
            on_ground: self.on_ground,
            hit_points: self.hit_points,
            invulnerable_ticks: self.invulnerable_ticks,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputMessage {
    pub sender: u8,
    pub buttons: u8,
    pub seq: u32,
}

impl InputMessage {
    pub fn new(sender: Role, input: Input) -> Self {
        Self {
            sender: sender as u8,
            buttons: input.buttons.bits(),
            seq: input.seq,
        }
    }

    pub fn input(&self) -> Input {
        Input::new(Buttons::from_bits_truncate(self.buttons), self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct StateSnapshot {
    pub host_time_ms: f64,
    pub tick: u32,
    pub player1: PlayerState,
    pub player2: PlayerState,
    pub win: bool,
}

impl StateSnapshot {
    pub fn player(&self, role: Role) -> &PlayerState {
        match role {
            Role::P1 => &self.player1,
            Role::P2 => &self.player2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PoseMessage {
    pub host_time_ms: f64,
    pub entity_id: u8,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub on_ground: bool,
}

impl PoseMessage {
    pub fn from_player(host_time_ms: f64, player: &Player) -> Self {
        Self {
            host_time_ms,
            entity_id: player.role as u8,
            position: player.position.into(),
            velocity: player.velocity.into(),
            on_ground: player.on_ground,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Message {
    Input(InputMessage),
    Snapshot(StateSnapshot),
    Pose(PoseMessage),
    Ping {
        client_send_time_ms: f64,
    },
    Pong {
        client_send_time_ms: f64,
        host_time_ms: f64,
    },
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Envelope {
    pub header: Header,
    pub sender: u8,
    pub message: Message,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("bad header (magic {magic:#x}, version {version})")]
    InvalidHeader { magic: u32, version: u32 },
    #[error("unknown sender role {0}")]
    UnknownSender(u8),
}

impl Envelope {
    pub fn new(sender: Role, message: Message) -> Self {
        Self {
            header: Header::new(),
            sender: sender as u8,
            message,
        }
    }

    pub fn sender_role(&self) -> Result<Role, PacketError> {
        Role::try_from(self.sender).map_err(PacketError::UnknownSender)
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        // Transport buffers carry no alignment guarantee.
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);

        let envelope =
            rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(PacketError::Deserialize)?;
        if !envelope.header.is_valid() {
            return Err(PacketError::InvalidHeader {
                magic: envelope.header.magic,
                version: envelope.header.version,
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_comparison_wraps() {
        assert!(sequence_greater_than(2, 1));
        assert!(!sequence_greater_than(1, 2));
        assert!(!sequence_greater_than(5, 5));
        assert!(sequence_greater_than(0, u32::MAX));
        assert!(!sequence_greater_than(u32::MAX, 0));
    }

    #[test]
    fn snapshot_survives_the_wire() {
        let mut player = Player::new(Role::P2, "orange", Vec2::new(10.5, 300.0), 2);
        player.velocity = Vec2::new(-1.25, 0.7);
        player.invulnerable_ticks = 12;
        let state = PlayerState::from(&player);

        let envelope = Envelope::new(
            Role::P1,
            Message::Snapshot(StateSnapshot {
                host_time_ms: 1234.5,
                tick: 77,
                player1: state.clone(),
                player2: state,
                win: false,
            }),
        );

        let bytes = envelope.encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();

        assert_eq!(decoded, envelope);
        let Message::Snapshot(snapshot) = decoded.message else {
            panic!("expected a snapshot");
        };
        assert_eq!(snapshot.player(Role::P2).to_player().unwrap(), player);
    }

    #[test]
    fn bad_header_is_rejected() {
        let mut envelope = Envelope::new(Role::P2, Message::GameOver);
        envelope.header.version = PROTOCOL_VERSION + 1;
        let bytes = envelope.encode().unwrap();

        assert!(matches!(
            Envelope::decode(&bytes),
            Err(PacketError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(Envelope::decode(&[0xff; 7]).is_err());
        assert!(Envelope::decode(&[]).is_err());
    }

    #[test]
    fn input_message_keeps_buttons() {
        let input = Input::new(Buttons::LEFT | Buttons::JUMP, 42);
        let message = InputMessage::new(Role::P2, input);
        assert_eq!(message.input(), input);
    }
}
