use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Role {
    /// Played by the host.
    #[default]
    P1 = 0,
    P2 = 1,
}

impl Role {
    pub fn other(self) -> Role {
        match self {
            Role::P1 => Role::P2,
            Role::P2 => Role::P1,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Role::P1 => Color::Blue,
            Role::P2 => Color::Orange,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::P1),
            1 => Ok(Role::P2),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    Blue = 0,
    Orange = 1,
}

impl From<u8> for Color {
    fn from(value: u8) -> Self {
        match value {
            1 => Color::Orange,
            _ => Color::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub role: Role,
    pub color: Color,
    pub name: String,
    /// Top-left corner of the hitbox.
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
    pub hit_points: u8,
    pub invulnerable_ticks: u16,
}

impl Player {
    pub fn new(role: Role, name: impl Into<String>, position: Vec2, hit_points: u8) -> Self {
        Self {
            role,
            color: role.color(),
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            on_ground: false,
            hit_points,
            invulnerable_ticks: 0,
        }
    }

    pub fn bounds(&self, size: Vec2) -> Rect {
        Rect::at(self.position, size)
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }

    /// Copies the authoritative kinematic and health state, keeping identity.
    pub fn adopt(&mut self, authoritative: &Player) {
        self.position = authoritative.position;
        self.velocity = authoritative.velocity;
        self.on_ground = authoritative.on_ground;
        self.hit_points = authoritative.hit_points;
        self.invulnerable_ticks = authoritative.invulnerable_ticks;
    }
}
